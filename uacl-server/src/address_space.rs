//! In-memory node graph
//!
//! Stands in for the node storage of a hosting protocol stack: nodes are
//! created through [`NodeSettings`], found by id or browse name, and hold a
//! stored value that reads and writes fall back to when no business object
//! is attached. Locks are held only for short map operations, never while
//! calling into business objects or observers.

use crate::model::{Argument, BoundVariable, MethodDispatchRecord};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use uacl_core::node_id::ids;
use uacl_core::{NodeId, StatusCode, TypeDescriptor, UaclError, UaclResult, Variant};

/// Namespace of the protocol's standard nodes
pub const STANDARD_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// Node class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Object,
    Variable,
    Method,
}

impl NodeClass {
    /// Protocol encoding of the class
    pub fn as_i32(&self) -> i32 {
        match self {
            NodeClass::Object => 1,
            NodeClass::Variable => 2,
            NodeClass::Method => 4,
        }
    }
}

/// Readable node attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeId {
    NodeId,
    NodeClass,
    BrowseName,
    DisplayName,
    Value,
    DataType,
    ValueRank,
    Executable,
}

impl AttributeId {
    /// Map a protocol attribute id
    pub fn from_u32(id: u32) -> Option<Self> {
        match id {
            1 => Some(AttributeId::NodeId),
            2 => Some(AttributeId::NodeClass),
            3 => Some(AttributeId::BrowseName),
            4 => Some(AttributeId::DisplayName),
            13 => Some(AttributeId::Value),
            14 => Some(AttributeId::DataType),
            15 => Some(AttributeId::ValueRank),
            21 => Some(AttributeId::Executable),
            _ => None,
        }
    }
}

/// A value together with the status of reading it
#[derive(Debug, Clone, PartialEq)]
pub struct DataValue {
    pub value: Variant,
    pub status: StatusCode,
}

impl DataValue {
    pub fn good(value: Variant) -> Self {
        Self {
            value,
            status: StatusCode::GOOD,
        }
    }

    pub fn bad(status: StatusCode) -> Self {
        Self {
            value: Variant::Empty,
            status,
        }
    }
}

/// Link from a node back to the business object member it represents
#[derive(Debug, Clone)]
pub enum NodeUserData {
    Variable(Arc<BoundVariable>),
    Method(Arc<MethodDispatchRecord>),
}

/// Class-specific part of a node to create
#[derive(Debug, Clone)]
pub enum NodeKind {
    Object,
    Variable {
        value: Variant,
        descriptor: TypeDescriptor,
    },
    Method {
        inputs: Vec<Argument>,
        outputs: Vec<Argument>,
    },
}

/// Everything needed to create one node
#[derive(Debug, Clone)]
pub struct NodeSettings {
    pub parent: NodeId,
    pub reference_type: NodeId,
    pub requested_id: NodeId,
    pub browse_name: String,
    pub display_name: String,
    pub type_definition: NodeId,
    pub kind: NodeKind,
    pub user_data: Option<NodeUserData>,
}

/// One node of the graph
#[derive(Debug, Clone)]
pub struct Node {
    pub node_id: NodeId,
    pub class: NodeClass,
    pub browse_name: String,
    pub display_name: String,
    pub parent: Option<NodeId>,
    pub reference_type: NodeId,
    pub type_definition: NodeId,
    pub value: Variant,
    pub descriptor: Option<TypeDescriptor>,
    pub executable: bool,
    pub input_arguments: Vec<Argument>,
    pub output_arguments: Vec<Argument>,
    pub user_data: Option<NodeUserData>,
    pub children: Vec<NodeId>,
}

/// Callback invoked with the new value whenever a variable's stored value
/// is written
pub type ValueObserver = Arc<dyn Fn(&Variant) + Send + Sync>;

/// The server's node graph
pub struct AddressSpace {
    nodes: RwLock<HashMap<NodeId, Node>>,
    namespaces: RwLock<Vec<String>>,
    observers: RwLock<HashMap<NodeId, Vec<(u32, ValueObserver)>>>,
    next_observer: AtomicU32,
}

impl AddressSpace {
    /// Create an address space holding only the objects folder
    pub fn new() -> Self {
        let objects = Node {
            node_id: ids::OBJECTS_FOLDER,
            class: NodeClass::Object,
            browse_name: "Objects".to_string(),
            display_name: "Objects".to_string(),
            parent: None,
            reference_type: ids::ORGANIZES,
            type_definition: ids::FOLDER_TYPE,
            value: Variant::Empty,
            descriptor: None,
            executable: false,
            input_arguments: Vec::new(),
            output_arguments: Vec::new(),
            user_data: None,
            children: Vec::new(),
        };

        let mut nodes = HashMap::new();
        nodes.insert(objects.node_id.clone(), objects);
        Self {
            nodes: RwLock::new(nodes),
            namespaces: RwLock::new(vec![STANDARD_NAMESPACE_URI.to_string()]),
            observers: RwLock::new(HashMap::new()),
            next_observer: AtomicU32::new(1),
        }
    }

    /// Id of the standard objects folder
    pub fn objects_folder() -> NodeId {
        ids::OBJECTS_FOLDER
    }

    /// Register a namespace URI, returning its index
    ///
    /// Registering a known URI returns the existing index.
    pub fn register_namespace(&self, uri: &str) -> u16 {
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = namespaces.iter().position(|ns| ns == uri) {
            return index as u16;
        }
        namespaces.push(uri.to_string());
        (namespaces.len() - 1) as u16
    }

    pub fn namespace_index(&self, uri: &str) -> Option<u16> {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .position(|ns| ns == uri)
            .map(|index| index as u16)
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create a node
    ///
    /// # Errors
    /// `InvalidData` if the requested id is taken, `NodeNotFound` if the
    /// parent does not exist
    pub fn add_node(&self, settings: NodeSettings) -> UaclResult<NodeId> {
        let NodeSettings {
            parent,
            reference_type,
            requested_id,
            browse_name,
            display_name,
            type_definition,
            kind,
            user_data,
        } = settings;

        let (class, value, descriptor, executable, input_arguments, output_arguments) = match kind
        {
            NodeKind::Object => (NodeClass::Object, Variant::Empty, None, false, vec![], vec![]),
            NodeKind::Variable { value, descriptor } => {
                (NodeClass::Variable, value, Some(descriptor), false, vec![], vec![])
            }
            NodeKind::Method { inputs, outputs } => {
                (NodeClass::Method, Variant::Empty, None, true, inputs, outputs)
            }
        };

        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.contains_key(&requested_id) {
            return Err(UaclError::InvalidData(format!(
                "Node {} already exists",
                requested_id
            )));
        }
        let parent_node = nodes
            .get_mut(&parent)
            .ok_or_else(|| UaclError::NodeNotFound(parent.to_string()))?;
        parent_node.children.push(requested_id.clone());

        nodes.insert(
            requested_id.clone(),
            Node {
                node_id: requested_id.clone(),
                class,
                browse_name,
                display_name,
                parent: Some(parent),
                reference_type,
                type_definition,
                value,
                descriptor,
                executable,
                input_arguments,
                output_arguments,
                user_data,
                children: Vec::new(),
            },
        );
        Ok(requested_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(node_id)
    }

    /// Snapshot of a node
    pub fn node(&self, node_id: &NodeId) -> Option<Node> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node_id)
            .cloned()
    }

    pub fn user_data(&self, node_id: &NodeId) -> Option<NodeUserData> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node_id)
            .and_then(|node| node.user_data.clone())
    }

    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child of `parent` with the given browse name
    pub fn find_child(&self, parent: &NodeId, browse_name: &str) -> Option<NodeId> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes.get(parent)?.children.iter().find_map(|child| {
            nodes
                .get(child)
                .filter(|node| node.browse_name == browse_name)
                .map(|node| node.node_id.clone())
        })
    }

    /// Follow browse names from `start`
    ///
    /// # Errors
    /// `NodeNotFound` naming the path up to the first missing element
    pub fn browse_path(&self, start: &NodeId, path: &[String]) -> UaclResult<NodeId> {
        let mut current = start.clone();
        for (depth, name) in path.iter().enumerate() {
            current = self
                .find_child(&current, name)
                .ok_or_else(|| UaclError::NodeNotFound(path[..=depth].join(".")))?;
        }
        Ok(current)
    }

    /// Read an attribute from node storage
    pub fn read_attribute(&self, node_id: &NodeId, attribute: AttributeId) -> DataValue {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let Some(node) = nodes.get(node_id) else {
            return DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN);
        };

        match attribute {
            AttributeId::NodeId => DataValue::good(Variant::String(node.node_id.to_string())),
            AttributeId::NodeClass => DataValue::good(Variant::Int32(node.class.as_i32())),
            AttributeId::BrowseName => DataValue::good(Variant::String(node.browse_name.clone())),
            AttributeId::DisplayName => {
                DataValue::good(Variant::String(node.display_name.clone()))
            }
            AttributeId::Value if node.class == NodeClass::Variable => {
                DataValue::good(node.value.clone())
            }
            AttributeId::DataType => match node.descriptor {
                Some(descriptor) => {
                    DataValue::good(Variant::String(descriptor.data_type_id().to_string()))
                }
                None => DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
            },
            AttributeId::ValueRank => match node.descriptor {
                Some(descriptor) => DataValue::good(Variant::Int32(descriptor.value_rank.as_i32())),
                None => DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
            },
            AttributeId::Executable if node.class == NodeClass::Method => {
                DataValue::good(Variant::Boolean(node.executable))
            }
            _ => DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
        }
    }

    /// Check that `value` could be stored in `node_id` without storing it
    pub(crate) fn check_value(&self, node_id: &NodeId, value: &Variant) -> StatusCode {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(node_id) {
            None => StatusCode::BAD_NODE_ID_UNKNOWN,
            Some(node) => match node.descriptor {
                None => StatusCode::BAD_NOT_WRITABLE,
                Some(descriptor) if descriptor.accepts(value) => StatusCode::GOOD,
                Some(_) => StatusCode::BAD_TYPE_MISMATCH,
            },
        }
    }

    /// Write the stored value of a variable node
    ///
    /// The value must match the node's declared type. Observers of the node
    /// are notified after the lock is released.
    pub fn write_value(&self, node_id: &NodeId, value: Variant) -> StatusCode {
        {
            let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            let Some(node) = nodes.get_mut(node_id) else {
                return StatusCode::BAD_NODE_ID_UNKNOWN;
            };
            let Some(descriptor) = node.descriptor else {
                return StatusCode::BAD_NOT_WRITABLE;
            };
            if !descriptor.accepts(&value) {
                log::debug!(
                    "Rejected {} for {} of type {}",
                    value.type_name(),
                    node_id,
                    descriptor
                );
                return StatusCode::BAD_TYPE_MISMATCH;
            }
            node.value = value.clone();
        }

        self.notify(node_id, &value);
        StatusCode::GOOD
    }

    /// Update the stored value without type check or notification
    ///
    /// Used to cache a value just read from a business object.
    pub(crate) fn refresh_value(&self, node_id: &NodeId, value: Variant) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = nodes.get_mut(node_id) {
            node.value = value;
        }
    }

    /// Write an attribute into node storage
    ///
    /// Only the value attribute is writable.
    pub fn write_attribute(
        &self,
        node_id: &NodeId,
        attribute: AttributeId,
        value: Variant,
    ) -> StatusCode {
        match attribute {
            AttributeId::Value => self.write_value(node_id, value),
            _ if !self.contains(node_id) => StatusCode::BAD_NODE_ID_UNKNOWN,
            _ => StatusCode::BAD_NOT_WRITABLE,
        }
    }

    /// Delete a node and everything below it
    pub fn delete_subtree(&self, node_id: &NodeId) -> StatusCode {
        if *node_id == Self::objects_folder() {
            return StatusCode::BAD_NOT_WRITABLE;
        }

        let removed = {
            let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            let Some(node) = nodes.get(node_id) else {
                return StatusCode::BAD_NODE_ID_UNKNOWN;
            };
            if let Some(parent) = node.parent.clone() {
                if let Some(parent) = nodes.get_mut(&parent) {
                    parent.children.retain(|child| child != node_id);
                }
            }

            let mut pending = vec![node_id.clone()];
            let mut removed = Vec::new();
            while let Some(id) = pending.pop() {
                if let Some(node) = nodes.remove(&id) {
                    pending.extend(node.children);
                    removed.push(id);
                }
            }
            removed
        };

        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for id in &removed {
            observers.remove(id);
        }
        log::debug!("Deleted {} ({} nodes)", node_id, removed.len());
        StatusCode::GOOD
    }

    /// Observe writes of a variable's stored value
    ///
    /// # Returns
    /// Handle for [`AddressSpace::remove_value_observer`]
    pub fn add_value_observer(&self, node_id: &NodeId, observer: ValueObserver) -> UaclResult<u32> {
        match self.node(node_id) {
            Some(node) if node.class == NodeClass::Variable => {}
            Some(_) => {
                return Err(UaclError::BadStatus(StatusCode::BAD_ATTRIBUTE_ID_INVALID));
            }
            None => return Err(UaclError::NodeNotFound(node_id.to_string())),
        }

        let handle = self.next_observer.fetch_add(1, Ordering::Relaxed);
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(node_id.clone())
            .or_default()
            .push((handle, observer));
        Ok(handle)
    }

    pub fn remove_value_observer(&self, handle: u32) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut found = false;
        for list in observers.values_mut() {
            let before = list.len();
            list.retain(|(h, _)| *h != handle);
            found |= list.len() != before;
        }
        found
    }

    fn notify(&self, node_id: &NodeId, value: &Variant) {
        let targets: Vec<ValueObserver> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node_id)
            .map(|list| list.iter().map(|(_, observer)| Arc::clone(observer)).collect())
            .unwrap_or_default();
        for observer in targets {
            observer(value);
        }
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("nodes", &self.len())
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uacl_core::VariantType;

    fn folder(parent: NodeId, id: &str) -> NodeSettings {
        NodeSettings {
            parent,
            reference_type: ids::ORGANIZES,
            requested_id: NodeId::string(1, id),
            browse_name: id.to_string(),
            display_name: id.to_string(),
            type_definition: ids::FOLDER_TYPE,
            kind: NodeKind::Object,
            user_data: None,
        }
    }

    fn variable(parent: NodeId, id: &str, value: Variant) -> NodeSettings {
        NodeSettings {
            parent,
            reference_type: ids::HAS_COMPONENT,
            requested_id: NodeId::string(1, id),
            browse_name: id.to_string(),
            display_name: id.to_string(),
            type_definition: ids::BASE_DATA_VARIABLE_TYPE,
            kind: NodeKind::Variable {
                value,
                descriptor: TypeDescriptor::scalar(VariantType::Int32),
            },
            user_data: None,
        }
    }

    #[test]
    fn test_add_and_browse() {
        let space = AddressSpace::new();
        let root = space
            .add_node(folder(AddressSpace::objects_folder(), "app"))
            .unwrap();
        let speed = space
            .add_node(variable(root.clone(), "Speed", Variant::Int32(3)))
            .unwrap();

        assert_eq!(space.len(), 3);
        assert_eq!(space.find_child(&root, "Speed"), Some(speed.clone()));
        assert_eq!(
            space.browse_path(&AddressSpace::objects_folder(), &["app".into(), "Speed".into()]),
            Ok(speed.clone())
        );
        assert_eq!(
            space.browse_path(&AddressSpace::objects_folder(), &["app".into(), "Flow".into()]),
            Err(UaclError::NodeNotFound("app.Flow".into()))
        );
        assert_eq!(
            space.read_attribute(&speed, AttributeId::Value),
            DataValue::good(Variant::Int32(3))
        );
    }

    #[test]
    fn test_duplicate_and_orphan_nodes_rejected() {
        let space = AddressSpace::new();
        space
            .add_node(folder(AddressSpace::objects_folder(), "app"))
            .unwrap();
        assert!(matches!(
            space.add_node(folder(AddressSpace::objects_folder(), "app")),
            Err(UaclError::InvalidData(_))
        ));
        assert!(matches!(
            space.add_node(folder(NodeId::string(1, "missing"), "x")),
            Err(UaclError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_write_value_is_type_checked() {
        let space = AddressSpace::new();
        let speed = space
            .add_node(variable(AddressSpace::objects_folder(), "Speed", Variant::Empty))
            .unwrap();

        assert_eq!(space.write_value(&speed, Variant::Int32(5)), StatusCode::GOOD);
        assert_eq!(
            space.write_value(&speed, Variant::String("5".into())),
            StatusCode::BAD_TYPE_MISMATCH
        );
        assert_eq!(
            space.write_attribute(&speed, AttributeId::BrowseName, Variant::Empty),
            StatusCode::BAD_NOT_WRITABLE
        );
        assert_eq!(
            space.read_attribute(&speed, AttributeId::Value).value,
            Variant::Int32(5)
        );
        assert_eq!(
            space.read_attribute(&speed, AttributeId::Executable).status,
            StatusCode::BAD_ATTRIBUTE_ID_INVALID
        );
    }

    #[test]
    fn test_observers_see_writes() {
        let space = AddressSpace::new();
        let speed = space
            .add_node(variable(AddressSpace::objects_folder(), "Speed", Variant::Empty))
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = space
            .add_value_observer(&speed, Arc::new(move |v: &Variant| sink.lock().unwrap().push(v.clone())))
            .unwrap();

        space.write_value(&speed, Variant::Int32(1));
        assert!(space.remove_value_observer(handle));
        space.write_value(&speed, Variant::Int32(2));
        assert_eq!(*seen.lock().unwrap(), vec![Variant::Int32(1)]);
    }

    #[test]
    fn test_delete_subtree() {
        let space = AddressSpace::new();
        let root = space
            .add_node(folder(AddressSpace::objects_folder(), "app"))
            .unwrap();
        space
            .add_node(variable(root.clone(), "Speed", Variant::Empty))
            .unwrap();

        assert_eq!(space.delete_subtree(&root), StatusCode::GOOD);
        assert_eq!(space.len(), 1);
        assert!(space.find_child(&AddressSpace::objects_folder(), "app").is_none());
        assert_eq!(space.delete_subtree(&root), StatusCode::BAD_NODE_ID_UNKNOWN);
        assert_eq!(
            space.delete_subtree(&AddressSpace::objects_folder()),
            StatusCode::BAD_NOT_WRITABLE
        );
    }

    #[test]
    fn test_namespaces() {
        let space = AddressSpace::new();
        let a = space.register_namespace("urn:a");
        assert_eq!(a, 1);
        assert_eq!(space.register_namespace("urn:a"), 1);
        assert_eq!(space.namespace_index(STANDARD_NAMESPACE_URI), Some(0));
        assert_eq!(space.namespace_index("urn:b"), None);
    }
}
