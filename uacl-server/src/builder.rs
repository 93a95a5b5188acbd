//! Address-space builder
//!
//! Materializes registered business objects into the node graph:
//!
//! ```text
//! Objects (ns=0;i=85)
//! └── application                      Organizes
//!     └── Pump_1                       Organizes
//!         ├── Pump_1.Speed             HasComponent, variable
//!         ├── Pump_1.Start             HasComponent, method
//!         └── Pump_1.Valves            HasComponent, folder
//!             └── Valve_2              Organizes
//! ```
//!
//! Object ids are `{TypeName}_{n}` with `n` drawn from a counter owned by the
//! builder; numbers are never reused. The builder is meant to be driven from
//! one controlling thread.

use crate::address_space::{AddressSpace, NodeKind, NodeSettings, NodeUserData};
use crate::config::ServerConfig;
use crate::model::capsule::ChangePublisher;
use crate::model::{Argument, MethodDispatchRecord, ObjectCapsule};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uacl_core::node_id::ids;
use uacl_core::{NodeId, UaclResult};

pub struct AddressSpaceBuilder {
    space: Arc<AddressSpace>,
    instances_namespace: u16,
    types_namespace: u16,
    root: NodeId,
    next_instance: AtomicU32,
}

impl AddressSpaceBuilder {
    /// Allocate the server namespaces and create the application folder
    ///
    /// # Errors
    /// Returns error if the application folder already exists
    pub fn new(space: Arc<AddressSpace>, config: &ServerConfig) -> UaclResult<Self> {
        let config = config.normalized();
        let instances_namespace = space.register_namespace(&config.instances_namespace_uri());
        let types_namespace = space.register_namespace(&config.types_namespace_uri());

        let root = space.add_node(NodeSettings {
            parent: AddressSpace::objects_folder(),
            reference_type: ids::ORGANIZES,
            requested_id: NodeId::string(instances_namespace, config.application_uri.as_str()),
            browse_name: config.application_uri.clone(),
            display_name: config.application_uri.clone(),
            type_definition: ids::FOLDER_TYPE,
            kind: NodeKind::Object,
            user_data: None,
        })?;
        log::info!(
            "Created application folder {} (instances ns={}, types ns={})",
            root,
            instances_namespace,
            types_namespace
        );

        Ok(Self {
            space,
            instances_namespace,
            types_namespace,
            root,
            next_instance: AtomicU32::new(1),
        })
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn instances_namespace(&self) -> u16 {
        self.instances_namespace
    }

    pub fn types_namespace(&self) -> u16 {
        self.types_namespace
    }

    /// Materialize a capsule below the application folder
    ///
    /// A failed build removes every node it created and releases the claim on
    /// the capsule and its collection elements, so it can be retried.
    ///
    /// # Returns
    /// The object node id, or `None` if the capsule was materialized before
    pub fn materialize(&self, capsule: &ObjectCapsule) -> UaclResult<Option<NodeId>> {
        let root = self.root.clone();
        let mut claims = Claims::default();
        match self.build_object(capsule, &root, &mut claims) {
            Ok(object_id) => Ok(object_id),
            Err(e) => {
                if let Some(top) = &claims.top {
                    self.space.delete_subtree(top);
                }
                for claimed in &claims.capsules {
                    claimed.reset_registration();
                }
                log::warn!("Rolled back {}: {}", capsule.type_name(), e);
                Err(e)
            }
        }
    }

    fn build_object(
        &self,
        capsule: &ObjectCapsule,
        parent: &NodeId,
        claims: &mut Claims,
    ) -> UaclResult<Option<NodeId>> {
        if !capsule.try_mark_registered() {
            return Ok(None);
        }
        claims.capsules.push(capsule.clone());

        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}_{}", capsule.type_name(), instance);
        let object_id = self.space.add_node(NodeSettings {
            parent: parent.clone(),
            reference_type: ids::ORGANIZES,
            requested_id: NodeId::string(self.instances_namespace, name.as_str()),
            browse_name: name.clone(),
            display_name: name.clone(),
            type_definition: ids::BASE_OBJECT_TYPE,
            kind: NodeKind::Object,
            user_data: None,
        })?;
        claims.top.get_or_insert_with(|| object_id.clone());
        capsule.assign_node_id(object_id.clone());

        let mut members = HashMap::new();
        for variable in capsule.variables() {
            let descriptor = variable.descriptor();
            let node_id = self.space.add_node(NodeSettings {
                parent: object_id.clone(),
                reference_type: ids::HAS_COMPONENT,
                requested_id: self.member_id(&name, variable.name()),
                browse_name: variable.name().to_string(),
                display_name: variable.name().to_string(),
                type_definition: ids::BASE_DATA_VARIABLE_TYPE,
                kind: NodeKind::Variable {
                    value: variable.read(),
                    descriptor,
                },
                user_data: Some(NodeUserData::Variable(Arc::clone(variable))),
            })?;
            members.insert(variable.name().to_string(), node_id);
        }

        for method in capsule.methods() {
            let record = MethodDispatchRecord {
                object_id: object_id.clone(),
                method: Arc::clone(method),
            };
            let outputs: Vec<Argument> = method.output().cloned().into_iter().collect();
            self.space.add_node(NodeSettings {
                parent: object_id.clone(),
                reference_type: ids::HAS_COMPONENT,
                requested_id: self.member_id(&name, method.name()),
                browse_name: method.name().to_string(),
                display_name: method.name().to_string(),
                type_definition: NodeId::null(),
                kind: NodeKind::Method {
                    inputs: method.inputs().to_vec(),
                    outputs,
                },
                user_data: Some(NodeUserData::Method(Arc::new(record))),
            })?;
        }

        for collection in capsule.collections() {
            let folder = self.space.add_node(NodeSettings {
                parent: object_id.clone(),
                reference_type: ids::HAS_COMPONENT,
                requested_id: self.member_id(&name, collection.name()),
                browse_name: collection.name().to_string(),
                display_name: collection.name().to_string(),
                type_definition: ids::FOLDER_TYPE,
                kind: NodeKind::Object,
                user_data: None,
            })?;
            for element in collection.elements() {
                self.build_object(&element, &folder, claims)?;
            }
        }

        capsule.attach_publisher(ChangePublisher::new(&self.space, members));
        log::debug!("Materialized {} as {}", capsule.type_name(), object_id);
        Ok(Some(object_id))
    }

    fn member_id(&self, object_name: &str, member: &str) -> NodeId {
        NodeId::string(
            self.instances_namespace,
            format!("{}.{}", object_name, member),
        )
    }
}

/// Capsules claimed and the first node created by one `materialize` call
#[derive(Default)]
struct Claims {
    capsules: Vec<ObjectCapsule>,
    top: Option<NodeId>,
}
