//! Business object capsules

use crate::address_space::AddressSpace;
use crate::model::bound::{BoundCollection, BoundMethod, BoundVariable};
use crate::model::descriptor::UaObject;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use uacl_core::{NodeId, StatusCode, UaclError, UaclResult};

/// Pushes local member changes into the address space
pub(crate) struct ChangePublisher {
    space: Weak<AddressSpace>,
    members: HashMap<String, NodeId>,
}

impl ChangePublisher {
    pub(crate) fn new(space: &Arc<AddressSpace>, members: HashMap<String, NodeId>) -> Self {
        Self {
            space: Arc::downgrade(space),
            members,
        }
    }
}

struct CapsuleInner {
    type_name: String,
    object: Arc<dyn Any + Send + Sync>,
    variables: Vec<Arc<BoundVariable>>,
    methods: Vec<Arc<BoundMethod>>,
    collections: Vec<BoundCollection>,
    registered: AtomicBool,
    node_id: RwLock<Option<NodeId>>,
    publisher: RwLock<Option<ChangePublisher>>,
}

/// A business object together with its bound members and registration state
///
/// Clones share the same state, so a capsule handed out twice is still
/// materialized only once.
#[derive(Clone)]
pub struct ObjectCapsule {
    inner: Arc<CapsuleInner>,
}

impl ObjectCapsule {
    /// Wrap a shared business object
    pub fn new<T: UaObject>(object: Arc<T>) -> Self {
        let descriptor = T::describe();

        let variables = descriptor
            .variables
            .iter()
            .map(|binding| Arc::new(BoundVariable::bind(binding, &object)))
            .collect();
        let methods = descriptor
            .methods
            .iter()
            .map(|binding| Arc::new(BoundMethod::bind(binding, &object)))
            .collect();
        let collections = descriptor
            .collections
            .iter()
            .map(|binding| BoundCollection::bind(binding, &object))
            .collect();

        Self {
            inner: Arc::new(CapsuleInner {
                type_name: descriptor.type_name,
                object,
                variables,
                methods,
                collections,
                registered: AtomicBool::new(false),
                node_id: RwLock::new(None),
                publisher: RwLock::new(None),
            }),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    /// Node id of the object node, once materialized
    pub fn node_id(&self) -> Option<NodeId> {
        self.inner
            .node_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_registered(&self) -> bool {
        self.inner.registered.load(Ordering::SeqCst)
    }

    /// The wrapped object, if it is a `T`
    pub fn downcast<T: UaObject>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner.object).downcast::<T>().ok()
    }

    /// Whether both capsules wrap the same object instance
    pub fn same_object(&self, other: &ObjectCapsule) -> bool {
        std::ptr::addr_eq(
            Arc::as_ptr(&self.inner.object),
            Arc::as_ptr(&other.inner.object),
        )
    }

    pub fn variables(&self) -> &[Arc<BoundVariable>] {
        &self.inner.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Arc<BoundVariable>> {
        self.inner.variables.iter().find(|v| v.name() == name)
    }

    pub fn methods(&self) -> &[Arc<BoundMethod>] {
        &self.inner.methods
    }

    pub fn collections(&self) -> &[BoundCollection] {
        &self.inner.collections
    }

    /// Claim the capsule for materialization
    ///
    /// Returns `true` exactly once over the capsule's lifetime.
    pub(crate) fn try_mark_registered(&self) -> bool {
        self.inner
            .registered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn assign_node_id(&self, node_id: NodeId) {
        *self
            .inner
            .node_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(node_id);
    }

    pub(crate) fn attach_publisher(&self, publisher: ChangePublisher) {
        *self
            .inner
            .publisher
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(publisher);
    }

    /// Undo a failed materialization so the capsule can be built again
    pub(crate) fn reset_registration(&self) {
        self.inner
            .node_id
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner
            .publisher
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.registered.store(false, Ordering::SeqCst);
    }

    /// Push the current value of variable `member` into its node
    ///
    /// Call after changing the member locally so readers and monitored items
    /// see the new value.
    ///
    /// # Errors
    /// - `InvalidData` if the capsule is not materialized yet
    /// - `NodeNotFound` if `member` is not a variable of this object
    /// - `BadStatus` if the address space rejected the value
    pub fn publish_change(&self, member: &str) -> UaclResult<()> {
        let (space, node_id) = {
            let publisher = self
                .inner
                .publisher
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let publisher = publisher.as_ref().ok_or_else(|| {
                UaclError::InvalidData(format!("{} is not materialized", self.inner.type_name))
            })?;
            let node_id = publisher.members.get(member).cloned().ok_or_else(|| {
                UaclError::NodeNotFound(format!("{}.{}", self.inner.type_name, member))
            })?;
            (publisher.space.upgrade(), node_id)
        };
        let variable = self
            .variable(member)
            .ok_or_else(|| UaclError::NodeNotFound(format!("{}.{}", self.inner.type_name, member)))?;
        let space = space.ok_or(UaclError::BadStatus(StatusCode::BAD_SHUTDOWN))?;

        let status = space.write_value(&node_id, variable.read());
        if status.is_good() {
            Ok(())
        } else {
            Err(UaclError::BadStatus(status))
        }
    }
}

impl fmt::Debug for ObjectCapsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCapsule")
            .field("type_name", &self.inner.type_name)
            .field("node_id", &self.node_id())
            .field("registered", &self.is_registered())
            .finish()
    }
}
