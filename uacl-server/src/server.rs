//! UACL server
//!
//! Owns the address space, the session-context registry and the dispatch
//! engine, and drives materialization of registered business objects.
//!
//! # Usage Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use uacl_server::{AttributeId, ObjectDescriptor, ServerConfig, UaObject, UaServer};
//! use uacl_core::Variant;
//!
//! #[derive(Default)]
//! struct Pump {
//!     speed: AtomicI32,
//! }
//!
//! impl UaObject for Pump {
//!     fn describe() -> ObjectDescriptor<Self> {
//!         ObjectDescriptor::new().variable_rw(
//!             "Speed",
//!             |p: &Pump| p.speed.load(Ordering::SeqCst),
//!             |p: &Pump, v: i32| p.speed.store(v, Ordering::SeqCst),
//!         )
//!     }
//! }
//!
//! let server = UaServer::new(ServerConfig::default());
//! server.register(Arc::new(Pump::default()));
//! server.startup().unwrap();
//!
//! let speed = server
//!     .browse_path(&["application".into(), "Pump_1".into(), "Speed".into()])
//!     .unwrap();
//! server.write(&speed, AttributeId::Value, Variant::Int32(42));
//! assert_eq!(server.read(&speed, AttributeId::Value).value, Variant::Int32(42));
//! ```

use crate::address_space::{AddressSpace, AttributeId, DataValue, ValueObserver};
use crate::builder::AddressSpaceBuilder;
use crate::config::ServerConfig;
use crate::context::{SessionContexts, SessionId};
use crate::dispatch::{CallMethodResult, DispatchEngine};
use crate::model::{ObjectCapsule, SessionContext, UaObject};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uacl_core::{NodeId, StatusCode, UaclError, UaclResult, Variant};

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Objects can be registered, no nodes exist yet
    #[default]
    Created,
    Running,
    /// Terminal
    Stopped,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Created => "Created",
            ServerState::Running => "Running",
            ServerState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct UaServer {
    config: ServerConfig,
    space: Arc<AddressSpace>,
    contexts: Arc<SessionContexts>,
    dispatch: DispatchEngine,
    builder: RwLock<Option<AddressSpaceBuilder>>,
    objects: RwLock<Vec<ObjectCapsule>>,
    state: Mutex<ServerState>,
}

impl UaServer {
    /// Create a server; blank configuration values fall back to the defaults
    pub fn new(config: ServerConfig) -> Self {
        let space = Arc::new(AddressSpace::new());
        let contexts = Arc::new(SessionContexts::new());
        let dispatch = DispatchEngine::new(Arc::clone(&space), Arc::clone(&contexts));

        Self {
            config: config.normalized(),
            space,
            contexts,
            dispatch,
            builder: RwLock::new(None),
            objects: RwLock::new(Vec::new()),
            state: Mutex::new(ServerState::Created),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn address_space(&self) -> &Arc<AddressSpace> {
        &self.space
    }

    /// Application folder node, once the server runs
    pub fn root(&self) -> Option<NodeId> {
        self.builder
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|builder| builder.root().clone())
    }

    /// Register a business object
    ///
    /// Registering the same instance again returns the existing capsule.
    /// Objects registered while running become nodes on the next
    /// [`UaServer::add_unregistered_nodes`].
    pub fn register<T: UaObject>(&self, object: Arc<T>) -> ObjectCapsule {
        self.register_capsule(ObjectCapsule::new(object))
    }

    pub fn register_capsule(&self, capsule: ObjectCapsule) -> ObjectCapsule {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = objects.iter().find(|known| known.same_object(&capsule)) {
            log::debug!("{} is already registered", capsule.type_name());
            return existing.clone();
        }
        objects.push(capsule.clone());
        capsule
    }

    pub fn object_count(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Create the server namespaces and materialize all registered objects
    ///
    /// # Errors
    /// Returns error if the server is already running or was stopped
    pub fn startup(&self) -> UaclResult<()> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != ServerState::Created {
                return Err(UaclError::InvalidData(format!(
                    "Cannot start a server in state {}",
                    state
                )));
            }

            let builder = AddressSpaceBuilder::new(Arc::clone(&self.space), &self.config)?;
            *self.builder.write().unwrap_or_else(PoisonError::into_inner) = Some(builder);
            *state = ServerState::Running;
        }

        let created = self.add_unregistered_nodes()?;
        log::info!(
            "Server {} started with {} objects",
            self.config.application_uri,
            created
        );
        Ok(())
    }

    /// Materialize registered objects that have no nodes yet
    ///
    /// An object whose build fails is logged and left unregistered without
    /// stopping the others; a later call retries it.
    ///
    /// # Returns
    /// Number of top-level objects materialized
    pub fn add_unregistered_nodes(&self) -> UaclResult<usize> {
        if !self.is_running() {
            return Err(UaclError::BadStatus(self.unavailable_status()));
        }
        let builder = self.builder.read().unwrap_or_else(PoisonError::into_inner);
        let Some(builder) = builder.as_ref() else {
            return Err(UaclError::BadStatus(self.unavailable_status()));
        };

        let pending: Vec<ObjectCapsule> = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|capsule| !capsule.is_registered())
            .cloned()
            .collect();

        let mut created = 0;
        for capsule in &pending {
            match builder.materialize(capsule) {
                Ok(Some(_)) => created += 1,
                Ok(None) => {}
                Err(e) => log::error!(
                    "Failed to add {} to the address space: {}",
                    capsule.type_name(),
                    e
                ),
            }
        }
        Ok(created)
    }

    /// Stop serving requests
    ///
    /// Drops all session contexts. The address space stays readable through
    /// [`UaServer::address_space`] but every request answers `BadShutdown`.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == ServerState::Stopped {
            return;
        }
        *state = ServerState::Stopped;
        self.contexts.clear();
        log::info!("Server {} stopped", self.config.application_uri);
    }

    /// Open a client session, optionally carrying a context for
    /// session-aware methods
    pub fn open_session(&self, context: Option<SessionContext>) -> SessionId {
        self.contexts.open(context)
    }

    pub fn close_session(&self, id: SessionId) -> bool {
        self.contexts.close(id)
    }

    pub fn read(&self, node_id: &NodeId, attribute: AttributeId) -> DataValue {
        if !self.is_running() {
            return DataValue::bad(self.unavailable_status());
        }
        self.dispatch.read_attribute(node_id, attribute)
    }

    pub fn write(&self, node_id: &NodeId, attribute: AttributeId, value: Variant) -> StatusCode {
        if !self.is_running() {
            return self.unavailable_status();
        }
        self.dispatch.write_attribute(node_id, attribute, value)
    }

    /// Call a method; the caller expects as many outputs as the node declares
    pub fn call(
        &self,
        session: Option<SessionId>,
        object_id: &NodeId,
        method_id: &NodeId,
        inputs: &[Variant],
    ) -> CallMethodResult {
        if !self.is_running() {
            return CallMethodResult::bad(self.unavailable_status());
        }
        let requested_outputs = self
            .space
            .node(method_id)
            .map(|node| node.output_arguments.len())
            .unwrap_or(0);
        self.dispatch
            .call_method(session, object_id, method_id, inputs, requested_outputs)
    }

    pub fn delete_node(&self, node_id: &NodeId) -> bool {
        self.is_running() && self.dispatch.delete_node(node_id)
    }

    /// Resolve a browse path starting at the ObjectsFolder
    pub fn browse_path(&self, path: &[String]) -> UaclResult<NodeId> {
        if !self.is_running() {
            return Err(UaclError::BadStatus(self.unavailable_status()));
        }
        self.space.browse_path(&AddressSpace::objects_folder(), path)
    }

    /// Observe value changes of a variable node
    ///
    /// # Returns
    /// Handle for [`UaServer::unsubscribe`]
    pub fn subscribe(&self, node_id: &NodeId, observer: ValueObserver) -> UaclResult<u32> {
        if !self.is_running() {
            return Err(UaclError::BadStatus(self.unavailable_status()));
        }
        self.space.add_value_observer(node_id, observer)
    }

    pub fn unsubscribe(&self, handle: u32) -> bool {
        self.space.remove_value_observer(handle)
    }

    fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    fn unavailable_status(&self) -> StatusCode {
        match self.state() {
            ServerState::Stopped => StatusCode::BAD_SHUTDOWN,
            _ => StatusCode::BAD_SERVER_NOT_CONNECTED,
        }
    }
}

impl Default for UaServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl fmt::Debug for UaServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UaServer")
            .field("application_uri", &self.config.application_uri)
            .field("state", &self.state())
            .field("objects", &self.object_count())
            .field("nodes", &self.space.len())
            .finish()
    }
}
