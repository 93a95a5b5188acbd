//! In-process loopback transport
//!
//! Connects the client stack to a [`UaServer`] living in the same process.
//! Every session operation becomes a direct server request; there is no wire
//! encoding and the security mode is ignored.

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use uacl_client::{
    ConnectionInfo, DataChangeCallback, SecurityMode, SessionFactory, StatusListener, UaSession,
};
use uacl_core::{ConnectionStatus, NodeId, UaclError, UaclResult, Variant};
use uacl_server::{AttributeId, ServerState, SessionContext, SessionId, UaServer};

/// Creates [`LoopbackSession`]s against one server
#[derive(Clone)]
pub struct LoopbackFactory {
    server: Arc<UaServer>,
    context: Option<SessionContext>,
}

impl LoopbackFactory {
    pub fn new(server: Arc<UaServer>) -> Self {
        Self {
            server,
            context: None,
        }
    }

    /// Attach `context` to every session this factory opens
    ///
    /// Session-aware server methods receive it in their call.
    pub fn with_context(mut self, context: SessionContext) -> Self {
        self.context = Some(context);
        self
    }
}

impl fmt::Debug for LoopbackFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackFactory")
            .field("server", &self.server)
            .field("context", &self.context.is_some())
            .finish()
    }
}

#[async_trait]
impl SessionFactory for LoopbackFactory {
    async fn create_session(&self, info: &ConnectionInfo) -> UaclResult<Arc<dyn UaSession>> {
        if self.server.state() == ServerState::Stopped {
            return Err(UaclError::Connection(format!(
                "{} is shut down",
                info.endpoint_url()
            )));
        }
        Ok(Arc::new(LoopbackSession::new(
            Arc::clone(&self.server),
            self.context.clone(),
        )))
    }
}

#[derive(Default)]
struct SessionState {
    id: Option<SessionId>,
    status: ConnectionStatus,
    listener: Option<StatusListener>,
    monitored_items: Vec<u32>,
}

/// A session served in-process by a [`UaServer`]
pub struct LoopbackSession {
    server: Arc<UaServer>,
    context: Option<SessionContext>,
    state: Mutex<SessionState>,
}

impl LoopbackSession {
    pub fn new(server: Arc<UaServer>, context: Option<SessionContext>) -> Self {
        Self {
            server,
            context,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Server-side id of this session while connected
    pub fn session_id(&self) -> Option<SessionId> {
        self.lock().id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `status` and notify the listener outside the state lock
    fn set_status(&self, status: ConnectionStatus) {
        let listener = {
            let mut state = self.lock();
            state.status = status;
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener(status);
        }
    }

    fn connected_id(&self) -> UaclResult<SessionId> {
        let state = self.lock();
        match state.id {
            Some(id) if state.status == ConnectionStatus::Connected => Ok(id),
            _ => Err(UaclError::NotConnected),
        }
    }
}

#[async_trait]
impl UaSession for LoopbackSession {
    async fn connect(&self, endpoint_url: &str, _security_mode: SecurityMode) -> UaclResult<()> {
        if self.server.state() != ServerState::Running {
            return Err(UaclError::Connection(format!(
                "{} is {}",
                endpoint_url,
                self.server.state()
            )));
        }

        {
            let mut state = self.lock();
            if state.id.is_none() {
                state.id = Some(self.server.open_session(self.context.clone()));
            }
        }
        log::debug!("Loopback session connected to {}", endpoint_url);
        self.set_status(ConnectionStatus::Connected);
        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    fn set_status_listener(&self, listener: StatusListener) {
        self.lock().listener = Some(listener);
    }

    async fn translate_browse_path(&self, path: &[String]) -> UaclResult<NodeId> {
        self.connected_id()?;
        self.server.browse_path(path)
    }

    async fn read_value(&self, node_id: &NodeId) -> UaclResult<Variant> {
        self.connected_id()?;
        let data = self.server.read(node_id, AttributeId::Value);
        if data.status.is_bad() {
            return Err(UaclError::BadStatus(data.status));
        }
        Ok(data.value)
    }

    async fn write_value(&self, node_id: &NodeId, value: Variant) -> UaclResult<()> {
        self.connected_id()?;
        let status = self.server.write(node_id, AttributeId::Value, value);
        if status.is_bad() {
            return Err(UaclError::BadStatus(status));
        }
        Ok(())
    }

    async fn call_method(
        &self,
        object_id: &NodeId,
        method_id: &NodeId,
        arguments: Vec<Variant>,
    ) -> UaclResult<Vec<Variant>> {
        let id = self.connected_id()?;
        let result = self.server.call(Some(id), object_id, method_id, &arguments);
        if result.status.is_bad() {
            return Err(UaclError::BadStatus(result.status));
        }
        Ok(result.outputs)
    }

    async fn create_monitored_item(
        &self,
        node_id: &NodeId,
        callback: DataChangeCallback,
    ) -> UaclResult<u32> {
        self.connected_id()?;
        let handle = self.server.subscribe(node_id, callback)?;
        self.lock().monitored_items.push(handle);
        Ok(handle)
    }

    async fn disconnect(&self) {
        let (id, items) = {
            let mut state = self.lock();
            (state.id.take(), std::mem::take(&mut state.monitored_items))
        };
        for handle in items {
            self.server.unsubscribe(handle);
        }
        if let Some(id) = id {
            self.server.close_session(id);
        }
        self.set_status(ConnectionStatus::Disconnected);
    }
}

impl fmt::Debug for LoopbackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("LoopbackSession")
            .field("id", &state.id)
            .field("status", &state.status)
            .field("monitored_items", &state.monitored_items.len())
            .finish()
    }
}
