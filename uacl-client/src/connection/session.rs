//! Protocol session seam
//!
//! The supervisor never talks to the wire directly. It drives an
//! [`UaSession`] created by a [`SessionFactory`]; a real protocol stack, the
//! in-process loopback, or a test double all plug in here.

use crate::config::{ConnectionInfo, SecurityMode};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use uacl_core::{ConnectionStatus, NodeId, UaclResult, Variant};

/// Callback receiving every connection status change of a session
pub type StatusListener = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Callback receiving the new value of a monitored node
pub type DataChangeCallback = Arc<dyn Fn(&Variant) + Send + Sync>;

/// One protocol session to a remote endpoint
///
/// Implementations must be internally synchronized; the supervisor still
/// serializes all calls through its session lock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UaSession: Send + Sync {
    /// Open the connection to `endpoint_url`
    async fn connect(&self, endpoint_url: &str, security_mode: SecurityMode) -> UaclResult<()>;

    /// Current connection status as last reported by the stack
    fn status(&self) -> ConnectionStatus;

    /// Install the listener notified on every status change
    ///
    /// Replaces any previously installed listener.
    fn set_status_listener(&self, listener: StatusListener);

    /// Resolve a browse path starting below the server's objects folder
    async fn translate_browse_path(&self, path: &[String]) -> UaclResult<NodeId>;

    async fn read_value(&self, node_id: &NodeId) -> UaclResult<Variant>;

    async fn write_value(&self, node_id: &NodeId, value: Variant) -> UaclResult<()>;

    async fn call_method(
        &self,
        object_id: &NodeId,
        method_id: &NodeId,
        arguments: Vec<Variant>,
    ) -> UaclResult<Vec<Variant>>;

    /// Subscribe to value changes of `node_id`, returning the monitored item id
    async fn create_monitored_item(
        &self,
        node_id: &NodeId,
        callback: DataChangeCallback,
    ) -> UaclResult<u32>;

    /// Close the connection and release the session
    async fn disconnect(&self);
}

/// Creates sessions for a connection target
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(&self, info: &ConnectionInfo) -> UaclResult<Arc<dyn UaSession>>;
}

/// A session owned by one supervisor
pub struct SessionHandle {
    session: Arc<dyn UaSession>,
    timed_out: bool,
    listener_registered: bool,
}

impl SessionHandle {
    pub fn new(session: Arc<dyn UaSession>) -> Self {
        Self {
            session,
            timed_out: false,
            listener_registered: false,
        }
    }

    pub fn session(&self) -> Arc<dyn UaSession> {
        Arc::clone(&self.session)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.session.status()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Whether a connect on this handle ran into its deadline
    ///
    /// A timed-out handle is never connected again; the establishment loop
    /// replaces it.
    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    pub(crate) fn mark_timed_out(&mut self) {
        self.timed_out = true;
    }

    /// Install `listener` unless a listener was already installed
    pub(crate) fn register_listener(&mut self, listener: StatusListener) {
        if !self.listener_registered {
            self.session.set_status_listener(listener);
            self.listener_registered = true;
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("status", &self.status())
            .field("timed_out", &self.timed_out)
            .field("listener_registered", &self.listener_registered)
            .finish()
    }
}
