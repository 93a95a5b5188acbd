//! Connection builder for UACL clients
//!
//! This module provides a builder pattern for creating a
//! [`ConnectionSupervisor`]. The builder collects the endpoint, supervisor
//! timing and event sinks before the supervisor starts its establishment
//! loop, so no connection event can be missed.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use uacl_client::{ConnectionBuilder, SecurityMode, SessionFactory};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example(factory: Arc<dyn SessionFactory>) -> uacl_core::UaclResult<()> {
//! let supervisor = ConnectionBuilder::new()
//!     .endpoint("192.168.1.100", 4840, "uacl")
//!     .security_mode(SecurityMode::Sign)
//!     .retry_delay(Duration::from_secs(2))
//!     .on_connected(|| log::info!("PLC online"))
//!     .build(factory)?;
//! # Ok(())
//! # }
//! ```

use super::supervisor::{ConnectionSupervisor, EventSink, EventSinks, StatusSink};
use super::SessionFactory;
use crate::config::{ConnectionInfo, SecurityMode, SupervisorConfig};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uacl_core::{ConnectionStatus, UaclError, UaclResult};

/// Connection builder for creating supervised client connections
///
/// # Configuration Flow
/// 1. Create builder with `ConnectionBuilder::new()`
/// 2. Configure the endpoint (required)
/// 3. Optionally tune retry timing, security mode and reconnect behaviour
/// 4. Optionally attach event sinks
/// 5. Build with `build(factory)`, which starts connection establishment
#[derive(Clone, Default)]
pub struct ConnectionBuilder {
    /// Connection target
    endpoint: Option<ConnectionInfo>,
    /// Supervisor timing and behaviour
    config: SupervisorConfig,
    on_connected: Option<EventSink>,
    on_disconnected: Option<EventSink>,
    on_status: Option<StatusSink>,
}

impl ConnectionBuilder {
    /// Create a new connection builder with default settings
    ///
    /// # Default Settings
    /// - Retry delay: 1 s
    /// - Connect deadline: 5 s
    /// - Security mode: None
    /// - Auto reconnect: enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the endpoint
    ///
    /// # Arguments
    /// * `address` - Host name or IP address of the server
    /// * `port` - TCP port (4840 is the protocol's registered port)
    /// * `endpoint_name` - Logical endpoint name appended to the URL
    pub fn endpoint(mut self, address: &str, port: u16, endpoint_name: &str) -> Self {
        self.endpoint = Some(ConnectionInfo::new(address, port, endpoint_name));
        self
    }

    /// Configure the endpoint from an existing [`ConnectionInfo`]
    pub fn connection_info(mut self, info: ConnectionInfo) -> Self {
        self.endpoint = Some(info);
        self
    }

    /// Replace the whole supervisor configuration
    pub fn config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    /// Back-off between two establishment attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Overall deadline of one connect across all its attempts
    pub fn connect_deadline(mut self, deadline: Duration) -> Self {
        self.config.connect_deadline = deadline;
        self
    }

    pub fn connect_retry_interval(mut self, interval: Duration) -> Self {
        self.config.connect_retry_interval = interval;
        self
    }

    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.config.security_mode = mode;
        self
    }

    /// Restart connection establishment when the session reports a lost
    /// connection
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    pub fn on_connected(mut self, sink: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connected = Some(Arc::new(sink));
        self
    }

    pub fn on_disconnected(mut self, sink: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnected = Some(Arc::new(sink));
        self
    }

    /// Sink receiving every connection status reported by the session
    pub fn on_status(mut self, sink: impl Fn(ConnectionStatus) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Arc::new(sink));
        self
    }

    /// Build the supervisor and start connection establishment
    ///
    /// # Errors
    /// Returns error if:
    /// - The endpoint is not configured
    /// - No tokio runtime is available
    pub fn build(self, factory: Arc<dyn SessionFactory>) -> UaclResult<ConnectionSupervisor> {
        let info = self.endpoint.ok_or_else(|| {
            UaclError::InvalidData("Endpoint must be configured".to_string())
        })?;

        let sinks = EventSinks::new(self.on_connected, self.on_disconnected, self.on_status);
        ConnectionSupervisor::with_sinks(info, factory, self.config, sinks)
    }
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .field("on_connected", &self.on_connected.is_some())
            .field("on_disconnected", &self.on_disconnected.is_some())
            .field("on_status", &self.on_status.is_some())
            .finish()
    }
}
