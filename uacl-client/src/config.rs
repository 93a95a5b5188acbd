//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Target endpoint of a client connection
///
/// Immutable once created: address, port, and the logical endpoint name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionInfo {
    address: String,
    port: u16,
    endpoint_name: String,
}

impl ConnectionInfo {
    pub fn new(address: impl Into<String>, port: u16, endpoint_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            endpoint_name: endpoint_name.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    /// Endpoint URL passed to the protocol stack's connect call
    ///
    /// Format: `opc.tcp://<address>:<port>/<endpoint_name>`; the trailing
    /// segment is omitted for an empty endpoint name.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint_name.is_empty() {
            format!("opc.tcp://{}:{}", self.address, self.port)
        } else {
            format!(
                "opc.tcp://{}:{}/{}",
                self.address, self.port, self.endpoint_name
            )
        }
    }
}

/// Message security requested on connect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityMode {
    #[default]
    None,
    Sign,
    SignAndEncrypt,
}

/// Timing and behaviour of a [`ConnectionSupervisor`](crate::ConnectionSupervisor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Back-off between two iterations of the reconnect loop
    pub retry_delay: Duration,
    /// Overall deadline of one `connect()` across all its attempts
    pub connect_deadline: Duration,
    /// Pause between two protocol connect attempts inside `connect()`
    pub connect_retry_interval: Duration,
    /// Security mode passed to the protocol connect call
    pub security_mode: SecurityMode,
    /// Restart the reconnect loop when the session reports a lost connection
    pub auto_reconnect: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(1),
            connect_deadline: Duration::from_secs(5),
            connect_retry_interval: Duration::from_millis(100),
            security_mode: SecurityMode::None,
            auto_reconnect: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let info = ConnectionInfo::new("10.0.0.5", 4840, "uacl");
        assert_eq!(info.endpoint_url(), "opc.tcp://10.0.0.5:4840/uacl");

        let info = ConnectionInfo::new("localhost", 48010, "");
        assert_eq!(info.endpoint_url(), "opc.tcp://localhost:48010");
    }

    #[test]
    fn test_supervisor_config_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.connect_deadline, Duration::from_secs(5));
        assert_eq!(config.security_mode, SecurityMode::None);
        assert!(config.auto_reconnect);
    }
}
