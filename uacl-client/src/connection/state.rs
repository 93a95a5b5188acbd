//! Connection supervisor state machine

use uacl_core::{UaclError, UaclResult};

/// Lifecycle state of a [`ConnectionSupervisor`](super::ConnectionSupervisor)
///
/// # State Transitions
/// ```text
/// Uninitialized -> Connecting   (establishment loop started)
/// Connecting    -> Connected    (protocol connect succeeded)
/// Connecting    -> Failed       (connect deadline elapsed)
/// Connecting    -> Disconnected (connection lost while connecting)
/// Connected     -> Disconnected (explicit disconnect or connection lost)
/// Disconnected  -> Connecting   (establishment loop restarted)
/// Disconnected  -> Connected    (session recreated by the stack)
/// Failed        -> Connecting   (next loop iteration)
/// Failed        -> Disconnected
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// No establishment attempt has been made yet
    #[default]
    Uninitialized,
    /// The establishment loop is creating a handle or connecting it
    Connecting,
    /// The session reports a live connection
    Connected,
    /// Explicitly disconnected, or the connection was lost
    Disconnected,
    /// The last connect ran into its deadline
    Failed,
}

impl SupervisorState {
    /// Check if the supervisor considers its session usable
    pub fn is_connected(&self) -> bool {
        matches!(self, SupervisorState::Connected)
    }

    /// Validate state transition
    ///
    /// Self-transitions are accepted so that repeated notifications of the
    /// same status are idempotent.
    pub fn validate_transition(&self, new_state: SupervisorState) -> UaclResult<()> {
        use SupervisorState::*;

        let valid = match (*self, new_state) {
            (Uninitialized, Connecting) => true,
            (Connecting, Connected) => true,
            (Connecting, Failed) => true,
            (Connecting, Disconnected) => true,
            (Connected, Disconnected) => true,
            (Disconnected, Connecting) => true,
            (Disconnected, Connected) => true,
            (Failed, Connecting) => true,
            // A session may come up after the connect deadline expired
            (Failed, Connected) => true,
            (Failed, Disconnected) => true,
            (a, b) if a == b => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(UaclError::InvalidData(format!(
                "Invalid supervisor state transition: {} -> {}",
                self.as_str(),
                new_state.as_str()
            )))
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Uninitialized => "Uninitialized",
            SupervisorState::Connecting => "Connecting",
            SupervisorState::Connected => "Connected",
            SupervisorState::Disconnected => "Disconnected",
            SupervisorState::Failed => "Failed",
        }
    }
}
