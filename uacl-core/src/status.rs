//! Protocol status vocabulary
//!
//! [`StatusCode`] carries the result of a single service operation, while
//! [`ConnectionStatus`] describes the health of a client session as reported
//! by the protocol stack.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service result code
///
/// The top two bits encode severity (00 good, 01 uncertain, 10 bad), the
/// remaining bits the specific condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    pub const BAD: StatusCode = StatusCode(0x8000_0000);
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);
    pub const BAD_TIMEOUT: StatusCode = StatusCode(0x800A_0000);
    pub const BAD_SHUTDOWN: StatusCode = StatusCode(0x800C_0000);
    pub const BAD_SERVER_NOT_CONNECTED: StatusCode = StatusCode(0x800D_0000);
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    pub const BAD_ATTRIBUTE_ID_INVALID: StatusCode = StatusCode(0x8035_0000);
    pub const BAD_NOT_READABLE: StatusCode = StatusCode(0x803A_0000);
    pub const BAD_NOT_WRITABLE: StatusCode = StatusCode(0x803B_0000);
    pub const BAD_TYPE_MISMATCH: StatusCode = StatusCode(0x8074_0000);
    pub const BAD_METHOD_INVALID: StatusCode = StatusCode(0x8075_0000);
    pub const BAD_ARGUMENTS_MISSING: StatusCode = StatusCode(0x8076_0000);
    pub const BAD_NOT_CONNECTED: StatusCode = StatusCode(0x808A_0000);
    pub const BAD_INVALID_ARGUMENT: StatusCode = StatusCode(0x80AB_0000);
    pub const BAD_TOO_MANY_ARGUMENTS: StatusCode = StatusCode(0x80E5_0000);

    pub fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    pub fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Symbolic name for the codes this crate knows about
    pub fn name(&self) -> &'static str {
        match *self {
            StatusCode::GOOD => "Good",
            StatusCode::BAD => "Bad",
            StatusCode::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            StatusCode::BAD_TIMEOUT => "BadTimeout",
            StatusCode::BAD_SHUTDOWN => "BadShutdown",
            StatusCode::BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            StatusCode::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            StatusCode::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            StatusCode::BAD_NOT_READABLE => "BadNotReadable",
            StatusCode::BAD_NOT_WRITABLE => "BadNotWritable",
            StatusCode::BAD_TYPE_MISMATCH => "BadTypeMismatch",
            StatusCode::BAD_METHOD_INVALID => "BadMethodInvalid",
            StatusCode::BAD_ARGUMENTS_MISSING => "BadArgumentsMissing",
            StatusCode::BAD_NOT_CONNECTED => "BadNotConnected",
            StatusCode::BAD_INVALID_ARGUMENT => "BadInvalidArgument",
            StatusCode::BAD_TOO_MANY_ARGUMENTS => "BadTooManyArguments",
            _ if self.is_good() => "Good",
            _ if self.is_bad() => "Bad",
            _ => "Uncertain",
        }
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::GOOD
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

/// Session health as reported by the protocol stack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Session is being established
    Connecting,
    /// Session is established and usable
    Connected,
    /// Session was lost and the stack asks for a reconnect
    ConnectionErrorClientReconnect,
    /// Keep-alive watchdog missed a beat, the session may still recover
    ConnectionWarningWatchdogTimeout,
    /// Session is gone
    #[default]
    Disconnected,
    /// Server rejected the session because of licensing
    LicenseExpired,
    /// Server shut down
    ServerShutdown,
    /// Server announced a shutdown
    ServerShutdownInProgress,
    /// The stack transparently recreated the session after a reconnect
    SessionAutomaticallyRecreated,
}

/// Coarse classification used by connection status dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    /// The session is unusable
    Lost,
    /// The session is usable
    Live,
    /// Anything in between, ignored by the dispatcher
    Transient,
}

impl ConnectionStatus {
    pub fn bucket(&self) -> StatusBucket {
        match self {
            ConnectionStatus::ConnectionErrorClientReconnect
            | ConnectionStatus::Disconnected
            | ConnectionStatus::LicenseExpired
            | ConnectionStatus::ServerShutdown
            | ConnectionStatus::ServerShutdownInProgress => StatusBucket::Lost,
            ConnectionStatus::Connected | ConnectionStatus::SessionAutomaticallyRecreated => {
                StatusBucket::Live
            }
            ConnectionStatus::Connecting | ConnectionStatus::ConnectionWarningWatchdogTimeout => {
                StatusBucket::Transient
            }
        }
    }
}
