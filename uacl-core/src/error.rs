use crate::status::StatusCode;
use thiserror::Error;

/// Main error type for UACL operations
///
/// The variants fall into the runtime's error taxonomy:
/// - connectivity: [`UaclError::NotConnected`], [`UaclError::Connection`], [`UaclError::Timeout`]
/// - transient protocol failures: [`UaclError::Protocol`], [`UaclError::BadStatus`],
///   [`UaclError::NodeNotFound`]
/// - mapping defects: [`UaclError::TypeMapping`], [`UaclError::UnsupportedType`]
/// - malformed inbound calls: [`UaclError::InvalidArguments`]
/// - business logic faults: [`UaclError::Business`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UaclError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout")]
    Timeout,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Bad status: {0}")]
    BadStatus(StatusCode),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Type mapping error: expected {expected}, got {found}")]
    TypeMapping {
        expected: String,
        found: String,
    },

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Business logic fault: {0}")]
    Business(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl UaclError {
    /// Build a mapping error from the expected and the offending type names
    pub fn type_mapping(expected: impl Into<String>, found: impl Into<String>) -> Self {
        UaclError::TypeMapping {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// `true` for errors that mean there is no usable session
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            UaclError::NotConnected | UaclError::Connection(_) | UaclError::Timeout
        )
    }
}

impl From<&UaclError> for StatusCode {
    fn from(err: &UaclError) -> Self {
        match err {
            UaclError::NotConnected | UaclError::Connection(_) => StatusCode::BAD_NOT_CONNECTED,
            UaclError::Timeout => StatusCode::BAD_TIMEOUT,
            UaclError::BadStatus(code) => *code,
            UaclError::NodeNotFound(_) => StatusCode::BAD_NODE_ID_UNKNOWN,
            UaclError::TypeMapping { .. } | UaclError::UnsupportedType(_) => {
                StatusCode::BAD_TYPE_MISMATCH
            }
            UaclError::InvalidArguments(_) => StatusCode::BAD_INVALID_ARGUMENT,
            UaclError::Protocol(_) | UaclError::Business(_) | UaclError::InvalidData(_) => {
                StatusCode::BAD_UNEXPECTED_ERROR
            }
        }
    }
}

/// Result type alias for UACL operations
pub type UaclResult<T> = Result<T, UaclError>;
