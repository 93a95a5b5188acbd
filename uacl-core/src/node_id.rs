use crate::error::{UaclError, UaclResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier part of a [`NodeId`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Numeric(u32),
    String(String),
}

/// Address-space identifier of a node
///
/// A node id is a namespace index plus an identifier. The textual form is
/// `ns=<index>;i=<number>` or `ns=<index>;s=<string>`; the `ns=0;` prefix may
/// be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    namespace: u16,
    identifier: Identifier,
}

impl NodeId {
    /// Create a numeric node id
    pub const fn numeric(namespace: u16, value: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(value),
        }
    }

    /// Create a string node id
    pub fn string(namespace: u16, value: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(value.into()),
        }
    }

    /// The null node id (`ns=0;i=0`)
    pub const fn null() -> Self {
        Self::numeric(0, 0)
    }

    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }

    pub fn namespace(&self) -> u16 {
        self.namespace
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Parse a node id from its textual form
    ///
    /// Supports formats like:
    /// - "ns=2;s=Pump_1.Speed"
    /// - "ns=0;i=85"
    /// - "i=85"
    ///
    /// # Returns
    ///
    /// Returns `Ok(NodeId)` if parsing succeeds, `Err(UaclError)` otherwise
    pub fn from_string(s: &str) -> UaclResult<Self> {
        let (namespace, rest) = match s.strip_prefix("ns=") {
            Some(tail) => {
                let (ns, rest) = tail.split_once(';').ok_or_else(|| {
                    UaclError::InvalidData(format!("Invalid node id format: {}", s))
                })?;
                let ns = ns
                    .parse::<u16>()
                    .map_err(|_| UaclError::InvalidData(format!("Invalid namespace index: {}", ns)))?;
                (ns, rest)
            }
            None => (0, s),
        };

        if let Some(value) = rest.strip_prefix("i=") {
            let value = value
                .parse::<u32>()
                .map_err(|_| UaclError::InvalidData(format!("Invalid numeric identifier: {}", value)))?;
            return Ok(Self::numeric(namespace, value));
        }
        if let Some(value) = rest.strip_prefix("s=") {
            return Ok(Self::string(namespace, value));
        }

        Err(UaclError::InvalidData(format!("Invalid node id format: {}", s)))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Identifier::Numeric(v) => write!(f, "ns={};i={}", self.namespace, v),
            Identifier::String(v) => write!(f, "ns={};s={}", self.namespace, v),
        }
    }
}

/// Well-known node ids of namespace 0
pub mod ids {
    use super::NodeId;

    pub const OBJECTS_FOLDER: NodeId = NodeId::numeric(0, 85);

    // reference types
    pub const ORGANIZES: NodeId = NodeId::numeric(0, 35);
    pub const HAS_COMPONENT: NodeId = NodeId::numeric(0, 47);
    pub const HAS_PROPERTY: NodeId = NodeId::numeric(0, 46);

    // type definitions
    pub const BASE_OBJECT_TYPE: NodeId = NodeId::numeric(0, 58);
    pub const FOLDER_TYPE: NodeId = NodeId::numeric(0, 61);
    pub const BASE_DATA_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 63);
    pub const PROPERTY_TYPE: NodeId = NodeId::numeric(0, 68);

    // data types
    pub const BOOLEAN: NodeId = NodeId::numeric(0, 1);
    pub const SBYTE: NodeId = NodeId::numeric(0, 2);
    pub const BYTE: NodeId = NodeId::numeric(0, 3);
    pub const INT16: NodeId = NodeId::numeric(0, 4);
    pub const UINT16: NodeId = NodeId::numeric(0, 5);
    pub const INT32: NodeId = NodeId::numeric(0, 6);
    pub const UINT32: NodeId = NodeId::numeric(0, 7);
    pub const INT64: NodeId = NodeId::numeric(0, 8);
    pub const UINT64: NodeId = NodeId::numeric(0, 9);
    pub const FLOAT: NodeId = NodeId::numeric(0, 10);
    pub const DOUBLE: NodeId = NodeId::numeric(0, 11);
    pub const STRING: NodeId = NodeId::numeric(0, 12);
    pub const BYTE_STRING: NodeId = NodeId::numeric(0, 15);
    pub const BASE_DATA_TYPE: NodeId = NodeId::numeric(0, 24);
}
