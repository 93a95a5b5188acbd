//! Core types and utilities for the UACL runtime
//!
//! This crate provides the fundamental types shared by the client and the
//! server side:
//!
//! - [`Variant`]: the protocol-native tagged value
//! - [`UaValue`]: the bidirectional native <-> variant mapper
//! - [`NodeId`]: address-space identifiers and well-known ids
//! - [`StatusCode`] / [`ConnectionStatus`]: protocol status vocabulary
//! - [`UaclError`]: the error taxonomy used across the workspace

pub mod datatypes;
pub mod error;
pub mod node_id;
pub mod status;

pub use datatypes::{
    map_type_descriptor, to_native_value, to_protocol_value, AsVariant, ByteString,
    TypeDescriptor, UaScalar, UaValue, ValueRank, Variant, VariantType,
};
pub use error::{UaclError, UaclResult};
pub use node_id::{Identifier, NodeId};
pub use status::{ConnectionStatus, StatusBucket, StatusCode};
