//! Data types used by the UACL runtime

pub mod mapper;
pub mod variant;

// Re-export types
pub use mapper::{
    map_type_descriptor, to_native_value, to_protocol_value, AsVariant, ByteString, TypeDescriptor,
    UaScalar, UaValue, ValueRank,
};
pub use variant::{Variant, VariantType};
