//! Bidirectional mapping between native Rust values and [`Variant`]s
//!
//! Every type that crosses the native/protocol boundary implements
//! [`UaValue`]. Scalars map one-to-one to a variant type, `Vec<T>` of a
//! scalar maps to a one-dimensional array, `Option<T>` maps `None` to
//! [`Variant::Empty`], and `()` stands for "no value".
//!
//! Conversions are exact: a variant is only accepted when its type is the one
//! the native type maps to, so every supported value round-trips without
//! precision loss. Anything else is a [`UaclError::TypeMapping`] naming both
//! types.

use crate::datatypes::variant::{Variant, VariantType};
use crate::error::{UaclError, UaclResult};
use crate::node_id::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of dimensions of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueRank {
    Scalar,
    OneDimension,
}

impl ValueRank {
    /// Protocol encoding of the rank (-1 scalar, 1 one dimension)
    pub fn as_i32(&self) -> i32 {
        match self {
            ValueRank::Scalar => -1,
            ValueRank::OneDimension => 1,
        }
    }
}

/// Protocol-side description of a native type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub data_type: VariantType,
    pub value_rank: ValueRank,
}

impl TypeDescriptor {
    pub const fn scalar(data_type: VariantType) -> Self {
        Self {
            data_type,
            value_rank: ValueRank::Scalar,
        }
    }

    pub const fn array(data_type: VariantType) -> Self {
        Self {
            data_type,
            value_rank: ValueRank::OneDimension,
        }
    }

    pub fn is_array(&self) -> bool {
        self.value_rank == ValueRank::OneDimension
    }

    pub fn data_type_id(&self) -> NodeId {
        self.data_type.data_type_id()
    }

    /// Check whether a variant can be stored under this descriptor
    ///
    /// `Empty` is always accepted (a node without a value yet); a scalar
    /// descriptor of type `Empty` accepts any scalar.
    pub fn accepts(&self, value: &Variant) -> bool {
        if value.is_empty() {
            return true;
        }
        match self.value_rank {
            ValueRank::Scalar => {
                !value.is_array()
                    && (self.data_type == VariantType::Empty || value.get_type() == self.data_type)
            }
            ValueRank::OneDimension => value.is_array() && value.get_type() == self.data_type,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value_rank {
            ValueRank::Scalar => write!(f, "{}", self.data_type),
            ValueRank::OneDimension => write!(f, "{}[]", self.data_type),
        }
    }
}

/// A native value that can be exchanged with the protocol
pub trait UaValue: Sized {
    /// Protocol type this native type maps to
    fn type_descriptor() -> TypeDescriptor;

    /// Convert to a protocol variant
    fn to_variant(&self) -> Variant;

    /// Convert from a protocol variant
    ///
    /// # Errors
    ///
    /// Returns [`UaclError::TypeMapping`] if the variant does not hold this type
    fn from_variant(value: &Variant) -> UaclResult<Self>;
}

/// Marker for the scalar types that may appear as array elements
pub trait UaScalar: UaValue {}

macro_rules! scalar_value {
    ($native:ty, $variant:ident) => {
        impl UaValue for $native {
            fn type_descriptor() -> TypeDescriptor {
                TypeDescriptor::scalar(VariantType::$variant)
            }

            fn to_variant(&self) -> Variant {
                Variant::$variant(self.clone())
            }

            fn from_variant(value: &Variant) -> UaclResult<Self> {
                match value {
                    Variant::$variant(v) => Ok(v.clone()),
                    other => Err(UaclError::type_mapping(
                        VariantType::$variant.name(),
                        other.type_name(),
                    )),
                }
            }
        }

        impl UaScalar for $native {}
    };
}

scalar_value!(bool, Boolean);
scalar_value!(i8, SByte);
scalar_value!(u8, Byte);
scalar_value!(i16, Int16);
scalar_value!(u16, UInt16);
scalar_value!(i32, Int32);
scalar_value!(u32, UInt32);
scalar_value!(i64, Int64);
scalar_value!(u64, UInt64);
scalar_value!(f32, Float);
scalar_value!(f64, Double);
scalar_value!(String, String);

/// Opaque byte string, distinct from an array of bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteString(pub Vec<u8>);

impl UaValue for ByteString {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::scalar(VariantType::ByteString)
    }

    fn to_variant(&self) -> Variant {
        Variant::ByteString(self.0.clone())
    }

    fn from_variant(value: &Variant) -> UaclResult<Self> {
        match value {
            Variant::ByteString(v) => Ok(ByteString(v.clone())),
            other => Err(UaclError::type_mapping("ByteString", other.type_name())),
        }
    }
}

impl UaScalar for ByteString {}

impl<T: UaScalar> UaValue for Vec<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::array(T::type_descriptor().data_type)
    }

    fn to_variant(&self) -> Variant {
        Variant::Array(
            T::type_descriptor().data_type,
            self.iter().map(UaValue::to_variant).collect(),
        )
    }

    fn from_variant(value: &Variant) -> UaclResult<Self> {
        let expected = Self::type_descriptor();
        match value {
            Variant::Array(element_type, items) if *element_type == expected.data_type => {
                items.iter().map(T::from_variant).collect()
            }
            other => Err(UaclError::type_mapping(
                expected.to_string(),
                other.type_name(),
            )),
        }
    }
}

impl<T: UaValue> UaValue for Option<T> {
    fn type_descriptor() -> TypeDescriptor {
        T::type_descriptor()
    }

    fn to_variant(&self) -> Variant {
        match self {
            Some(v) => v.to_variant(),
            None => Variant::Empty,
        }
    }

    fn from_variant(value: &Variant) -> UaclResult<Self> {
        match value {
            Variant::Empty => Ok(None),
            other => T::from_variant(other).map(Some),
        }
    }
}

/// "No value": used as the return type of void methods
///
/// Any variant converts to `()`, the value is discarded.
impl UaValue for () {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::scalar(VariantType::Empty)
    }

    fn to_variant(&self) -> Variant {
        Variant::Empty
    }

    fn from_variant(_value: &Variant) -> UaclResult<Self> {
        Ok(())
    }
}

impl UaValue for Variant {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::scalar(VariantType::Empty)
    }

    fn to_variant(&self) -> Variant {
        self.clone()
    }

    fn from_variant(value: &Variant) -> UaclResult<Self> {
        Ok(value.clone())
    }
}

/// Object-safe view of [`UaValue::to_variant`]
///
/// Lets heterogeneous argument lists (`&[&dyn AsVariant]`) go through the
/// mapper one element at a time.
pub trait AsVariant {
    fn as_variant(&self) -> Variant;
}

impl<T: UaValue> AsVariant for T {
    fn as_variant(&self) -> Variant {
        self.to_variant()
    }
}

/// Convert a native value to its protocol variant
pub fn to_protocol_value<T: UaValue>(value: &T) -> Variant {
    value.to_variant()
}

/// Convert a protocol variant to a native value
pub fn to_native_value<T: UaValue>(value: &Variant) -> UaclResult<T> {
    T::from_variant(value)
}

/// Protocol type descriptor of a native type
pub fn map_type_descriptor<T: UaValue>() -> TypeDescriptor {
    T::type_descriptor()
}
