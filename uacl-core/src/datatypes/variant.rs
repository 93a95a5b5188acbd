//! Variant value type for the UACL runtime

use crate::error::{UaclError, UaclResult};
use crate::node_id::{ids, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Container holding a value of the protocol's native type system
///
/// Stores scalars, strings, byte strings, and one-dimensional arrays of
/// scalars. Arrays carry their element type so an empty array is still typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    /// No value
    Empty,
    /// Boolean value
    Boolean(bool),
    /// Signed integer 8-bit
    SByte(i8),
    /// Unsigned integer 8-bit
    Byte(u8),
    /// Signed integer 16-bit
    Int16(i16),
    /// Unsigned integer 16-bit
    UInt16(u16),
    /// Signed integer 32-bit
    Int32(i32),
    /// Unsigned integer 32-bit
    UInt32(u32),
    /// Signed integer 64-bit
    Int64(i64),
    /// Unsigned integer 64-bit
    UInt64(u64),
    /// Float 32-bit
    Float(f32),
    /// Float 64-bit
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Opaque byte string
    ByteString(Vec<u8>),
    /// One-dimensional array of scalars of the given element type
    Array(VariantType, Vec<Variant>),
}

/// Type enumeration for [`Variant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantType {
    Empty,
    Boolean,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
    ByteString,
}

impl VariantType {
    /// Check if this type is a number type
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            VariantType::SByte
                | VariantType::Byte
                | VariantType::Int16
                | VariantType::UInt16
                | VariantType::Int32
                | VariantType::UInt32
                | VariantType::Int64
                | VariantType::UInt64
                | VariantType::Float
                | VariantType::Double
        )
    }

    /// Data type node id in namespace 0
    ///
    /// `Empty` maps to `BaseDataType`, the abstract root of all data types.
    pub fn data_type_id(&self) -> NodeId {
        match self {
            VariantType::Empty => ids::BASE_DATA_TYPE,
            VariantType::Boolean => ids::BOOLEAN,
            VariantType::SByte => ids::SBYTE,
            VariantType::Byte => ids::BYTE,
            VariantType::Int16 => ids::INT16,
            VariantType::UInt16 => ids::UINT16,
            VariantType::Int32 => ids::INT32,
            VariantType::UInt32 => ids::UINT32,
            VariantType::Int64 => ids::INT64,
            VariantType::UInt64 => ids::UINT64,
            VariantType::Float => ids::FLOAT,
            VariantType::Double => ids::DOUBLE,
            VariantType::String => ids::STRING,
            VariantType::ByteString => ids::BYTE_STRING,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VariantType::Empty => "Empty",
            VariantType::Boolean => "Boolean",
            VariantType::SByte => "SByte",
            VariantType::Byte => "Byte",
            VariantType::Int16 => "Int16",
            VariantType::UInt16 => "UInt16",
            VariantType::Int32 => "Int32",
            VariantType::UInt32 => "UInt32",
            VariantType::Int64 => "Int64",
            VariantType::UInt64 => "UInt64",
            VariantType::Float => "Float",
            VariantType::Double => "Double",
            VariantType::String => "String",
            VariantType::ByteString => "ByteString",
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Variant {
    /// Get the scalar type of this Variant (the element type for arrays)
    pub fn get_type(&self) -> VariantType {
        match self {
            Variant::Empty => VariantType::Empty,
            Variant::Boolean(_) => VariantType::Boolean,
            Variant::SByte(_) => VariantType::SByte,
            Variant::Byte(_) => VariantType::Byte,
            Variant::Int16(_) => VariantType::Int16,
            Variant::UInt16(_) => VariantType::UInt16,
            Variant::Int32(_) => VariantType::Int32,
            Variant::UInt32(_) => VariantType::UInt32,
            Variant::Int64(_) => VariantType::Int64,
            Variant::UInt64(_) => VariantType::UInt64,
            Variant::Float(_) => VariantType::Float,
            Variant::Double(_) => VariantType::Double,
            Variant::String(_) => VariantType::String,
            Variant::ByteString(_) => VariantType::ByteString,
            Variant::Array(element_type, _) => *element_type,
        }
    }

    /// Human readable type name, `[]` suffixed for arrays
    pub fn type_name(&self) -> String {
        if self.is_array() {
            format!("{}[]", self.get_type())
        } else {
            self.get_type().to_string()
        }
    }

    /// Constructs an array
    ///
    /// # Errors
    ///
    /// Returns an error if an element is itself an array or does not have the
    /// declared element type
    pub fn new_array(element_type: VariantType, array: Vec<Variant>) -> UaclResult<Self> {
        for (index, sub) in array.iter().enumerate() {
            if sub.is_array() {
                return Err(UaclError::UnsupportedType(format!(
                    "nested array at index {}",
                    index
                )));
            }
            if sub.get_type() != element_type {
                return Err(UaclError::type_mapping(
                    element_type.name(),
                    format!("{} at index {}", sub.get_type(), index),
                ));
            }
        }
        Ok(Variant::Array(element_type, array))
    }

    /// Check if this Variant holds no value
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Check if this Variant is a scalar number
    pub fn is_number(&self) -> bool {
        !self.is_array() && self.get_type().is_number()
    }

    /// Check if this Variant is an array
    pub fn is_array(&self) -> bool {
        matches!(self, Variant::Array(..))
    }

    /// Get the value as a boolean
    pub fn as_bool(&self) -> UaclResult<bool> {
        match self {
            Variant::Boolean(b) => Ok(*b),
            _ => Err(UaclError::type_mapping("Boolean", self.type_name())),
        }
    }

    /// Get the value as a string slice
    pub fn as_str(&self) -> UaclResult<&str> {
        match self {
            Variant::String(s) => Ok(s),
            _ => Err(UaclError::type_mapping("String", self.type_name())),
        }
    }

    /// Get the elements of an array
    pub fn as_array(&self) -> UaclResult<&[Variant]> {
        match self {
            Variant::Array(_, items) => Ok(items),
            _ => Err(UaclError::type_mapping("Array", self.type_name())),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "EMPTY"),
            Variant::Boolean(b) => write!(f, "BOOLEAN: {}", b),
            Variant::SByte(i) => write!(f, "SBYTE: {}", i),
            Variant::Byte(u) => write!(f, "BYTE: {}", u),
            Variant::Int16(i) => write!(f, "INT16: {}", i),
            Variant::UInt16(u) => write!(f, "UINT16: {}", u),
            Variant::Int32(i) => write!(f, "INT32: {}", i),
            Variant::UInt32(u) => write!(f, "UINT32: {}", u),
            Variant::Int64(i) => write!(f, "INT64: {}", i),
            Variant::UInt64(u) => write!(f, "UINT64: {}", u),
            Variant::Float(fl) => write!(f, "FLOAT: {}", fl),
            Variant::Double(fl) => write!(f, "DOUBLE: {}", fl),
            Variant::String(s) => write!(f, "STRING: {}", s),
            Variant::ByteString(s) => {
                write!(f, "BYTE_STRING: ")?;
                for byte in s {
                    write!(f, "{:02X} ", byte)?;
                }
                Ok(())
            }
            Variant::Array(element_type, arr) => {
                write!(f, "ARRAY<{}>: {} element(s)", element_type, arr.len())?;
                for (i, elem) in arr.iter().enumerate() {
                    write!(f, "\n  [{}]: {}", i, elem)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_empty() {
        let v = Variant::Empty;
        assert!(v.is_empty());
        assert_eq!(v.get_type(), VariantType::Empty);
        assert_eq!(v.get_type().data_type_id(), ids::BASE_DATA_TYPE);
    }

    #[test]
    fn test_variant_array() {
        let arr = vec![Variant::Int32(1), Variant::Int32(2), Variant::Int32(3)];
        let v = Variant::new_array(VariantType::Int32, arr).unwrap();
        assert!(v.is_array());
        assert!(!v.is_number());
        assert_eq!(v.as_array().unwrap().len(), 3);
        assert_eq!(v.type_name(), "Int32[]");
    }

    #[test]
    fn test_variant_array_mixed_types() {
        let arr = vec![Variant::Int32(1), Variant::Boolean(true)];
        let err = Variant::new_array(VariantType::Int32, arr).unwrap_err();
        assert_eq!(err, UaclError::type_mapping("Int32", "Boolean at index 1"));
    }

    #[test]
    fn test_variant_nested_array_rejected() {
        let inner = Variant::Array(VariantType::Byte, vec![Variant::Byte(1)]);
        assert!(matches!(
            Variant::new_array(VariantType::Byte, vec![inner]),
            Err(UaclError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_variant_accessors() {
        assert!(Variant::Boolean(true).as_bool().unwrap());
        assert_eq!(Variant::String("abc".into()).as_str().unwrap(), "abc");
        assert!(Variant::Double(1.5).as_bool().is_err());
    }
}
