//! Business object model
//!
//! Types describe themselves once through [`UaObject::describe`]; every
//! registered instance is wrapped in an [`ObjectCapsule`] holding the bound,
//! type-erased members the address-space builder and the dispatch engine
//! work with.

pub mod bound;
pub mod capsule;
pub mod descriptor;

pub use bound::{BoundCollection, BoundMethod, BoundVariable, MethodDispatchRecord};
pub use capsule::ObjectCapsule;
pub use descriptor::{
    Argument, CollectionBinding, MethodBinding, MethodCall, ObjectDescriptor, SessionContext,
    UaObject, VariableBinding,
};
