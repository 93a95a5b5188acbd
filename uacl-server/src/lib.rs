//! UACL server
//!
//! Exposes business objects as a navigable address space and routes remote
//! reads, writes and method calls back into the live objects.
//!
//! - [`model`]: declarative description of business object types
//! - [`address_space`]: in-memory node storage
//! - [`builder`]: materialization of registered objects into nodes
//! - [`dispatch`]: request routing into object members
//! - [`context`]: per-session contexts for session-aware methods
//! - [`server`]: lifecycle tying the pieces together

pub mod address_space;
pub mod builder;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod model;
pub mod server;

pub use address_space::{
    AddressSpace, AttributeId, DataValue, Node, NodeClass, NodeKind, NodeSettings, NodeUserData,
    ValueObserver,
};
pub use builder::AddressSpaceBuilder;
pub use config::ServerConfig;
pub use context::{SessionContexts, SessionId};
pub use dispatch::{CallMethodResult, DispatchEngine};
pub use model::{
    Argument, MethodBinding, MethodCall, ObjectCapsule, ObjectDescriptor, SessionContext, UaObject,
};
pub use server::{ServerState, UaServer};
