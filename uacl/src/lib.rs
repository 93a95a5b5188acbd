//! UACL - client/server runtime for an OPC UA style address space
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `uacl-core`: Variants, node ids, status codes, type/value mapping and errors
//! - `uacl-client`: Connection supervisor and typed remote accessors
//! - `uacl-server`: Address-space construction and request dispatch
//!
//! This crate re-exports all of them and adds [`loopback`], an in-process
//! transport connecting a client supervisor directly to a [`server::UaServer`].
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use uacl::client::{ConnectionBuilder, RemoteObject};
//! use uacl::loopback::LoopbackFactory;
//! use uacl::server::UaServer;
//!
//! # async fn example() -> uacl::UaclResult<()> {
//! let server = Arc::new(UaServer::default());
//! server.startup()?;
//!
//! let supervisor = ConnectionBuilder::new()
//!     .endpoint("localhost", 4840, "uacl")
//!     .build(Arc::new(LoopbackFactory::new(Arc::clone(&server))))?;
//!
//! let pump = RemoteObject::new(supervisor, ["application", "Pump_1"]);
//! let speed: i32 = pump.read("Speed").await;
//! # Ok(())
//! # }
//! ```

pub mod loopback;

// Re-export core types
pub use uacl_core::datatypes::*;
pub use uacl_core::{ConnectionStatus, NodeId, StatusCode, UaclError, UaclResult};

// Re-export client API
pub mod client {
    pub use uacl_client::*;
}

// Re-export server API
pub mod server {
    pub use uacl_server::*;
}
