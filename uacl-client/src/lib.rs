//! UACL client implementation
//!
//! This crate provides the client side of the runtime:
//!
//! - [`ConnectionSupervisor`]: owns one protocol session, keeps it connected
//!   with a background reconnect loop, dispatches connection status changes,
//!   and serializes every session operation
//! - [`RemoteObject`]: typed read/write/invoke/monitor access to one object
//!   of a remote address space, layered on the supervisor
//!
//! The protocol stack itself is reached through the [`UaSession`] and
//! [`SessionFactory`] traits; this crate drives a session but does not
//! implement the wire protocol.
//!
//! # Usage
//!
//! ```rust,no_run
//! use uacl_client::{ConnectionBuilder, RemoteObject, SessionFactory};
//! use std::sync::Arc;
//!
//! # async fn example(factory: Arc<dyn SessionFactory>) -> uacl_core::UaclResult<()> {
//! let supervisor = ConnectionBuilder::new()
//!     .endpoint("192.168.1.100", 4840, "uacl")
//!     .build(factory)?;
//!
//! let pump = RemoteObject::new(supervisor, ["application", "Pump_1"]);
//! pump.write("Speed", 42i32).await;
//! let speed: i32 = pump.read("Speed").await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod remote;

pub use config::{ConnectionInfo, SecurityMode, SupervisorConfig};
pub use connection::{
    ConnectionBuilder, ConnectionSupervisor, DataChangeCallback, SessionFactory, SessionHandle,
    StatusListener, SupervisorState, UaSession,
};
pub use remote::{ReadOutcome, RemoteDataMonitor, RemoteMethod, RemoteObject, RemoteVariable};
