//! Typed access to objects of a remote address space

pub mod accessors;
pub mod object;

pub use accessors::{ReadOutcome, RemoteDataMonitor, RemoteMethod, RemoteVariable};
pub use object::RemoteObject;
