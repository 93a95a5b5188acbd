//! Connection management module
//!
//! A [`ConnectionSupervisor`] owns exactly one protocol session and keeps it
//! connected. Sessions are produced by a [`SessionFactory`] and driven through
//! the [`UaSession`] trait, the narrow seam towards the protocol stack.

pub mod builder;
pub mod session;
pub mod state;
pub mod supervisor;

pub use builder::ConnectionBuilder;
pub use session::{DataChangeCallback, SessionFactory, SessionHandle, StatusListener, UaSession};
pub use state::SupervisorState;
pub use supervisor::ConnectionSupervisor;
