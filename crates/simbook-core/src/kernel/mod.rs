//! Notebook kernel front-end.
//!
//! Runs on the kernel loop thread. Cells are parsed here and executed on the
//! host through the bridge.
//!
//! # Module Structure
//!
//! - `connection` - Jupyter connection file parsing
//! - `protocol` - request and reply messages
//! - `server` - TCP listener and per-connection handling
//! - `session` - execution counter and request dispatch

pub mod connection;
pub mod protocol;
pub mod server;
pub mod session;

pub use connection::ConnectionInfo;
pub use protocol::{ExecuteOutcome, KernelReply, KernelRequest, ReplyStatus};
pub use server::{serve, serve_listener};
pub use session::{Control, KernelSession};
