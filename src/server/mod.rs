//! Server state and the stdio request loop.

pub mod state;
pub mod stdio;

pub use state::{ServerState, ServerStateBuilder};
pub use stdio::{LineTransport, Reply, ToolRequest, serve, serve_stdio};
