//! The read-query gateway.
//!
//! [`QueryGateway::execute`] is the single entry point: a statement is
//! classified, checked against the complexity heuristic and the caller's rate
//! limit, then dispatched under a statement timeout raced against a wall-clock
//! deadline. Successful results are bounded by the [`shaper`].

pub mod coordinator;
pub mod outcome;
pub mod shaper;

pub use coordinator::QueryGateway;
pub use outcome::{ExecutionOutcome, Rejection};
pub use shaper::{DEFAULT_MAX_ROWS, ResultEnvelope, shape};
