//! Per-request execution outcomes.

use crate::error::DatabaseError;
use crate::gateway::shaper::ResultEnvelope;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a statement never reached the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Failed classification. The caller must rewrite the statement.
    ReadOnlyViolation { detail: String },
    /// Flagged by the complexity heuristic. Retrying a simpler statement is fine.
    TooComplex { reason: String },
    /// Caller exhausted its window. Recoverable by waiting.
    RateLimited,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnlyViolation { .. } => f.write_str("only read statements permitted"),
            Self::TooComplex { reason } => write!(
                f,
                "Query complexity warning: {}. Please optimize your query or contact an administrator.",
                reason
            ),
            Self::RateLimited => f.write_str("rate limit exceeded"),
        }
    }
}

/// Exactly one of these is produced per request.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Rejected(Rejection),
    /// The wall-clock deadline fired before the statement finished.
    TimedOut(Duration),
    /// The connection source reported an error; the message is passed through.
    Failed(String),
    Succeeded(ResultEnvelope),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rejected(Rejection::ReadOnlyViolation { .. }) => "rejected_read_only",
            Self::Rejected(Rejection::TooComplex { .. }) => "rejected_complex",
            Self::Rejected(Rejection::RateLimited) => "rejected_rate_limit",
            Self::TimedOut(_) => "timed_out",
            Self::Failed(_) => "failed",
            Self::Succeeded(_) => "succeeded",
        }
    }

    /// The envelope on success, otherwise a human-readable message.
    pub fn into_response(self) -> Result<ResultEnvelope, String> {
        match self {
            Self::Succeeded(envelope) => Ok(envelope),
            Self::Rejected(rejection) => Err(rejection.to_string()),
            Self::TimedOut(after) => Err(format!(
                "Error executing query: {}",
                DatabaseError::Timeout(after)
            )),
            Self::Failed(message) => Err(format!("Error executing query: {}", message)),
        }
    }
}
