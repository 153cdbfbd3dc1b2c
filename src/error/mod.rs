//! Error types for the query gateway.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.
//! Gateway rejections (read-only violations, complexity warnings, rate limits)
//! are not errors; they are reported through
//! [`ExecutionOutcome`](crate::gateway::ExecutionOutcome).

use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the connection source.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Could not acquire a pooled connection: {0}")]
    AcquireFailed(String),

    #[error("{0}")]
    QueryFailed(String),

    #[error("Query cancelled")]
    Cancelled,

    #[error("Query timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

/// Tool execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Result type alias for GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;
