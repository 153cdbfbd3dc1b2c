//! Read-only PostgreSQL query gateway with schema exploration tools.
//!
//! Caller-supplied statements pass through a lexical read-only classifier, a
//! complexity heuristic and a per-caller rate limiter before they reach the
//! database. Execution is bounded by a server-side statement timeout and a
//! wall-clock deadline, and results are capped in size.
//!
//! # Example
//!
//! ```no_run
//! use pg_query_gateway::{
//!     config::ServerConfig,
//!     database::create_source,
//!     server::{ServerStateBuilder, serve_stdio},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let source = create_source(&config.database).await?;
//!
//!     let state = Arc::new(
//!         ServerStateBuilder::new()
//!             .config(config)
//!             .source(source)
//!             .build()?,
//!     );
//!
//!     serve_stdio(Arc::clone(&state)).await?;
//!     state.shutdown();
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod security;
pub mod server;
pub mod tools;

pub use catalog::Catalog;
pub use config::{DatabaseConfig, DatabaseConfigBuilder, GatewayConfig, ServerConfig};
pub use database::{Connection, ConnectionSource, PgConnectionSource, create_source};
pub use error::{GatewayError, Result};
pub use gateway::{ExecutionOutcome, QueryGateway, Rejection, ResultEnvelope};
pub use security::{Classification, RateLimiter, assess_complexity, classify};
pub use server::{ServerState, ServerStateBuilder};
