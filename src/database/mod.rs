//! Database access layer.
//!
//! The gateway and the catalog talk to PostgreSQL only through the
//! [`ConnectionSource`] and [`Connection`] traits; [`PgConnectionSource`] is the
//! production implementation backed by `deadpool-postgres`.

pub mod pool;
pub mod postgres;
pub mod result;
#[cfg(test)]
pub(crate) mod testing;
pub mod tls;
pub mod traits;

pub use pool::{ConnectionGuard, PoolConfig, PoolMetrics, PoolMetricsSnapshot};
pub use postgres::PgConnectionSource;
pub use result::*;
pub use tls::PgTls;
pub use traits::{Connection, ConnectionSource, PoolStatus};

use crate::config::DatabaseConfig;
use crate::error::DbResult;
use std::sync::Arc;

/// Create the PostgreSQL connection source for `config`.
pub async fn create_source(config: &DatabaseConfig) -> DbResult<Arc<dyn ConnectionSource>> {
    let source = PgConnectionSource::new(config).await?;
    Ok(Arc::new(source))
}
