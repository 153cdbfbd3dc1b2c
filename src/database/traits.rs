//! Connection source traits.

use crate::database::pool::PoolMetricsSnapshot;
use crate::database::result::RawQueryResult;
use crate::error::DbResult;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A pool of database connections.
///
/// Implementations: [`PgConnectionSource`](crate::database::PgConnectionSource).
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Check out a connection, suspending until one is available.
    ///
    /// The connection returns to the pool when the box is dropped, which
    /// makes release happen exactly once on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::AcquireFailed`](crate::error::DatabaseError::AcquireFailed)
    /// if the pool is exhausted past its wait timeout or cannot connect.
    async fn acquire(&self) -> DbResult<Box<dyn Connection>>;

    /// Current pool occupancy.
    fn status(&self) -> PoolStatus;

    /// Lifetime counters for the pool.
    fn metrics(&self) -> PoolMetricsSnapshot;

    /// Close the pool. Idle connections are dropped; checked-out ones are
    /// discarded when returned.
    fn close(&self);
}

/// A checked-out database connection.
#[async_trait]
pub trait Connection: Send {
    /// Apply a server-side execution ceiling to subsequent statements.
    async fn set_statement_timeout(&mut self, timeout: Duration) -> DbResult<()>;

    /// Run a statement with text parameters bound to `$1..$n`.
    ///
    /// When `cancel` fires before completion the statement is cancelled on the
    /// server and [`DatabaseError::Cancelled`](crate::error::DatabaseError::Cancelled)
    /// is returned.
    async fn query(
        &mut self,
        text: &str,
        params: &[&str],
        cancel: &CancellationToken,
    ) -> DbResult<RawQueryResult>;
}

/// Pool status information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub size: u32,
    pub available: u32,
    pub in_use: u32,
}
