//! Connection pool metrics and the release-tracking connection guard.

use crate::config::DatabaseConfig;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Pool sizing derived from [`DatabaseConfig`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub wait_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            wait_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_size: config.pool_size,
            wait_timeout: config.connection_timeout,
        }
    }
}

/// Pool metrics for monitoring.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    pub connections_acquired: AtomicU32,
    pub connections_released: AtomicU32,
    pub acquire_errors: AtomicU32,
    pub queries_executed: AtomicU32,
    pub query_errors: AtomicU32,
    pub queries_cancelled: AtomicU32,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_acquired(&self) {
        self.connections_acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_released(&self) {
        self.connections_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_acquire_error(&self) {
        self.acquire_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query_error(&self) {
        self.query_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query_cancelled(&self) {
        self.queries_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            connections_acquired: self.connections_acquired.load(Ordering::Relaxed),
            connections_released: self.connections_released.load(Ordering::Relaxed),
            acquire_errors: self.acquire_errors.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            query_errors: self.query_errors.load(Ordering::Relaxed),
            queries_cancelled: self.queries_cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolMetricsSnapshot {
    pub connections_acquired: u32,
    pub connections_released: u32,
    pub acquire_errors: u32,
    pub queries_executed: u32,
    pub query_errors: u32,
    pub queries_cancelled: u32,
}

impl PoolMetricsSnapshot {
    /// Connections handed out and not yet returned.
    pub fn outstanding(&self) -> u32 {
        self.connections_acquired
            .saturating_sub(self.connections_released)
    }
}

/// Wraps a pooled connection and records its release on drop.
pub struct ConnectionGuard<C> {
    pub connection: C,
    metrics: Arc<PoolMetrics>,
}

impl<C> ConnectionGuard<C> {
    pub fn new(connection: C, metrics: Arc<PoolMetrics>) -> Self {
        metrics.record_acquired();
        Self {
            connection,
            metrics,
        }
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

impl<C> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.metrics.record_released();
    }
}

impl<C> std::ops::Deref for ConnectionGuard<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl<C> std::ops::DerefMut for ConnectionGuard<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
