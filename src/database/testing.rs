//! Scripted in-memory connection source for unit tests.

use crate::database::pool::{ConnectionGuard, PoolMetrics, PoolMetricsSnapshot};
use crate::database::result::{CellValue, FieldInfo, RawQueryResult, Row};
use crate::database::traits::{Connection, ConnectionSource, PoolStatus};
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct Script {
    needle: Option<String>,
    result: Result<RawQueryResult, String>,
    delay: Duration,
}

#[derive(Default)]
struct MockState {
    scripts: Mutex<Vec<Script>>,
    statements: Mutex<Vec<(String, Vec<String>)>>,
    statement_timeouts: Mutex<Vec<Duration>>,
    stall_acquire: AtomicBool,
    stall_setup: AtomicBool,
    waiting_acquires: AtomicUsize,
    metrics: Arc<PoolMetrics>,
}

/// Connection source that answers from a script instead of a database.
#[derive(Clone, Default)]
pub struct MockSource {
    state: Arc<MockState>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `needle` with `result`.
    pub fn on(self, needle: &str, result: RawQueryResult) -> Self {
        self.push(Some(needle), Ok(result), Duration::ZERO)
    }

    /// Answer every unmatched statement with `result`.
    pub fn with_result(self, result: RawQueryResult) -> Self {
        self.push(None, Ok(result), Duration::ZERO)
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.push(None, Err(message.to_string()), Duration::ZERO)
    }

    /// Answer every unmatched statement after `delay`, unless cancelled first.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.push(None, Ok(RawQueryResult::empty()), delay)
    }

    /// Never hand out a connection, as if the pool were exhausted.
    pub fn with_stalled_acquire(self) -> Self {
        self.state.stall_acquire.store(true, Ordering::SeqCst);
        self
    }

    /// Hand out connections whose session setup never completes.
    pub fn with_stalled_setup(self) -> Self {
        self.state.stall_setup.store(true, Ordering::SeqCst);
        self
    }

    /// Acquire calls currently waiting for a connection.
    pub fn waiting_acquires(&self) -> usize {
        self.state.waiting_acquires.load(Ordering::SeqCst)
    }

    fn push(self, needle: Option<&str>, result: Result<RawQueryResult, String>, delay: Duration) -> Self {
        self.state.scripts.lock().push(Script {
            needle: needle.map(String::from),
            result,
            delay,
        });
        self
    }

    /// Statements issued so far with their parameters.
    pub fn statements(&self) -> Vec<(String, Vec<String>)> {
        self.state.statements.lock().clone()
    }

    pub fn statement_timeouts(&self) -> Vec<Duration> {
        self.state.statement_timeouts.lock().clone()
    }

    fn script_for(&self, text: &str) -> Option<Script> {
        let scripts = self.state.scripts.lock();
        scripts
            .iter()
            .find(|s| s.needle.as_deref().is_some_and(|n| text.contains(n)))
            .or_else(|| scripts.iter().find(|s| s.needle.is_none()))
            .cloned()
    }
}

#[async_trait]
impl ConnectionSource for MockSource {
    async fn acquire(&self) -> DbResult<Box<dyn Connection>> {
        if self.state.stall_acquire.load(Ordering::SeqCst) {
            let _waiting = Waiting::new(&self.state.waiting_acquires);
            std::future::pending::<()>().await;
        }
        Ok(Box::new(MockConnection {
            guard: ConnectionGuard::new(self.clone(), Arc::clone(&self.state.metrics)),
        }))
    }

    fn status(&self) -> PoolStatus {
        let in_use = self.metrics().outstanding();
        PoolStatus {
            size: in_use,
            available: 0,
            in_use,
        }
    }

    fn metrics(&self) -> PoolMetricsSnapshot {
        self.state.metrics.snapshot()
    }

    fn close(&self) {}
}

struct MockConnection {
    guard: ConnectionGuard<MockSource>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn set_statement_timeout(&mut self, timeout: Duration) -> DbResult<()> {
        if self.guard.state.stall_setup.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.guard.state.statement_timeouts.lock().push(timeout);
        Ok(())
    }

    async fn query(
        &mut self,
        text: &str,
        params: &[&str],
        cancel: &CancellationToken,
    ) -> DbResult<RawQueryResult> {
        self.guard.state.statements.lock().push((
            text.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        ));

        let script = self.guard.script_for(text).unwrap_or(Script {
            needle: None,
            result: Ok(RawQueryResult::empty()),
            delay: Duration::ZERO,
        });

        if !script.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(script.delay) => {}
                _ = cancel.cancelled() => {
                    self.guard.metrics().record_query_cancelled();
                    return Err(DatabaseError::Cancelled);
                }
            }
        }

        match script.result {
            Ok(result) => {
                self.guard.metrics().record_query_executed();
                Ok(result)
            }
            Err(message) => {
                self.guard.metrics().record_query_error();
                Err(DatabaseError::QueryFailed(message))
            }
        }
    }
}

/// Counts a waiter for as long as it is alive.
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Build a result from column names and rows of values.
pub fn table(columns: &[&str], rows: Vec<Vec<CellValue>>) -> RawQueryResult {
    let fields = columns.iter().map(|c| FieldInfo::new(*c, 25)).collect();
    let rows = rows
        .into_iter()
        .map(|values| {
            columns
                .iter()
                .map(|c| c.to_string())
                .zip(values)
                .collect::<Row>()
        })
        .collect();
    RawQueryResult::new(rows, fields)
}

/// `count` single-column rows numbered from zero.
pub fn numbered_rows(count: usize) -> RawQueryResult {
    let rows = (0..count)
        .map(|i| Row::from([("id".to_string(), CellValue::Int(i as i64))]))
        .collect();
    RawQueryResult::new(rows, vec![FieldInfo::new("id", 23)])
}
