//! Request pipeline: classify, assess, rate-limit, dispatch, shape.

use crate::config::GatewayConfig;
use crate::database::{ConnectionSource, RawQueryResult};
use crate::error::{DatabaseError, DbResult};
use crate::gateway::outcome::{ExecutionOutcome, Rejection};
use crate::gateway::shaper::shape;
use crate::security::{Classification, RateLimiter, assess_complexity, classify};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Safety-constrained executor for caller-supplied read statements.
pub struct QueryGateway {
    source: Arc<dyn ConnectionSource>,
    limiter: Arc<RateLimiter>,
    config: GatewayConfig,
}

impl QueryGateway {
    pub fn new(source: Arc<dyn ConnectionSource>, config: GatewayConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window,
            config.max_requests_per_window,
        ));
        Self::with_limiter(source, limiter, config)
    }

    /// Share a limiter between gateways.
    pub fn with_limiter(
        source: Arc<dyn ConnectionSource>,
        limiter: Arc<RateLimiter>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            source,
            limiter,
            config,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<dyn ConnectionSource> {
        &self.source
    }

    /// Run `statement` on behalf of `caller_id`.
    ///
    /// Rejections short-circuit before any connection is acquired. Statements
    /// that fail classification or the complexity check consume no rate-limit
    /// budget.
    #[instrument(skip(self, statement), fields(caller = caller_id))]
    pub async fn execute(&self, statement: &str, caller_id: &str) -> ExecutionOutcome {
        if let Classification::Denied(detail) = classify(statement) {
            warn!(reason = %detail, "Rejected non-read statement");
            return ExecutionOutcome::Rejected(Rejection::ReadOnlyViolation { detail });
        }

        let assessment = assess_complexity(statement);
        if assessment.is_complex {
            warn!(signals = ?assessment.signals, "Rejected complex statement");
            return ExecutionOutcome::Rejected(Rejection::TooComplex {
                reason: assessment.reason.unwrap_or_default(),
            });
        }

        let now = Instant::now();
        self.limiter.maybe_evict(now);
        if !self.limiter.check_and_consume_at(caller_id, now).is_allowed() {
            return ExecutionOutcome::Rejected(Rejection::RateLimited);
        }

        let started = Instant::now();
        match self.dispatch(statement).await {
            Dispatch::Completed(Ok(raw)) => {
                let envelope = shape(raw, self.config.max_rows);
                info!(
                    rows = envelope.row_count,
                    total_rows = envelope.total_row_count,
                    limited = envelope.was_limited,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query succeeded"
                );
                ExecutionOutcome::Succeeded(envelope)
            }
            Dispatch::Completed(Err(e)) => {
                warn!(error = %e, "Query failed");
                ExecutionOutcome::Failed(e.to_string())
            }
            Dispatch::TimedOut => {
                warn!(
                    timeout_ms = self.config.query_timeout.as_millis() as u64,
                    "Query timed out"
                );
                ExecutionOutcome::TimedOut(self.config.query_timeout)
            }
        }
    }

    /// Race the statement against the wall-clock deadline.
    ///
    /// The statement runs in its own task, which owns the connection. When the
    /// deadline wins, or the caller stops waiting, the task is signalled
    /// through the token and left to cancel server-side and drop its
    /// connection.
    async fn dispatch(&self, statement: &str) -> Dispatch {
        let cancel = CancellationToken::new();
        // Cancels the statement if this future is dropped before it finishes.
        let _cancel_on_drop = cancel.clone().drop_guard();
        let task = tokio::spawn(run_statement(
            Arc::clone(&self.source),
            statement.to_string(),
            self.config.statement_timeout,
            cancel.clone(),
        ));

        tokio::select! {
            joined = task => match joined {
                Ok(result) => Dispatch::Completed(result),
                Err(e) => Dispatch::Completed(Err(DatabaseError::QueryFailed(e.to_string()))),
            },
            _ = tokio::time::sleep(self.config.query_timeout) => {
                cancel.cancel();
                Dispatch::TimedOut
            }
        }
    }
}

enum Dispatch {
    Completed(DbResult<RawQueryResult>),
    TimedOut,
}

async fn run_statement(
    source: Arc<dyn ConnectionSource>,
    statement: String,
    statement_timeout: Duration,
    cancel: CancellationToken,
) -> DbResult<RawQueryResult> {
    let mut connection = tokio::select! {
        acquired = source.acquire() => acquired?,
        _ = cancel.cancelled() => return Err(DatabaseError::Cancelled),
    };
    debug!("Connection acquired");

    tokio::select! {
        applied = connection.set_statement_timeout(statement_timeout) => applied?,
        _ = cancel.cancelled() => return Err(DatabaseError::Cancelled),
    }
    connection.query(&statement, &[], &cancel).await
}
