//! PostgreSQL connection source using `tokio-postgres` and `deadpool`.

use crate::config::DatabaseConfig;
use crate::database::pool::{ConnectionGuard, PoolConfig, PoolMetrics, PoolMetricsSnapshot};
use crate::database::result::{CellValue, FieldInfo, RawQueryResult, Row};
use crate::database::tls::PgTls;
use crate::database::traits::{Connection, ConnectionSource, PoolStatus};
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{
    Config as DeadpoolConfig, ManagerConfig, Object, Pool, PoolConfig as DeadpoolPoolConfig,
    RecyclingMethod, Runtime,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::types::{ToSql, Type};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Pooled PostgreSQL connection source.
pub struct PgConnectionSource {
    pool: Pool,
    tls: PgTls,
    metrics: Arc<PoolMetrics>,
}

impl PgConnectionSource {
    /// Create the pool and verify that one connection can be opened.
    pub async fn new(config: &DatabaseConfig) -> DbResult<Self> {
        let tls = PgTls::from_config(config)?;
        info!(
            tls = tls.is_enabled(),
            "Connecting to PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        let pool_config = PoolConfig::from(config);

        let mut deadpool_config = DeadpoolConfig::new();
        deadpool_config.host = Some(config.host.clone());
        deadpool_config.port = Some(config.port);
        deadpool_config.dbname = Some(config.database.clone());
        deadpool_config.user = Some(config.username.clone());
        deadpool_config.password = Some(config.password.clone());
        deadpool_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut deadpool_pool = DeadpoolPoolConfig::new(pool_config.max_size as usize);
        deadpool_pool.timeouts.wait = Some(pool_config.wait_timeout);
        deadpool_pool.timeouts.create = Some(pool_config.wait_timeout);
        deadpool_config.pool = Some(deadpool_pool);

        let pool = match &tls {
            PgTls::Disabled => {
                deadpool_config.create_pool(Some(Runtime::Tokio1), tokio_postgres::NoTls)
            }
            PgTls::Rustls(connector) => {
                deadpool_config.create_pool(Some(Runtime::Tokio1), connector.clone())
            }
        }
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        // Test connection
        let _conn = pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            "PostgreSQL connection pool created with max size {}",
            pool_config.max_size
        );

        Ok(Self {
            pool,
            tls,
            metrics: Arc::new(PoolMetrics::new()),
        })
    }
}

#[async_trait]
impl ConnectionSource for PgConnectionSource {
    async fn acquire(&self) -> DbResult<Box<dyn Connection>> {
        match self.pool.get().await {
            Ok(object) => Ok(Box::new(PgConnection {
                inner: ConnectionGuard::new(object, Arc::clone(&self.metrics)),
                tls: self.tls.clone(),
            })),
            Err(e) => {
                self.metrics.record_acquire_error();
                warn!("Failed to acquire connection: {}", e);
                Err(DatabaseError::AcquireFailed(e.to_string()))
            }
        }
    }

    fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            size: status.size as u32,
            available: status.available as u32,
            in_use: status.size.saturating_sub(status.available) as u32,
        }
    }

    fn metrics(&self) -> PoolMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn close(&self) {
        info!("Closing PostgreSQL connection pool");
        self.pool.close();
    }
}

/// A connection checked out of the deadpool pool.
struct PgConnection {
    inner: ConnectionGuard<Object>,
    tls: PgTls,
}

#[async_trait]
impl Connection for PgConnection {
    async fn set_statement_timeout(&mut self, timeout: Duration) -> DbResult<()> {
        let client: &tokio_postgres::Client = &self.inner;
        client
            .batch_execute(&format!("SET statement_timeout = {}", timeout.as_millis()))
            .await
            .map_err(pg_error)
    }

    #[instrument(skip(self, params, cancel), fields(db = "postgres"))]
    async fn query(
        &mut self,
        text: &str,
        params: &[&str],
        cancel: &CancellationToken,
    ) -> DbResult<RawQueryResult> {
        let client: &tokio_postgres::Client = &self.inner;
        let cancel_token = client.cancel_token();
        let bound: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let work = async {
            let statement = client.prepare(text).await?;
            let rows = client.query(&statement, &bound).await?;
            Ok::<_, tokio_postgres::Error>((statement, rows))
        };

        tokio::select! {
            result = work => match result {
                Ok((statement, pg_rows)) => {
                    self.inner.metrics().record_query_executed();
                    let fields = statement
                        .columns()
                        .iter()
                        .map(|c| FieldInfo::new(c.name(), c.type_().oid()))
                        .collect();
                    let rows = pg_rows.iter().map(convert_row).collect();
                    Ok(RawQueryResult::new(rows, fields))
                }
                Err(e) => {
                    self.inner.metrics().record_query_error();
                    Err(pg_error(e))
                }
            },
            _ = cancel.cancelled() => {
                self.inner.metrics().record_query_cancelled();
                debug!("Sending cancel request for in-flight statement");
                if let Err(e) = self.tls.cancel(&cancel_token).await {
                    warn!("Cancel request failed: {}", e);
                }
                Err(DatabaseError::Cancelled)
            }
        }
    }
}

/// Prefer the server's message over the driver's wrapper text.
fn pg_error(e: tokio_postgres::Error) -> DatabaseError {
    let message = e
        .as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| e.to_string());
    DatabaseError::QueryFailed(message)
}

fn convert_row(pg_row: &tokio_postgres::Row) -> Row {
    pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), cell_value(pg_row, i, col.type_())))
        .collect()
}

/// Decode one cell by its column type. Types without a mapping decode as null.
fn cell_value(row: &tokio_postgres::Row, index: usize, ty: &Type) -> CellValue {
    let decoded = match ty.name() {
        "bool" => row.try_get::<_, Option<bool>>(index).map(CellValue::from),
        "int2" => row
            .try_get::<_, Option<i16>>(index)
            .map(|v| CellValue::from(v.map(i64::from))),
        "int4" => row
            .try_get::<_, Option<i32>>(index)
            .map(|v| CellValue::from(v.map(i64::from))),
        "int8" => row.try_get::<_, Option<i64>>(index).map(CellValue::from),
        "oid" => row
            .try_get::<_, Option<u32>>(index)
            .map(|v| CellValue::from(v.map(i64::from))),
        "float4" => row
            .try_get::<_, Option<f32>>(index)
            .map(|v| CellValue::from(v.map(f64::from))),
        "float8" => row.try_get::<_, Option<f64>>(index).map(CellValue::from),
        "numeric" => row
            .try_get::<_, Option<Decimal>>(index)
            .map(|v| v.map_or(CellValue::Null, CellValue::Decimal)),
        "text" | "varchar" | "bpchar" | "name" | "citext" => {
            row.try_get::<_, Option<String>>(index).map(CellValue::from)
        }
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(index)
            .map(|v| v.map_or(CellValue::Null, CellValue::DateTime)),
        "timestamp" => row.try_get::<_, Option<NaiveDateTime>>(index).map(|v| {
            v.map_or(CellValue::Null, |naive| {
                CellValue::DateTime(DateTime::from_naive_utc_and_offset(naive, Utc))
            })
        }),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(index)
            .map(|v| v.map_or(CellValue::Null, CellValue::Date)),
        "json" | "jsonb" => row
            .try_get::<_, Option<serde_json::Value>>(index)
            .map(|v| v.map_or(CellValue::Null, CellValue::Json)),
        "uuid" => row
            .try_get::<_, Option<uuid::Uuid>>(index)
            .map(|v| CellValue::from(v.map(|id| id.to_string()))),
        other => {
            debug!("No decoder for column type {}, returning null", other);
            return CellValue::Null;
        }
    };

    decoded.unwrap_or_else(|e| {
        debug!("Failed to decode {} value: {}", ty.name(), e);
        CellValue::Null
    })
}
