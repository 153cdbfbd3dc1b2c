//! Gateway binary entry point.

use anyhow::Result;
use pg_query_gateway::{
    config::ServerConfig,
    database::create_source,
    server::{ServerStateBuilder, serve_stdio},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = ServerConfig::from_env()?;
    info!(
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.database,
        max_rows = config.gateway.max_rows,
        "Connecting to PostgreSQL"
    );

    let source = create_source(&config.database).await?;
    let state = Arc::new(
        ServerStateBuilder::new()
            .config(config)
            .source(source)
            .build()?,
    );

    info!("Server ready with {} tools, reading requests from stdin", state.tools.len());

    let served = serve_stdio(Arc::clone(&state)).await;

    state.shutdown();
    info!(
        requests = state.request_count(),
        "Server shutdown complete"
    );
    served?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pg_query_gateway=info,warn"));

    // stdout carries responses, so logs go to stderr
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
