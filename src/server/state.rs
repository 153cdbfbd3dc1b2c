//! Server state management.

use crate::config::ServerConfig;
use crate::database::ConnectionSource;
use crate::error::{ConfigError, Result};
use crate::gateway::QueryGateway;
use crate::tools::ToolRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct ServerState {
    pub config: ServerConfig,
    pub source: Arc<dyn ConnectionSource>,
    pub gateway: Arc<QueryGateway>,
    pub tools: ToolRegistry,
    request_count: AtomicU64,
}

impl ServerState {
    pub fn next_request_id(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Close the connection pool. Idle connections are dropped immediately.
    pub fn shutdown(&self) {
        self.source.close();
    }
}

#[derive(Default)]
pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    source: Option<Arc<dyn ConnectionSource>>,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn source(mut self, source: Arc<dyn ConnectionSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> Result<ServerState> {
        let config = self.config.unwrap_or_default();
        let source = self
            .source
            .ok_or(ConfigError::MissingField("connection source".into()))?;

        let gateway = Arc::new(QueryGateway::new(
            Arc::clone(&source),
            config.gateway.clone(),
        ));
        let tools = crate::tools::create_registry(Arc::clone(&gateway));

        Ok(ServerState {
            config,
            source,
            gateway,
            tools,
            request_count: AtomicU64::new(0),
        })
    }
}
