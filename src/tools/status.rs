//! Pool and rate-limit status tool.

use crate::error::Result;
use crate::gateway::QueryGateway;
use crate::tools::registry::{ToolDefinition, ToolHandler, ToolResponse, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatusArgs {
    #[serde(default)]
    pub client_id: Option<String>,
}

pub struct GatewayStatusTool {
    gateway: Arc<QueryGateway>,
}

impl GatewayStatusTool {
    pub fn new(gateway: Arc<QueryGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ToolHandler for GatewayStatusTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "gateway_status",
            description: "Show connection pool occupancy and counters. With a clientId, also \
                          show that client's remaining query budget for the current window.",
            schema: {
                "type": "object",
                "properties": {
                    "clientId": {
                        "type": "string",
                        "description": "Client whose rate limit budget to report"
                    }
                }
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "gateway_status"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: GatewayStatusArgs = if arguments.is_null() {
            GatewayStatusArgs::default()
        } else {
            parse_args(arguments)?
        };

        let source = self.gateway.source();
        let mut status = json!({
            "pool": source.status(),
            "metrics": source.metrics(),
            "trackedClients": self.gateway.limiter().tracked_callers(),
        });
        if let Some(client_id) = &args.client_id {
            status["rateLimit"] = serde_json::to_value(self.gateway.limiter().status(client_id))?;
        }
        Ok(ToolResponse::json(&status))
    }
}
