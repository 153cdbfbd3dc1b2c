//! Read-only query execution tool.

use crate::error::Result;
use crate::gateway::{QueryGateway, ResultEnvelope};
use crate::tools::registry::{ToolDefinition, ToolHandler, ToolResponse, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryArgs {
    pub query: String,
    pub client_id: String,
}

pub struct RunQueryTool {
    gateway: Arc<QueryGateway>,
}

impl RunQueryTool {
    pub fn new(gateway: Arc<QueryGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ToolHandler for RunQueryTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "run_query",
            description: "Execute a SELECT query with safety measures. Statements other than \
                          SELECT are rejected, expensive statements are refused, each client is \
                          rate limited and results are capped in size.",
            schema: {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The SELECT query to execute"
                    },
                    "clientId": {
                        "type": "string",
                        "description": "Unique identifier for rate limiting"
                    }
                },
                "required": ["query", "clientId"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "run_query"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: RunQueryArgs = parse_args(arguments)?;

        let outcome = self.gateway.execute(&args.query, &args.client_id).await;
        Ok(match outcome.into_response() {
            Ok(envelope) => ToolResponse::json(&envelope),
            Err(message) => ToolResponse::error(message)
                .with_structured(serde_json::to_value(ResultEnvelope::empty())?),
        })
    }
}
