//! Entity-relationship diagram tools.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::tools::registry::{ToolDefinition, ToolHandler, ToolResponse, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct SchemaArgs {
    pub schema: String,
}

pub struct GenerateErdMermaidTool {
    catalog: Catalog,
}

impl GenerateErdMermaidTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for GenerateErdMermaidTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "generate_erd_mermaid",
            description: "Generate a Mermaid ERD diagram for the given schema.",
            schema: {
                "type": "object",
                "properties": {
                    "schema": { "type": "string" }
                },
                "required": ["schema"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "generate_erd_mermaid"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: SchemaArgs = parse_args(arguments)?;
        let diagram = self.catalog.generate_erd_mermaid(&args.schema).await?;
        Ok(ToolResponse::json(&json!({ "diagram": diagram })))
    }
}

pub struct GenerateErdJsonTool {
    catalog: Catalog,
}

impl GenerateErdJsonTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for GenerateErdJsonTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "generate_erd_json",
            description: "Return the ERD as a JSON graph for the given schema.",
            schema: {
                "type": "object",
                "properties": {
                    "schema": { "type": "string" }
                },
                "required": ["schema"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "generate_erd_json"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: SchemaArgs = parse_args(arguments)?;
        let graph = self.catalog.generate_erd_json(&args.schema).await?;
        Ok(ToolResponse::json(&graph))
    }
}
