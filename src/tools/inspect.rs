//! Column inspection tools: fuzzy_column_match, sample_column_data.

use crate::catalog::{Catalog, DEFAULT_SAMPLE_LIMIT};
use crate::error::Result;
use crate::tools::registry::{ToolDefinition, ToolHandler, ToolResponse, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct FuzzyColumnMatchArgs {
    pub schema: String,
    pub table: String,
    pub keyword: String,
}

pub struct FuzzyColumnMatchTool {
    catalog: Catalog,
}

impl FuzzyColumnMatchTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for FuzzyColumnMatchTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "fuzzy_column_match",
            description: "Finds the best matching column in a table given a user keyword, \
                          using similarity and column comments.",
            schema: {
                "type": "object",
                "properties": {
                    "schema": { "type": "string" },
                    "table": { "type": "string" },
                    "keyword": { "type": "string" }
                },
                "required": ["schema", "table", "keyword"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "fuzzy_column_match"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: FuzzyColumnMatchArgs = parse_args(arguments)?;
        let result = self
            .catalog
            .fuzzy_column_match(&args.schema, &args.table, &args.keyword)
            .await?;
        Ok(ToolResponse::json(&result))
    }
}

#[derive(Debug, Deserialize)]
pub struct SampleColumnDataArgs {
    pub schema: String,
    pub table: String,
    pub column: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

pub struct SampleColumnDataTool {
    catalog: Catalog,
}

impl SampleColumnDataTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for SampleColumnDataTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "sample_column_data",
            description: "Get sample data values from a column for data inspection.",
            schema: {
                "type": "object",
                "properties": {
                    "schema": { "type": "string" },
                    "table": { "type": "string" },
                    "column": { "type": "string" },
                    "limit": {
                        "type": "integer",
                        "description": "Number of distinct values to return (default: 5)",
                        "minimum": 1
                    }
                },
                "required": ["schema", "table", "column"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "sample_column_data"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: SampleColumnDataArgs = parse_args(arguments)?;
        let values = self
            .catalog
            .sample_column_data(
                &args.schema,
                &args.table,
                &args.column,
                args.limit.unwrap_or(DEFAULT_SAMPLE_LIMIT),
            )
            .await?;
        Ok(ToolResponse::json(&json!({ "values": values })))
    }
}
