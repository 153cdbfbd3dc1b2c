//! Schema inspection tools: list_schemas, list_tables, list_columns.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::tools::registry::{ToolDefinition, ToolHandler, ToolResponse, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

pub struct ListSchemasTool {
    catalog: Catalog,
}

impl ListSchemasTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for ListSchemasTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "list_schemas",
            description: "List all available schemas in the database, excluding system schemas.",
            schema: {
                "type": "object",
                "properties": {}
            }
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "list_schemas"))]
    async fn execute(&self, _arguments: Value) -> Result<ToolResponse> {
        let schemas = self.catalog.list_schemas().await?;
        Ok(ToolResponse::json(&json!({ "schemas": schemas })))
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTablesArgs {
    pub schema: String,
}

pub struct ListTablesTool {
    catalog: Catalog,
}

impl ListTablesTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for ListTablesTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "list_tables",
            description: "List all tables in a schema. Requires a schema name (e.g., 'public').",
            schema: {
                "type": "object",
                "properties": {
                    "schema": {
                        "type": "string",
                        "description": "The name of the schema to list tables from (e.g., 'public')"
                    }
                },
                "required": ["schema"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "list_tables"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: ListTablesArgs = parse_args(arguments)?;
        let tables = self.catalog.list_tables(&args.schema).await?;
        Ok(ToolResponse::json(&json!({ "tables": tables })))
    }
}

#[derive(Debug, Deserialize)]
pub struct ListColumnsArgs {
    pub schema: String,
    pub table: String,
}

pub struct ListColumnsTool {
    catalog: Catalog,
}

impl ListColumnsTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for ListColumnsTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "list_columns",
            description: "List columns for a table. Requires both schema and table names.",
            schema: {
                "type": "object",
                "properties": {
                    "schema": {
                        "type": "string",
                        "description": "The name of the schema containing the table"
                    },
                    "table": {
                        "type": "string",
                        "description": "The name of the table to list columns from"
                    }
                },
                "required": ["schema", "table"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "list_columns"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: ListColumnsArgs = parse_args(arguments)?;
        let columns = self.catalog.list_columns(&args.schema, &args.table).await?;
        Ok(ToolResponse::json(&json!({ "columns": columns })))
    }
}
