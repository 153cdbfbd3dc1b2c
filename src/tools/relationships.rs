//! Foreign-key relationship tools.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::tools::registry::{ToolDefinition, ToolHandler, ToolResponse, parse_args};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct TableArgs {
    pub schema: String,
    pub table: String,
}

pub struct FindRelatedTablesTool {
    catalog: Catalog,
}

impl FindRelatedTablesTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for FindRelatedTablesTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "find_related_tables",
            description: "Find related tables for the specified table using FK constraints.",
            schema: {
                "type": "object",
                "properties": {
                    "schema": { "type": "string" },
                    "table": { "type": "string" }
                },
                "required": ["schema", "table"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "find_related_tables"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: TableArgs = parse_args(arguments)?;
        let related = self
            .catalog
            .find_related_tables(&args.schema, &args.table)
            .await?;
        Ok(ToolResponse::json(&json!({ "related_tables": related })))
    }
}

#[derive(Debug, Deserialize)]
pub struct DescribeRelationshipArgs {
    pub schema: String,
    pub table1: String,
    pub table2: String,
}

pub struct DescribeRelationshipTool {
    catalog: Catalog,
}

impl DescribeRelationshipTool {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for DescribeRelationshipTool {
    fn definition(&self) -> ToolDefinition {
        crate::define_tool! {
            name: "describe_relationship",
            description: "Describe the relationship between two tables in English.",
            schema: {
                "type": "object",
                "properties": {
                    "schema": { "type": "string" },
                    "table1": { "type": "string" },
                    "table2": { "type": "string" }
                },
                "required": ["schema", "table1", "table2"]
            }
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "describe_relationship"))]
    async fn execute(&self, arguments: Value) -> Result<ToolResponse> {
        let args: DescribeRelationshipArgs = parse_args(arguments)?;
        let explanation = self
            .catalog
            .describe_relationship(&args.schema, &args.table1, &args.table2)
            .await?;
        Ok(ToolResponse::json(&json!({ "explanation": explanation })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::MockSource;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_no_relationship_explanation() {
        let source = MockSource::new();
        let tool = DescribeRelationshipTool::new(Catalog::new(Arc::new(source.clone())));

        let response = tool
            .execute(json!({"schema": "public", "table1": "a", "table2": "b"}))
            .await
            .unwrap();

        let explanation = response.structured_content.unwrap()["explanation"].clone();
        assert_eq!(
            explanation,
            "There is no direct foreign key relationship between \"a\" and \"b\" in schema \"public\"."
        );
    }

    #[tokio::test]
    async fn test_related_tables_empty() {
        let source = MockSource::new();
        let tool = FindRelatedTablesTool::new(Catalog::new(Arc::new(source.clone())));

        let response = tool
            .execute(json!({"schema": "public", "table": "orphans"}))
            .await
            .unwrap();

        assert_eq!(
            response.structured_content,
            Some(json!({"related_tables": []}))
        );
        assert_eq!(source.statements().len(), 2);
    }
}
