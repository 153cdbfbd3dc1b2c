//! Tool definitions and registry.

pub mod erd;
pub mod inspect;
pub mod query;
pub mod registry;
pub mod relationships;
pub mod schema;
pub mod status;

pub use erd::{GenerateErdJsonTool, GenerateErdMermaidTool};
pub use inspect::{FuzzyColumnMatchTool, SampleColumnDataTool};
pub use query::RunQueryTool;
pub use registry::{ToolContent, ToolDefinition, ToolHandler, ToolRegistry, ToolResponse, parse_args};
pub use relationships::{DescribeRelationshipTool, FindRelatedTablesTool};
pub use schema::{ListColumnsTool, ListSchemasTool, ListTablesTool};
pub use status::GatewayStatusTool;

use crate::catalog::Catalog;
use crate::gateway::QueryGateway;
use std::sync::Arc;

/// Create and register all tools.
pub fn create_registry(gateway: Arc<QueryGateway>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    let catalog = Catalog::new(Arc::clone(gateway.source()));

    // Gateway tools
    registry.register(RunQueryTool::new(Arc::clone(&gateway)));
    registry.register(GatewayStatusTool::new(gateway));

    // Catalog tools
    registry.register(ListSchemasTool::new(catalog.clone()));
    registry.register(ListTablesTool::new(catalog.clone()));
    registry.register(ListColumnsTool::new(catalog.clone()));
    registry.register(FindRelatedTablesTool::new(catalog.clone()));
    registry.register(DescribeRelationshipTool::new(catalog.clone()));
    registry.register(GenerateErdJsonTool::new(catalog.clone()));
    registry.register(GenerateErdMermaidTool::new(catalog.clone()));
    registry.register(FuzzyColumnMatchTool::new(catalog.clone()));
    registry.register(SampleColumnDataTool::new(catalog));

    registry
}
