mod aggregate_source;
mod market_data;
mod mcp_adapter;
mod registry;
mod r#trait;

pub use aggregate_source::AggregateToolSource;
pub use market_data::MarketDataTool;
pub use mcp_adapter::{register_mcp_tools, McpToolAdapter};
pub use r#trait::Tool;
pub use registry::{ToolRegistry, ToolRegistryLocked};
