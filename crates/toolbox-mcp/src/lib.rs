pub mod engine;
pub mod jsonrpc;
pub mod normalize;
pub mod registry;
pub mod tools;

pub use engine::McpEngine;
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use normalize::{normalize, ContentItem, ToolContent};
pub use registry::{ToolDefinition, ToolHandler, ToolRegistry};

#[cfg(test)]
pub(crate) mod testing;
