use async_trait::async_trait;
use serde_json::{json, Map, Value};

use toolbox_core::{Error, ExecutionContext, HandlerResponse};

use super::object_schema;
use crate::registry::{ToolDefinition, ToolHandler};

pub const PING_REPLY: &str = "Ping successful!";

pub fn definition() -> ToolDefinition {
    ToolDefinition::new("ping", "Return pong", object_schema(json!({}), &[]))
}

pub struct PingTool;

#[async_trait]
impl ToolHandler for PingTool {
    async fn invoke(
        &self,
        _args: &Map<String, Value>,
        _ctx: &ExecutionContext,
    ) -> Result<HandlerResponse, Error> {
        Ok(HandlerResponse::text(200, PING_REPLY))
    }
}
