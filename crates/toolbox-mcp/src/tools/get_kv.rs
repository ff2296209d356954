use async_trait::async_trait;
use serde_json::{json, Map, Value};

use toolbox_core::{Error, ExecutionContext, HandlerResponse};

use super::{error_response, not_configured, object_schema, str_arg};
use crate::registry::{ToolDefinition, ToolHandler};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "get-kv",
        "Get Key Value from storage",
        object_schema(
            json!({"key": {"type": "string", "description": "Key to fetch"}}),
            &["key"],
        ),
    )
}

pub struct GetKvTool;

#[async_trait]
impl ToolHandler for GetKvTool {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResponse, Error> {
        let Some(kv) = &ctx.kv else {
            return Ok(not_configured("KV"));
        };

        let key = str_arg(args, "key").unwrap_or_default();
        if key.is_empty() {
            return Ok(error_response(400, "Invalid key"));
        }

        let value = kv.get(key).await?;
        Ok(HandlerResponse::json(200, &json!({ "key": key, "value": value })))
    }
}
