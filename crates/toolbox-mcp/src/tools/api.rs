use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use toolbox_core::{Error, ExecutionContext, HandlerResponse};

use super::{object_schema, str_arg, string_map};
use crate::registry::{ToolDefinition, ToolHandler};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "api",
        "Echo method and query. Optional query object and method.",
        object_schema(
            json!({
                "method": {"type": "string"},
                "query": {
                    "type": "object",
                    "additionalProperties": {"type": "string"}
                }
            }),
            &[],
        ),
    )
}

/// Echo payload shared with the `/api` route.
pub fn echo_payload(method: &str, query: &BTreeMap<String, String>, greeting: &str) -> Value {
    json!({
        "ok": true,
        "query": query,
        "method": method,
        "greeting": greeting,
    })
}

pub struct ApiTool;

#[async_trait]
impl ToolHandler for ApiTool {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResponse, Error> {
        let method = str_arg(args, "method")
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map_or_else(|| "GET".to_string(), str::to_ascii_uppercase);
        let query = string_map(args.get("query"));

        Ok(HandlerResponse::json(
            200,
            &echo_payload(&method, &query, &ctx.greeting),
        ))
    }
}
