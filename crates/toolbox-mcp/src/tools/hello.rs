use async_trait::async_trait;
use serde_json::{json, Map, Value};

use toolbox_core::{Error, ExecutionContext, HandlerResponse};

use super::{object_schema, str_arg};
use crate::registry::{ToolDefinition, ToolHandler};

/// Name used when the caller gives none.
pub const DEFAULT_NAME: &str = "friend";

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "hello",
        "Return greeting and time. Optional argument: name.",
        object_schema(json!({"name": {"type": "string"}}), &[]),
    )
}

/// Greeting payload shared with the `/hello` route.
pub fn greeting_payload(greeting: &str, name: Option<&str>, path: &str) -> Value {
    let name = name.unwrap_or(DEFAULT_NAME);
    json!({
        "message": format!("{greeting}, {name}!"),
        "time": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "path": path,
    })
}

pub struct HelloTool;

#[async_trait]
impl ToolHandler for HelloTool {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResponse, Error> {
        let payload = greeting_payload(&ctx.greeting, str_arg(args, "name"), "/hello");
        Ok(HandlerResponse::json(200, &payload))
    }
}
