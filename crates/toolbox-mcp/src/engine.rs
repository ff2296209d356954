use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};

use toolbox_core::{Error, ExecutionContext};

use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::normalize::normalize;
use crate::registry::ToolRegistry;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "toolbox";

const REDACTED: &str = "[REDACTED]";

/// JSON-RPC dispatcher over a fixed tool registry.
///
/// Every input yields exactly one response; no failure escapes as an `Err`.
#[derive(Clone)]
pub struct McpEngine {
    registry: Arc<ToolRegistry>,
    context: ExecutionContext,
}

impl McpEngine {
    pub fn new(registry: Arc<ToolRegistry>, context: ExecutionContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Handle a raw request body.
    pub async fn handle_body(&self, body: &[u8]) -> JsonRpcResponse {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => self.handle_value(value).await,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting unparseable JSON-RPC body");
                JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error(err.to_string()))
            }
        }
    }

    /// Handle an already parsed request envelope.
    pub async fn handle_value(&self, value: Value) -> JsonRpcResponse {
        match JsonRpcRequest::from_value(value) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => {
                tracing::debug!("rejecting malformed JSON-RPC envelope");
                JsonRpcResponse::error(Value::Null, err)
            }
        }
    }

    /// Route a validated request and log the outcome.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let started = Instant::now();
        let id = request.id.clone();

        let outcome = match request.method.as_str() {
            "initialize" => Ok(initialize_result()),
            "tools/list" => Ok(json!({ "tools": self.registry.list() })),
            "tools/call" => self.call_tool(request.params.as_ref()).await,
            "ping" => Ok(json!({ "ok": true })),
            _ => Err(JsonRpcError::method_not_found()),
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            Ok(_) => tracing::info!(
                method = %request.method,
                id = %id,
                params = %redact_params(request.params.as_ref()),
                elapsed_ms,
                outcome = "ok",
                "mcp request handled"
            ),
            Err(err) => tracing::info!(
                method = %request.method,
                id = %id,
                params = %redact_params(request.params.as_ref()),
                elapsed_ms,
                outcome = "error",
                code = err.code,
                "mcp request handled"
            ),
        }

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::error(id, err),
        }
    }

    async fn call_tool(&self, params: Option<&Value>) -> Result<Value, JsonRpcError> {
        let (name, arguments) = tool_call_params(params)?;

        let handler = self.registry.lookup(name)?;
        let context = self.context.clone();

        // Run on its own task so a panicking handler still gets an envelope.
        let task = tokio::spawn(async move { handler.invoke(&arguments, &context).await });
        let response = match task.await {
            Ok(result) => result.map_err(|err: Error| {
                tracing::warn!(tool = name, error = %err, "tool handler failed");
                JsonRpcError::from(err)
            })?,
            Err(join_err) => {
                tracing::error!(tool = name, error = %join_err, "tool handler aborted");
                return Err(JsonRpcError::server_error(format!(
                    "Tool handler aborted: {name}"
                )));
            }
        };

        Ok(normalize(&response).into())
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "capabilities": {
            "tools": {}
        }
    })
}

/// Extract `name` and `arguments` from `tools/call` params.
///
/// Missing or `null` arguments become an empty object.
fn tool_call_params(params: Option<&Value>) -> Result<(&str, Map<String, Value>), JsonRpcError> {
    let Some(Value::Object(params)) = params else {
        return Err(JsonRpcError::invalid_params());
    };
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return Err(JsonRpcError::invalid_params());
    };

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments.clone(),
        Some(_) => return Err(JsonRpcError::invalid_params()),
    };

    Ok((name, arguments))
}

/// Copy of `params` safe to log.
pub fn redact_params(params: Option<&Value>) -> Value {
    params.map_or(Value::Null, redact_value)
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (key.clone(), redact_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        _ => value.clone(),
    }
}

/// Whether a field name looks like it carries a credential.
///
/// A bare `key` is a storage key, not a secret; `api_key` and friends are.
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "authorization" | "bearer" | "apikey")
        || normalized.ends_with("_key")
        || normalized.ends_with("-key")
        || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}
