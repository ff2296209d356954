//! Shipped tools. Each module exposes a `definition()` and a handler type.
//!
//! `toolbox scaffold` edits the marked regions below; keep the markers intact.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use toolbox_core::{Error, HandlerResponse};

use crate::registry::ToolRegistry;

// TOOL_MODULES_START
pub mod api;
pub mod get_kv;
pub mod hello;
pub mod http_request;
pub mod ping;
pub mod set_kv;
pub mod weather;
// TOOL_MODULES_END

/// Register every shipped tool, in listing order.
///
/// # Errors
///
/// Returns [`Error::DuplicateTool`] if two modules claim the same name.
pub fn register_builtin(registry: &mut ToolRegistry) -> Result<(), Error> {
    // TOOL_REGISTER_START
    registry.register(hello::definition(), Arc::new(hello::HelloTool))?;
    registry.register(api::definition(), Arc::new(api::ApiTool))?;
    registry.register(ping::definition(), Arc::new(ping::PingTool))?;
    registry.register(get_kv::definition(), Arc::new(get_kv::GetKvTool))?;
    registry.register(set_kv::definition(), Arc::new(set_kv::SetKvTool))?;
    registry.register(http_request::definition(), Arc::new(http_request::HttpRequestTool))?;
    registry.register(weather::definition(), Arc::new(weather::WeatherTool))?;
    // TOOL_REGISTER_END
    Ok(())
}

/// The argument as a string, if present and a string.
pub fn str_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// Keep only the string-valued entries of an object. Anything else is empty.
pub fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(object)) = value else {
        return BTreeMap::new();
    };
    object
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

/// `{"error": message}` with the given status.
pub fn error_response(status: u16, message: impl Into<String>) -> HandlerResponse {
    HandlerResponse::json(status, &json!({ "error": message.into() }))
}

/// The 500 answer for a capability the deployment did not bind.
pub fn not_configured(capability: &'static str) -> HandlerResponse {
    error_response(500, Error::NotConfigured(capability).to_string())
}

/// An object schema that rejects unknown properties.
pub fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_map_drops_non_strings() {
        let value = json!({"a": "1", "b": 2, "c": null, "d": "x"});
        let map = string_map(Some(&value));
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], "1");
        assert_eq!(map["d"], "x");
    }

    #[test]
    fn string_map_of_non_object_is_empty() {
        assert!(string_map(Some(&json!(["a"]))).is_empty());
        assert!(string_map(Some(&json!("a"))).is_empty());
        assert!(string_map(None).is_empty());
    }

    #[test]
    fn not_configured_body() {
        let resp = not_configured("KV");
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body_text(), r#"{"error":"KV not configured"}"#);
    }

    #[test]
    fn object_schema_shape() {
        let schema = object_schema(json!({"key": {"type": "string"}}), &["key"]);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["key"]));
        assert_eq!(schema["additionalProperties"], json!(false));
    }
}
