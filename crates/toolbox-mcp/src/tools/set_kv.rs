use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use toolbox_core::{Error, ExecutionContext, HandlerResponse};

use super::{error_response, not_configured, object_schema, str_arg};
use crate::registry::{ToolDefinition, ToolHandler};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "set-kv",
        "Set Key Value to storage",
        object_schema(
            json!({
                "key": {"type": "string", "description": "Key to store"},
                "value": {"type": "string", "description": "Value to store"},
                "expirationTtl": {"type": "number", "description": "Optional TTL in seconds"}
            }),
            &["key", "value"],
        ),
    )
}

/// Ten years.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;
#[allow(clippy::cast_precision_loss)]
const MAX_TTL: f64 = MAX_TTL_SECS as f64;

#[derive(Debug, PartialEq, Eq)]
struct TtlOutOfRange;

/// Whole seconds of a positive, finite TTL argument.
///
/// Anything that is not a number of at least one second means "no expiry".
fn ttl_seconds(raw: Option<&Value>) -> Result<Option<u64>, TtlOutOfRange> {
    let Some(seconds) = raw.and_then(Value::as_f64).map(f64::floor) else {
        return Ok(None);
    };
    if !seconds.is_finite() || seconds < 1.0 {
        return Ok(None);
    }
    if seconds > MAX_TTL {
        return Err(TtlOutOfRange);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = seconds as u64;
    Ok(Some(whole))
}

pub struct SetKvTool;

#[async_trait]
impl ToolHandler for SetKvTool {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResponse, Error> {
        let Some(kv) = &ctx.kv else {
            return Ok(not_configured("KV"));
        };

        let key = str_arg(args, "key").unwrap_or_default();
        let value = match str_arg(args, "value") {
            Some(value) if !key.is_empty() => value,
            _ => return Ok(error_response(400, "Invalid key or value")),
        };

        let Ok(ttl) = ttl_seconds(args.get("expirationTtl")) else {
            return Ok(error_response(400, "Invalid expirationTtl"));
        };
        kv.put(key, value, ttl.map(Duration::from_secs)).await?;

        Ok(HandlerResponse::json(
            200,
            &json!({ "ok": true, "key": key, "expirationTtl": ttl }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::MemoryKv;

    #[test]
    fn ttl_rules() {
        assert_eq!(ttl_seconds(Some(&json!(60))), Ok(Some(60)));
        assert_eq!(ttl_seconds(Some(&json!(90.9))), Ok(Some(90)));
        assert_eq!(ttl_seconds(Some(&json!(0.5))), Ok(None));
        assert_eq!(ttl_seconds(Some(&json!(-5))), Ok(None));
        assert_eq!(ttl_seconds(Some(&json!("60"))), Ok(None));
        assert_eq!(ttl_seconds(None), Ok(None));
        assert_eq!(
            ttl_seconds(Some(&json!(MAX_TTL_SECS))),
            Ok(Some(MAX_TTL_SECS))
        );
        assert_eq!(ttl_seconds(Some(&json!(1e300))), Err(TtlOutOfRange));
    }

    #[tokio::test]
    async fn huge_ttl_is_rejected_before_storing() {
        let kv = Arc::new(MemoryKv::default());
        let ctx = ExecutionContext::default().with_kv(kv.clone());
        let args = json!({"key": "a", "value": "1", "expirationTtl": 1e300});

        let resp = SetKvTool
            .invoke(args.as_object().unwrap(), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body_text(), r#"{"error":"Invalid expirationTtl"}"#);
        assert!(kv.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stores_value_with_ttl() {
        let kv = Arc::new(MemoryKv::default());
        let ctx = ExecutionContext::default().with_kv(kv.clone());
        let args = json!({"key": "a", "value": "1", "expirationTtl": 120});

        let resp = SetKvTool
            .invoke(args.as_object().unwrap(), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(
            resp.body_text(),
            r#"{"expirationTtl":120,"key":"a","ok":true}"#
        );

        let entries = kv.entries.lock().unwrap();
        assert_eq!(
            entries.get("a"),
            Some(&("1".to_string(), Some(Duration::from_secs(120))))
        );
    }

    #[tokio::test]
    async fn empty_value_is_allowed() {
        let kv = Arc::new(MemoryKv::default());
        let ctx = ExecutionContext::default().with_kv(kv);
        let args = json!({"key": "a", "value": ""});
        let resp = SetKvTool
            .invoke(args.as_object().unwrap(), &ctx)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["expirationTtl"], Value::Null);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let ctx = ExecutionContext::default().with_kv(Arc::new(MemoryKv::default()));
        for args in [
            json!({"value": "1"}),
            json!({"key": "", "value": "1"}),
            json!({"key": "a"}),
            json!({"key": "a", "value": 1}),
        ] {
            let resp = SetKvTool
                .invoke(args.as_object().unwrap(), &ctx)
                .await
                .unwrap();
            assert_eq!(resp.status, 400, "{args}");
        }
    }

    #[tokio::test]
    async fn missing_kv_is_a_configuration_error() {
        let args = json!({"key": "a", "value": "1"});
        let resp = SetKvTool
            .invoke(args.as_object().unwrap(), &ExecutionContext::default())
            .await
            .unwrap();
        assert_eq!(resp.status, 500);
    }
}
