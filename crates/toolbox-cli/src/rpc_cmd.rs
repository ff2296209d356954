use reqwest::{header, Client};
use reqwest_eventsource::{Event, EventSource};
use serde_json::Value;
use tokio_stream::StreamExt;

use toolbox_mcp::{JsonRpcRequest, JsonRpcResponse};

/// Build a request with a fresh id.
pub fn build_request(method: &str, params: Option<Value>) -> JsonRpcRequest {
    JsonRpcRequest::new(uuid::Uuid::new_v4().to_string(), method, params)
}

/// Parse `--args`; it must be a JSON object.
pub fn parse_arguments(raw: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("--args is not valid JSON: {e}"))?;
    if !value.is_object() {
        anyhow::bail!("--args must be a JSON object");
    }
    Ok(value)
}

/// Text to print for a response, or the error to report.
///
/// Tool results print their text items one per line; other results print as
/// pretty JSON.
pub fn render(response: &JsonRpcResponse) -> anyhow::Result<String> {
    if let Some(error) = response.error_object() {
        let detail = error
            .data
            .as_ref()
            .map(|d| format!(": {}", d.as_str().map_or_else(|| d.to_string(), str::to_string)))
            .unwrap_or_default();
        anyhow::bail!("{} ({}){detail}", error.message, error.code);
    }

    let result = response.result().cloned().unwrap_or(Value::Null);
    if let Some(items) = result.get("content").and_then(Value::as_array) {
        let texts: Vec<&str> = items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect();
        let mut out = texts.join("\n");
        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            out.insert_str(0, "[tool error] ");
        }
        return Ok(out);
    }

    Ok(serde_json::to_string_pretty(&result)?)
}

/// Send one request and print the reply.
pub async fn run(
    server_url: &str,
    method: &str,
    params: Option<Value>,
    sse: bool,
) -> anyhow::Result<()> {
    let client = Client::new();
    let endpoint = format!("{}/mcp", server_url.trim_end_matches('/'));
    let request = build_request(method, params);
    tracing::debug!(%endpoint, method, id = %request.id, sse, "sending request");

    let response = if sse {
        call_sse(&client, &endpoint, &request).await?
    } else {
        call_json(&client, &endpoint, &request).await?
    };

    println!("{}", render(&response)?);
    Ok(())
}

async fn call_json(
    client: &Client,
    endpoint: &str,
    request: &JsonRpcRequest,
) -> anyhow::Result<JsonRpcResponse> {
    let resp = client.post(endpoint).json(request).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await?;
        anyhow::bail!("Server returned {status}: {body}");
    }
    Ok(resp.json().await?)
}

/// Ask for an event-stream reply and take its single `message` event.
async fn call_sse(
    client: &Client,
    endpoint: &str,
    request: &JsonRpcRequest,
) -> anyhow::Result<JsonRpcResponse> {
    let builder = client
        .post(endpoint)
        .header(header::ACCEPT, "application/json, text/event-stream")
        .json(request);
    let mut es = EventSource::new(builder)?;

    while let Some(event) = es.next().await {
        match event {
            Ok(Event::Open) => tracing::debug!("event stream opened"),
            Ok(Event::Message(msg)) if msg.event == "message" => {
                es.close();
                return Ok(serde_json::from_str(&msg.data)?);
            }
            Ok(Event::Message(msg)) => tracing::debug!(event = %msg.event, "ignoring event"),
            Err(err) => {
                es.close();
                anyhow::bail!("Event stream error: {err}");
            }
        }
    }

    anyhow::bail!("Event stream ended without a message")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolbox_mcp::JsonRpcError;

    #[test]
    fn requests_get_unique_ids() {
        let a = build_request("ping", None);
        let b = build_request("ping", None);
        assert_ne!(a.id, b.id);
        assert_eq!(a.jsonrpc, "2.0");
    }

    #[test]
    fn arguments_must_be_an_object() {
        assert_eq!(parse_arguments(r#"{"key": "a"}"#).unwrap(), json!({"key": "a"}));
        assert!(parse_arguments("[1]").is_err());
        assert!(parse_arguments("{oops").is_err());
    }

    #[test]
    fn renders_tool_text() {
        let resp = JsonRpcResponse::success(
            json!(1),
            json!({"content": [{"type": "text", "text": "Ping successful!"}], "isError": false}),
        );
        assert_eq!(render(&resp).unwrap(), "Ping successful!");
    }

    #[test]
    fn marks_tool_errors() {
        let resp = JsonRpcResponse::success(
            json!(1),
            json!({"content": [{"type": "text", "text": "{\"error\":\"Invalid key\"}"}], "isError": true}),
        );
        assert_eq!(render(&resp).unwrap(), "[tool error] {\"error\":\"Invalid key\"}");
    }

    #[test]
    fn renders_other_results_as_json() {
        let resp = JsonRpcResponse::success(json!(1), json!({"ok": true}));
        assert_eq!(render(&resp).unwrap(), "{\n  \"ok\": true\n}");
    }

    #[test]
    fn protocol_errors_fail() {
        let resp = JsonRpcResponse::error(
            json!(1),
            JsonRpcError::server_error("Unknown tool: nope"),
        );
        let err = render(&resp).unwrap_err();
        assert_eq!(err.to_string(), "Server error (-32000): Unknown tool: nope");
    }
}
