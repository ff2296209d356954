//! Outbound HTTP, shared by the `http-request` tool and the `POST /request` route.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use url::Url;

use toolbox_core::traits::HttpClient;
use toolbox_core::types::JSON_CONTENT_TYPE;
use toolbox_core::{Error, ExecutionContext, HandlerResponse, OutboundRequest};

use super::{error_response, not_configured, object_schema, str_arg, string_map};
use crate::registry::{ToolDefinition, ToolHandler};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "http-request",
        "Perform an outbound HTTP request with method, headers, query, and body/json.",
        object_schema(
            json!({
                "url": {"type": "string", "description": "Target URL (http/https)"},
                "method": {"type": "string", "description": "HTTP method (default GET)"},
                "headers": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "Request headers"
                },
                "query": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "Query params"
                },
                "body": {"type": "string", "description": "Raw body (mutually exclusive with json)"},
                "json": {"type": "object", "description": "JSON body (mutually exclusive with body)"}
            }),
            &["url"],
        ),
    )
}

/// A rejected or failed outbound request, with the HTTP status to report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HttpRequestError {
    pub status: u16,
    pub message: String,
}

impl HttpRequestError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: 400,
            message: message.to_string(),
        }
    }

    /// `{"error": message}` with the error's status.
    pub fn to_response(&self) -> HandlerResponse {
        error_response(self.status, &self.message)
    }
}

/// Loosely typed input after field coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequestInput {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<String>,
    pub json: Option<Map<String, Value>>,
}

/// Coerce raw arguments. Mistyped optional fields are ignored.
///
/// # Errors
///
/// 400 when `url` is missing or blank, or when both `body` and `json` are given.
pub fn parse_input(input: &Map<String, Value>) -> Result<HttpRequestInput, HttpRequestError> {
    let url = str_arg(input, "url").map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return Err(HttpRequestError::bad_request("Invalid url"));
    }

    let method = str_arg(input, "method")
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map_or_else(|| "GET".to_string(), str::to_ascii_uppercase);

    let body = str_arg(input, "body")
        .filter(|b| !b.is_empty())
        .map(str::to_string);
    let json = input.get("json").and_then(Value::as_object).cloned();

    if body.is_some() && json.is_some() {
        return Err(HttpRequestError::bad_request("Provide either body or json"));
    }

    Ok(HttpRequestInput {
        url: url.to_string(),
        method,
        headers: string_map(input.get("headers")),
        query: string_map(input.get("query")),
        body,
        json,
    })
}

/// Turn parsed input into a request ready to send.
///
/// # Errors
///
/// 400 when the URL does not parse or is not `http`/`https`.
pub fn build_request(input: HttpRequestInput) -> Result<OutboundRequest, HttpRequestError> {
    let mut url =
        Url::parse(&input.url).map_err(|_| HttpRequestError::bad_request("Invalid url"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HttpRequestError::bad_request(
            "Only http/https URLs are supported",
        ));
    }

    if !input.query.is_empty() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !input.query.contains_key(k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .extend_pairs(&input.query);
    }

    let mut headers = input.headers;
    let mut body = match input.json {
        Some(json) => {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                headers.insert("content-type".to_string(), JSON_CONTENT_TYPE.to_string());
            }
            Some(Value::Object(json).to_string())
        }
        None => input.body,
    };

    if matches!(input.method.as_str(), "GET" | "HEAD") {
        body = None;
    }

    Ok(OutboundRequest {
        method: input.method,
        url: url.to_string(),
        headers,
        body,
    })
}

/// Parse, send and summarize one outbound request.
///
/// # Errors
///
/// 400 for invalid input, 502 when the request could not be sent.
pub async fn perform(
    input: &Map<String, Value>,
    http: &dyn HttpClient,
) -> Result<Value, HttpRequestError> {
    let request = build_request(parse_input(input)?)?;
    let url = request.url.clone();
    let method = request.method.clone();

    let response = http.send(request).await.map_err(|err| {
        tracing::warn!(%url, %method, error = %err, "outbound request failed");
        HttpRequestError {
            status: 502,
            message: err.to_string(),
        }
    })?;

    Ok(json!({
        "request": {"url": url, "method": method},
        "response": {
            "status": response.status,
            "ok": response.is_success(),
            "headers": response.headers,
            "body": response.body,
        }
    }))
}

pub struct HttpRequestTool;

#[async_trait]
impl ToolHandler for HttpRequestTool {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResponse, Error> {
        let Some(http) = &ctx.http else {
            return Ok(not_configured("HTTP client"));
        };

        Ok(match perform(args, http.as_ref()).await {
            Ok(summary) => HandlerResponse::json(200, &summary),
            Err(err) => err.to_response(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::CannedHttp;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parse_defaults() {
        let input = parse_input(&args(json!({"url": "  https://example.com  "}))).unwrap();
        assert_eq!(input.url, "https://example.com");
        assert_eq!(input.method, "GET");
        assert!(input.headers.is_empty());
        assert!(input.body.is_none());
        assert!(input.json.is_none());
    }

    #[test]
    fn parse_rejects_missing_url() {
        for raw in [json!({}), json!({"url": "   "}), json!({"url": 5})] {
            let err = parse_input(&args(raw)).unwrap_err();
            assert_eq!(err, HttpRequestError::bad_request("Invalid url"));
        }
    }

    #[test]
    fn parse_rejects_body_and_json() {
        let err = parse_input(&args(json!({
            "url": "https://example.com",
            "body": "raw",
            "json": {"a": 1}
        })))
        .unwrap_err();
        assert_eq!(err.message, "Provide either body or json");
    }

    #[test]
    fn empty_body_does_not_conflict_with_json() {
        let input = parse_input(&args(json!({
            "url": "https://example.com",
            "body": "",
            "json": {"a": 1}
        })))
        .unwrap();
        assert!(input.body.is_none());
        assert!(input.json.is_some());
    }

    #[test]
    fn rejects_other_schemes() {
        let input = parse_input(&args(json!({"url": "ftp://example.com/file"}))).unwrap();
        let err = build_request(input).unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "Only http/https URLs are supported");
    }

    #[test]
    fn rejects_unparseable_url() {
        let input = parse_input(&args(json!({"url": "not a url"}))).unwrap();
        assert_eq!(build_request(input).unwrap_err().message, "Invalid url");
    }

    #[test]
    fn query_replaces_existing_keys() {
        let input = parse_input(&args(json!({
            "url": "https://example.com/search?q=old&page=2",
            "query": {"q": "new", "skip": 7}
        })))
        .unwrap();
        let request = build_request(input).unwrap();
        assert_eq!(request.url, "https://example.com/search?page=2&q=new");
    }

    #[test]
    fn json_body_sets_content_type() {
        let input = parse_input(&args(json!({
            "url": "https://example.com",
            "method": " post ",
            "json": {"a": 1}
        })))
        .unwrap();
        let request = build_request(input).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.body.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some(JSON_CONTENT_TYPE)
        );
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let input = parse_input(&args(json!({
            "url": "https://example.com",
            "method": "PUT",
            "headers": {"Content-Type": "application/vnd.api+json"},
            "json": {}
        })))
        .unwrap();
        let request = build_request(input).unwrap();
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers["Content-Type"], "application/vnd.api+json");
    }

    #[test]
    fn get_never_sends_a_body() {
        let input = parse_input(&args(json!({"url": "https://example.com", "body": "x"}))).unwrap();
        assert!(build_request(input).unwrap().body.is_none());
    }

    #[tokio::test]
    async fn summarizes_the_exchange() {
        let http = CannedHttp::ok(404, "missing");
        let summary = perform(&args(json!({"url": "https://example.com/a"})), &http)
            .await
            .unwrap();

        assert_eq!(summary["request"], json!({"url": "https://example.com/a", "method": "GET"}));
        assert_eq!(summary["response"]["status"], 404);
        assert_eq!(summary["response"]["ok"], false);
        assert_eq!(summary["response"]["body"], "missing");
        assert_eq!(http.last_request().url, "https://example.com/a");
    }

    #[tokio::test]
    async fn transport_failure_is_bad_gateway() {
        let http = Arc::new(CannedHttp::failing("connection refused"));
        let ctx = ExecutionContext::default().with_http(http);
        let resp = HttpRequestTool
            .invoke(&args(json!({"url": "https://example.com"})), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.status, 502);
        assert!(resp.body_text().contains("connection refused"));
    }

    #[tokio::test]
    async fn invalid_input_is_answered_not_raised() {
        let ctx = ExecutionContext::default().with_http(Arc::new(CannedHttp::ok(200, "")));
        let resp = HttpRequestTool
            .invoke(&Map::new(), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body_text(), r#"{"error":"Invalid url"}"#);
    }
}
