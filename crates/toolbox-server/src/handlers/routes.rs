use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use toolbox_mcp::tools::{api as api_tool, hello as hello_tool, http_request};

use crate::app_state::AppState;
use crate::error::ApiError;

const KV_DEFAULT_KEY: &str = "message";
const KV_ROUTE_TTL: Duration = Duration::from_secs(3600);
const BLOB_KEY: &str = "hello.txt";
const BLOB_DEFAULT_CONTENT: &str = "Hello R2!";
const DEFAULT_COUNTER: &str = "global";

/// Route index.
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "toolbox server",
        "routes": [
            "/hello",
            "/api",
            "/mcp (POST)",
            "/request (POST)",
            "/kv (GET|POST?key=...)",
            "/d1",
            "/r2 (GET|POST)",
            "/counter",
            "/counter/incr",
            "/v1/models (GET)",
            "/v1/embeddings (POST)"
        ]
    }))
}

/// Health check endpoint.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

pub async fn hello(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let name = params.get("name").map(String::as_str);
    Json(hello_tool::greeting_payload(
        &state.context().greeting,
        name,
        "/hello",
    ))
}

pub async fn api(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    Json(api_tool::echo_payload(
        method.as_str(),
        &query,
        &state.context().greeting,
    ))
}

/// Proxy one outbound HTTP request described by the JSON body.
#[allow(clippy::missing_errors_doc)]
pub async fn outbound_request(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let payload: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;
    let Value::Object(input) = payload else {
        return Err(ApiError::BadRequest("Invalid payload".to_string()));
    };

    let http = state
        .context()
        .http
        .clone()
        .ok_or(ApiError::NotConfigured("HTTP client"))?;
    let summary = http_request::perform(&input, http.as_ref()).await?;
    Ok(Json(summary))
}

/// Read (`GET`) or write (`POST`) one key-value entry.
#[allow(clippy::missing_errors_doc)]
pub async fn kv(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let kv = state
        .context()
        .kv
        .clone()
        .ok_or(ApiError::NotConfigured("KV"))?;
    let key = params
        .get("key")
        .map_or(KV_DEFAULT_KEY, String::as_str)
        .to_string();

    match method {
        Method::GET => {
            let value = kv.get(&key).await?;
            Ok(Json(json!({ "key": key, "value": value })).into_response())
        }
        Method::POST => {
            let value = String::from_utf8_lossy(&body);
            kv.put(&key, &value, Some(KV_ROUTE_TTL)).await?;
            Ok(format!("Saved to KV (TTL {}s)", KV_ROUTE_TTL.as_secs()).into_response())
        }
        _ => Err(ApiError::MethodNotAllowed),
    }
}

/// Database clock.
#[allow(clippy::missing_errors_doc)]
pub async fn d1(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = state
        .context()
        .rows
        .clone()
        .ok_or(ApiError::NotConfigured("Database"))?;
    let now = rows.now().await?;
    Ok(Json(json!({ "now": now })))
}

/// Store (`POST`) or fetch (`GET`) the `hello.txt` blob.
#[allow(clippy::missing_errors_doc)]
pub async fn r2(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Response, ApiError> {
    let blobs = state
        .context()
        .blobs
        .clone()
        .ok_or(ApiError::NotConfigured("Blob storage"))?;

    if method == Method::POST {
        let content: &[u8] = if body.is_empty() {
            BLOB_DEFAULT_CONTENT.as_bytes()
        } else {
            &body
        };
        blobs.put(BLOB_KEY, content).await?;
        return Ok(format!("Saved {BLOB_KEY} to blob storage").into_response());
    }

    let bytes = blobs
        .get(BLOB_KEY)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{BLOB_KEY} not found")))?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(Json(json!({ "content": content })).into_response())
}

fn counter_name(params: &HashMap<String, String>) -> &str {
    params.get("name").map_or(DEFAULT_COUNTER, String::as_str)
}

/// Current value of a named counter, as text.
#[allow(clippy::missing_errors_doc)]
pub async fn counter(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, (StatusCode, String)> {
    let counters = state.context().counters.clone().ok_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        "Counters not configured".to_string(),
    ))?;

    let value = counters
        .get(counter_name(&params))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(value.to_string())
}

/// Increment a named counter and return the new value, as text.
#[allow(clippy::missing_errors_doc)]
pub async fn counter_incr(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, (StatusCode, String)> {
    let counters = state.context().counters.clone().ok_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        "Counters not configured".to_string(),
    ))?;

    let value = counters
        .increment(counter_name(&params))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(value.to_string())
}
