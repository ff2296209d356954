//! OpenAI-compatible embeddings API, served under `/v1` and `/openai/v1`.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use crate::app_state::AppState;

pub const DEFAULT_RESPONSE_MODEL: &str = "bge-m3";
pub const DEFAULT_BACKEND_MODEL: &str = "@cf/baai/bge-m3";

const HOSTED_PREFIX: &str = "@cf/";

/// OpenAI model names and the backend model each maps to.
const MODEL_ALIASES: [(&str, &str); 4] = [
    ("text-embedding-3-small", "@cf/google/embeddinggemma-300m"),
    ("text-embedding-3-large", "@cf/google/embeddinggemma-300m"),
    ("text-embedding-ada-002", "@cf/google/embeddinggemma-300m"),
    ("bge-m3", "@cf/baai/bge-m3"),
];

/// Error in the OpenAI wire shape: `{"error": {message, type, param, code}}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct OpenAiError {
    pub status: StatusCode,
    pub message: String,
    pub kind: &'static str,
    pub param: Option<&'static str>,
    pub code: Option<&'static str>,
}

impl OpenAiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            kind,
            param: None,
            code: None,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request_error", message)
    }

    fn server(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, "server_error", message)
    }

    fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication_error", message)
            .param("authorization")
            .code("invalid_api_key")
    }

    fn method_not_allowed(message: &str) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "invalid_request_error", message).param("method")
    }

    fn param(mut self, param: &'static str) -> Self {
        self.param = Some(param);
        self
    }

    fn code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

impl IntoResponse for OpenAiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.message,
                "type": self.kind,
                "param": self.param,
                "code": self.code,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

/// Model names for one embedding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    /// Echoed back to the client.
    pub response_model: String,
    /// Sent to the backend.
    pub backend_model: String,
}

/// Entry point for every `/v1/*` and `/openai/v1/*` request.
pub async fn openai(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match route(&state, &method, uri.path(), &headers, &body).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => {
            tracing::debug!(status = err.status.as_u16(), error = %err, "openai request rejected");
            err.into_response()
        }
    }
}

async fn route(
    state: &AppState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Value, OpenAiError> {
    require_bearer(headers, state.openai.api_key.as_deref())?;

    let configured = state.openai.embedding_model.as_deref();
    match normalize_path(path) {
        "/v1/models" => {
            if *method != Method::GET {
                return Err(OpenAiError::method_not_allowed(
                    "Method not allowed. Use GET for /v1/models.",
                ));
            }
            Ok(list_models(configured, chrono::Utc::now().timestamp()))
        }
        "/v1/embeddings" => {
            if *method != Method::POST {
                return Err(OpenAiError::method_not_allowed(
                    "Method not allowed. Use POST for /v1/embeddings.",
                ));
            }
            embeddings(state, body).await
        }
        other => Err(
            OpenAiError::new(
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                format!("Unsupported OpenAI endpoint '{other}'."),
            )
            .param("path")
            .code("not_found"),
        ),
    }
}

fn normalize_path(path: &str) -> &str {
    path.strip_prefix("/openai").unwrap_or(path)
}

/// Check `Authorization: Bearer <key>`; `None` disables the check.
///
/// The scheme is matched case-insensitively.
///
/// # Errors
///
/// 401 `invalid_api_key` when the header is missing or the key differs.
pub fn require_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), OpenAiError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let token = authorization
        .get(..7)
        .filter(|scheme| scheme.eq_ignore_ascii_case("bearer "))
        .map(|_| authorization[7..].trim())
        .ok_or_else(|| OpenAiError::unauthorized("Missing bearer token."))?;

    if token != expected {
        return Err(OpenAiError::unauthorized("Invalid API key."));
    }
    Ok(())
}

/// `/v1/models` payload: aliases, then the configured and default backend models.
pub fn list_models(configured: Option<&str>, created: i64) -> Value {
    let mut ids: Vec<&str> = MODEL_ALIASES.iter().map(|(alias, _)| *alias).collect();
    for id in [configured.unwrap_or(DEFAULT_BACKEND_MODEL), DEFAULT_BACKEND_MODEL] {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let data: Vec<Value> = ids
        .into_iter()
        .map(|id| {
            let owned_by = if id.starts_with(HOSTED_PREFIX) {
                "cloudflare"
            } else {
                "openai-compatible"
            };
            json!({ "id": id, "object": "model", "created": created, "owned_by": owned_by })
        })
        .collect();

    json!({ "object": "list", "data": data })
}

/// Map the requested model onto a backend model.
///
/// # Errors
///
/// 400 for a blank or non-string model, 400 `model_not_found` for an unknown alias.
pub fn resolve_model(
    requested: Option<&Value>,
    configured: Option<&str>,
) -> Result<ResolvedModel, OpenAiError> {
    let requested = match requested {
        None | Some(Value::Null) => {
            return Ok(ResolvedModel {
                response_model: DEFAULT_RESPONSE_MODEL.to_string(),
                backend_model: configured.unwrap_or(DEFAULT_BACKEND_MODEL).to_string(),
            });
        }
        Some(Value::String(model)) if !model.trim().is_empty() => model.trim(),
        Some(_) => {
            return Err(
                OpenAiError::invalid_request("Field `model` must be a non-empty string.")
                    .param("model"),
            );
        }
    };

    if requested.starts_with(HOSTED_PREFIX) {
        return Ok(ResolvedModel {
            response_model: requested.to_string(),
            backend_model: requested.to_string(),
        });
    }

    let Some((_, target)) = MODEL_ALIASES.iter().find(|(alias, _)| *alias == requested) else {
        let supported: Vec<&str> = MODEL_ALIASES.iter().map(|(alias, _)| *alias).collect();
        return Err(OpenAiError::invalid_request(format!(
            "Unsupported model '{requested}'. Supported aliases: {}, or any {HOSTED_PREFIX}* model id.",
            supported.join(", ")
        ))
        .param("model")
        .code("model_not_found"));
    };

    Ok(ResolvedModel {
        response_model: requested.to_string(),
        backend_model: configured.unwrap_or(*target).to_string(),
    })
}

/// Accept a string or a non-empty array of strings.
///
/// # Errors
///
/// 400 with `param: "input"` for anything else.
pub fn normalize_input(input: Option<&Value>) -> Result<Vec<String>, OpenAiError> {
    match input {
        Some(Value::String(text)) => Ok(vec![text.clone()]),
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                OpenAiError::invalid_request("All `input` array items must be strings.")
                    .param("input")
            }),
        _ => Err(OpenAiError::invalid_request(
            "Field `input` must be a string or a non-empty array of strings.",
        )
        .param("input")),
    }
}

/// Pull `data: [[f64]]` out of a backend payload. Empty or malformed yields `None`.
pub fn extract_embeddings(payload: &Value) -> Option<Vec<Vec<f64>>> {
    let rows = payload.get("data")?.as_array()?;
    if rows.is_empty() {
        return None;
    }
    rows.iter()
        .map(|row| row.as_array()?.iter().map(Value::as_f64).collect())
        .collect()
}

async fn embeddings(state: &AppState, body: &[u8]) -> Result<Value, OpenAiError> {
    let Some(backend) = &state.embeddings else {
        return Err(OpenAiError::server(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Embedding backend is not configured. Set EMBEDDING_BASE_URL and EMBEDDING_API_TOKEN.",
        )
        .param("backend")
        .code("embedding_backend_missing"));
    };

    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| OpenAiError::invalid_request(format!("Invalid JSON body: {e}")))?;
    let Value::Object(payload) = payload else {
        return Err(OpenAiError::invalid_request("Request body must be a JSON object."));
    };

    check_encoding_format(&payload)?;
    let input = normalize_input(payload.get("input"))?;
    let model = resolve_model(payload.get("model"), state.openai.embedding_model.as_deref())?;

    let raw = backend
        .run(&model.backend_model, &input)
        .await
        .map_err(|e| {
            tracing::warn!(model = %model.backend_model, error = %e, "embedding backend failed");
            OpenAiError::server(
                StatusCode::BAD_GATEWAY,
                format!("Embedding backend request failed: {e}"),
            )
            .param("model")
            .code("embedding_backend_error")
        })?;

    let vectors = extract_embeddings(&raw).ok_or_else(|| {
        OpenAiError::server(
            StatusCode::BAD_GATEWAY,
            "Embedding backend returned an unexpected payload.",
        )
        .param("response")
        .code("invalid_embedding_response")
    })?;

    let data: Vec<Value> = vectors
        .into_iter()
        .enumerate()
        .map(|(index, embedding)| json!({ "object": "embedding", "index": index, "embedding": embedding }))
        .collect();

    Ok(json!({
        "object": "list",
        "data": data,
        "model": model.response_model,
        "usage": { "prompt_tokens": 0, "total_tokens": 0 }
    }))
}

fn check_encoding_format(payload: &Map<String, Value>) -> Result<(), OpenAiError> {
    match payload.get("encoding_format") {
        None => Ok(()),
        Some(Value::String(format)) if format == "float" => Ok(()),
        Some(_) => Err(
            OpenAiError::invalid_request("Only encoding_format='float' is supported.")
                .param("encoding_format"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn auth_disabled_without_key() {
        assert!(require_bearer(&HeaderMap::new(), None).is_ok());
    }

    #[test]
    fn auth_scheme_is_case_insensitive() {
        assert!(require_bearer(&bearer("bearer sk-1"), Some("sk-1")).is_ok());
        assert!(require_bearer(&bearer("BEARER  sk-1 "), Some("sk-1")).is_ok());
    }

    #[test]
    fn auth_rejections() {
        let missing = require_bearer(&HeaderMap::new(), Some("sk-1")).unwrap_err();
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing.message, "Missing bearer token.");
        assert_eq!(missing.code, Some("invalid_api_key"));

        let wrong = require_bearer(&bearer("Bearer nope"), Some("sk-1")).unwrap_err();
        assert_eq!(wrong.message, "Invalid API key.");

        let basic = require_bearer(&bearer("Basic sk-1"), Some("sk-1")).unwrap_err();
        assert_eq!(basic.message, "Missing bearer token.");
    }

    #[test]
    fn openai_prefix_is_stripped() {
        assert_eq!(normalize_path("/openai/v1/models"), "/v1/models");
        assert_eq!(normalize_path("/v1/embeddings"), "/v1/embeddings");
    }

    #[test]
    fn models_are_deduplicated_in_order() {
        let list = list_models(None, 0);
        let ids: Vec<&str> = list["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(
            ids,
            vec![
                "text-embedding-3-small",
                "text-embedding-3-large",
                "text-embedding-ada-002",
                "bge-m3",
                "@cf/baai/bge-m3"
            ]
        );
        assert_eq!(list["data"][4]["owned_by"], "cloudflare");
        assert_eq!(list["data"][0]["owned_by"], "openai-compatible");
    }

    #[test]
    fn configured_model_is_listed() {
        let list = list_models(Some("@cf/custom/model"), 0);
        assert_eq!(list["data"].as_array().unwrap().len(), 6);
        assert_eq!(list["data"][4]["id"], "@cf/custom/model");
    }

    #[test]
    fn default_model_resolution() {
        let resolved = resolve_model(None, None).unwrap();
        assert_eq!(resolved.response_model, DEFAULT_RESPONSE_MODEL);
        assert_eq!(resolved.backend_model, DEFAULT_BACKEND_MODEL);

        let resolved = resolve_model(Some(&Value::Null), Some("@cf/x")).unwrap();
        assert_eq!(resolved.backend_model, "@cf/x");
    }

    #[test]
    fn alias_and_hosted_resolution() {
        let resolved = resolve_model(Some(&json!("text-embedding-3-small")), None).unwrap();
        assert_eq!(resolved.response_model, "text-embedding-3-small");
        assert_eq!(resolved.backend_model, "@cf/google/embeddinggemma-300m");

        let resolved = resolve_model(Some(&json!("bge-m3")), Some("@cf/override")).unwrap();
        assert_eq!(resolved.backend_model, "@cf/override");

        let resolved = resolve_model(Some(&json!(" @cf/meta/thing ")), Some("@cf/override")).unwrap();
        assert_eq!(resolved.backend_model, "@cf/meta/thing");
    }

    #[test]
    fn unknown_model_rejected() {
        let err = resolve_model(Some(&json!("gpt-4")), None).unwrap_err();
        assert_eq!(err.code, Some("model_not_found"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = resolve_model(Some(&json!(7)), None).unwrap_err();
        assert_eq!(err.param, Some("model"));
        assert!(err.code.is_none());
    }

    #[test]
    fn input_shapes() {
        assert_eq!(normalize_input(Some(&json!("a"))).unwrap(), vec!["a"]);
        assert_eq!(normalize_input(Some(&json!(["a", "b"]))).unwrap(), vec!["a", "b"]);
        assert!(normalize_input(Some(&json!([]))).is_err());
        assert!(normalize_input(Some(&json!(["a", 1]))).is_err());
        assert!(normalize_input(None).is_err());
    }

    #[test]
    fn embedding_extraction() {
        assert_eq!(
            extract_embeddings(&json!({"shape": [2, 2], "data": [[0.1, 0.2], [1, 2]]})),
            Some(vec![vec![0.1, 0.2], vec![1.0, 2.0]])
        );
        assert_eq!(extract_embeddings(&json!({"data": []})), None);
        assert_eq!(extract_embeddings(&json!({"data": [["x"]]})), None);
        assert_eq!(extract_embeddings(&json!({"data": [0.1]})), None);
        assert_eq!(extract_embeddings(&json!([[0.1]])), None);
    }
}
