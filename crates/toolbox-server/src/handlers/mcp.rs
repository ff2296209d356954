use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Response, Sse},
    Json,
};
use serde_json::Value;
use toolbox_mcp::{JsonRpcError, JsonRpcResponse};

use crate::app_state::AppState;

const EVENT_STREAM: &str = "text/event-stream";

/// Whether the client asked for a Server-Sent-Events reply.
pub fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains(EVENT_STREAM))
}

/// JSON-RPC endpoint.
///
/// Only `POST` is served. The reply is a JSON body, or a single `message`
/// event when the client accepts `text/event-stream`; the stream closes
/// right after it. JSON-RPC failures are reported inside the envelope, so
/// the HTTP status is always 200. A body that cannot be read (too large,
/// aborted) is answered as a parse error.
pub async fn mcp(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    }

    let response = match body {
        Ok(body) => state.engine.handle_body(&body).await,
        Err(rejection) => {
            tracing::warn!(status = %rejection.status(), "unreadable JSON-RPC body");
            JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::parse_error(rejection.body_text()),
            )
        }
    };

    if !wants_event_stream(&headers) {
        return Json(response).into_response();
    }

    let event = Event::default().event("message").data(response.to_json());
    let stream = tokio_stream::once(Ok::<_, Infallible>(event));

    let mut resp = Sse::new(stream).into_response();
    resp.headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_negotiation() {
        let mut headers = HeaderMap::new();
        assert!(!wants_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_event_stream(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        assert!(wants_event_stream(&headers));
    }
}
