use async_trait::async_trait;
use serde_json::{json, Value};

use toolbox_core::error::Error;
use toolbox_core::traits::EmbeddingBackend;

/// Embedding models hosted behind a `<base_url>/<model>` REST endpoint.
///
/// The body sent is `{"text": [...]}`; a `result` wrapper in the reply is
/// unwrapped.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingBackend {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpEmbeddingBackend {
    pub fn new(client: reqwest::Client, base_url: &str, api_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model.trim_start_matches('/'))
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn run(&self, model: &str, input: &[String]) -> Result<Value, Error> {
        let resp = self
            .client
            .post(self.model_url(model))
            .bearer_auth(&self.api_token)
            .json(&json!({ "text": input }))
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(model, status = status.as_u16(), "embedding backend rejected request");
            return Err(Error::Upstream(format!("backend returned {status}: {body}")));
        }

        let mut payload: Value = resp
            .json()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        if let Some(result) = payload.get_mut("result") {
            return Ok(result.take());
        }
        Ok(payload)
    }
}
