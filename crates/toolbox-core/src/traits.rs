use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;
use crate::types::{OutboundRequest, OutboundResponse};

/// String key-value storage with optional expiry.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Insert or overwrite a value. `ttl` of `None` never expires.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), Error>;
}

/// Relational database access.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// The database clock formatted as `YYYY-MM-DD HH:MM:SS` (UTC).
    async fn now(&self) -> Result<String, Error>;
}

/// Binary object storage keyed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), Error>;
}

/// Named counters that survive restarts.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current value, `0` for a counter that was never incremented.
    async fn get(&self, name: &str) -> Result<i64, Error>;

    /// Atomically add one and return the new value.
    async fn increment(&self, name: &str) -> Result<i64, Error>;
}

/// Outbound HTTP.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a request. Non-2xx statuses are `Ok`; only transport failures error.
    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, Error>;
}

/// Text embedding model host.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Run `model` over `input` and return the backend's raw result payload.
    async fn run(&self, model: &str, input: &[String]) -> Result<Value, Error>;
}
