use std::fmt;
use std::sync::Arc;

use crate::traits::{BlobStore, CounterStore, HttpClient, KvStore, RowStore};

pub const DEFAULT_GREETING: &str = "Hello";

/// External capabilities handed to a tool handler at invocation time.
///
/// Every capability is optional. A handler whose capability is missing must
/// answer with a configuration-error response rather than fail.
#[derive(Clone)]
pub struct ExecutionContext {
    pub greeting: Arc<str>,
    pub kv: Option<Arc<dyn KvStore>>,
    pub rows: Option<Arc<dyn RowStore>>,
    pub blobs: Option<Arc<dyn BlobStore>>,
    pub http: Option<Arc<dyn HttpClient>>,
    pub counters: Option<Arc<dyn CounterStore>>,
}

impl ExecutionContext {
    /// A context with the given greeting and no capabilities.
    #[must_use]
    pub fn new(greeting: impl Into<Arc<str>>) -> Self {
        Self {
            greeting: greeting.into(),
            kv: None,
            rows: None,
            blobs: None,
            http: None,
            counters: None,
        }
    }

    #[must_use]
    pub fn with_kv(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    #[must_use]
    pub fn with_rows(mut self, rows: Arc<dyn RowStore>) -> Self {
        self.rows = Some(rows);
        self
    }

    #[must_use]
    pub fn with_blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    #[must_use]
    pub fn with_http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    #[must_use]
    pub fn with_counters(mut self, counters: Arc<dyn CounterStore>) -> Self {
        self.counters = Some(counters);
        self
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("greeting", &self.greeting)
            .field("kv", &self.kv.is_some())
            .field("rows", &self.rows.is_some())
            .field("blobs", &self.blobs.is_some())
            .field("http", &self.http.is_some())
            .field("counters", &self.counters.is_some())
            .finish()
    }
}
