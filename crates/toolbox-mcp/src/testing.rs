//! In-memory capabilities for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use toolbox_core::traits::{HttpClient, KvStore};
use toolbox_core::{Error, OutboundRequest, OutboundResponse};

#[derive(Default)]
pub struct MemoryKv {
    pub entries: Mutex<HashMap<String, (String, Option<Duration>)>>,
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), Error> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }
}

/// Answers every request with a canned response and records what it saw.
pub struct CannedHttp {
    pub response: Result<OutboundResponse, String>,
    pub seen: Mutex<Vec<OutboundRequest>>,
}

impl CannedHttp {
    pub fn ok(status: u16, body: &str) -> Self {
        Self {
            response: Ok(OutboundResponse {
                status,
                status_text: if status == 200 { "OK" } else { "Bad Gateway" }.to_string(),
                headers: [("content-type".to_string(), "application/json".to_string())]
                    .into_iter()
                    .collect(),
                body: body.to_string(),
            }),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> OutboundRequest {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl HttpClient for CannedHttp {
    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, Error> {
        self.seen.lock().unwrap().push(request);
        self.response.clone().map_err(Error::Upstream)
    }
}
