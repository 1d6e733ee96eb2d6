use std::time::Duration;

use moka::future::Cache;

use crate::vendor::FetchRequest;

/// Successful vendor payloads, keyed by vendor and request.
///
/// Failures are never stored, so a flaky vendor is retried on the next call.
pub struct ResultCache {
    inner: Cache<String, serde_json::Value>,
}

impl ResultCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn lookup(&self, vendor: &str, request: &FetchRequest) -> Option<serde_json::Value> {
        self.inner.get(&request.cache_key(vendor)).await
    }

    pub async fn store(&self, vendor: &str, request: &FetchRequest, value: serde_json::Value) {
        self.inner.insert(request.cache_key(vendor), value).await;
    }
}
