use crate::sources::LoadedData;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct StoreInner {
    snapshot: Option<LoadedData>,
    error: Option<String>,
    last_fetch: Option<DateTime<Utc>>,
    loads: u64,
    consecutive_failures: u32,
}

/// Latest result of the data source, shared between the load task and the
/// view loop.
#[derive(Clone, Default)]
pub struct DataStore {
    inner: Arc<RwLock<StoreInner>>,
}

/// Point-in-time copy of the store for rendering.
#[derive(Debug, Clone)]
pub struct StoreSummary {
    pub snapshot: Option<LoadedData>,
    pub error: Option<String>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub loads: u64,
    pub consecutive_failures: u32,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update_snapshot(&self, data: LoadedData) {
        let mut inner = self.inner.write().await;
        inner.last_fetch = Some(data.fetched_at);
        inner.snapshot = Some(data);
        inner.error = None;
        inner.loads += 1;
        inner.consecutive_failures = 0;
    }

    /// Keeps the last good snapshot so the view can still show stale data.
    pub async fn set_error(&self, error: String) {
        let mut inner = self.inner.write().await;
        inner.error = Some(error);
        inner.loads += 1;
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
    }

    pub async fn summary(&self) -> StoreSummary {
        let inner = self.inner.read().await;
        StoreSummary {
            snapshot: inner.snapshot.clone(),
            error: inner.error.clone(),
            last_fetch: inner.last_fetch,
            loads: inner.loads,
            consecutive_failures: inner.consecutive_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_data(body: &str) -> LoadedData {
        LoadedData::new("test".to_string(), body.to_string(), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_store_update_and_get() {
        let store = DataStore::new();
        store.update_snapshot(make_data("hello")).await;

        let summary = store.summary().await;
        assert_eq!(summary.snapshot.unwrap().body, "hello");
        assert!(summary.error.is_none());
        assert!(summary.last_fetch.is_some());
        assert_eq!(summary.loads, 1);
    }

    #[tokio::test]
    async fn test_error_keeps_previous_snapshot() {
        let store = DataStore::new();
        store.update_snapshot(make_data("hello")).await;
        store.set_error("connection refused".to_string()).await;
        store.set_error("connection refused".to_string()).await;

        let summary = store.summary().await;
        assert!(summary.snapshot.is_some());
        assert_eq!(summary.error.as_deref(), Some("connection refused"));
        assert_eq!(summary.consecutive_failures, 2);
        assert_eq!(summary.loads, 3);
    }

    #[tokio::test]
    async fn test_success_clears_error() {
        let store = DataStore::new();
        store.set_error("timeout".to_string()).await;
        store.update_snapshot(make_data("ok")).await;

        let summary = store.summary().await;
        assert!(summary.error.is_none());
        assert_eq!(summary.consecutive_failures, 0);
    }
}
