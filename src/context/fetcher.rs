//! Concurrent context fetching.
//!
//! One independent read per relevant category, all issued together and
//! joined before formatting, so turn latency is bounded by the slowest
//! single read. A failed or timed-out read degrades that category to "no
//! data"; it never aborts the turn and is never retried.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::context::ContextCategory;
use crate::store::{ContextRecord, DataStore, FetchFilter};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2_000);

pub struct ContextFetcher {
    store: Arc<dyn DataStore>,
    read_timeout: Duration,
}

impl ContextFetcher {
    pub fn new(store: Arc<dyn DataStore>, read_timeout: Duration) -> Self {
        Self {
            store,
            read_timeout,
        }
    }

    /// Fan out one read per category and join on all of them.
    ///
    /// Every requested category appears in the result; degraded categories
    /// map to an empty record list.
    pub async fn fetch_all(
        &self,
        categories: &[ContextCategory],
        now: DateTime<Utc>,
    ) -> HashMap<ContextCategory, Vec<ContextRecord>> {
        let reads = categories.iter().map(|&category| {
            let store = self.store.clone();
            let read_timeout = self.read_timeout;
            async move {
                let filter = FetchFilter::for_category(category, now);
                match timeout(read_timeout, store.fetch_many(category, &filter)).await {
                    Ok(Ok(records)) => (category, records),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            "Context read for {} failed, continuing without it: {}",
                            category.as_db_str(),
                            e
                        );
                        (category, Vec::new())
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Context read for {} timed out after {:?}, continuing without it",
                            category.as_db_str(),
                            read_timeout
                        );
                        (category, Vec::new())
                    }
                }
            }
        });

        join_all(reads).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use serde_json::Value;

    use crate::guided::GuidedSession;

    /// Store stub with per-category behavior: records, an error, or a stall.
    #[derive(Default)]
    struct StubStore {
        slow: Vec<ContextCategory>,
        failing: Vec<ContextCategory>,
    }

    fn stub_record(category: ContextCategory) -> ContextRecord {
        ContextRecord {
            id: format!("{}-1", category.as_db_str()),
            title: "stub".to_string(),
            body: "data".to_string(),
            kind: None,
            priority: None,
            target: None,
            current: None,
            occurred_at: Some(Utc::now()),
        }
    }

    #[async_trait]
    impl DataStore for StubStore {
        async fn fetch_many(
            &self,
            category: ContextCategory,
            _filter: &FetchFilter,
        ) -> Result<Vec<ContextRecord>> {
            if self.slow.contains(&category) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.failing.contains(&category) {
                bail!("backend unavailable");
            }
            Ok(vec![stub_record(category)])
        }

        async fn write_step_data(&self, _: &str, _: &str, _: &Value) -> Result<()> {
            Ok(())
        }

        async fn read_session(&self, _: &str) -> Result<Option<GuidedSession>> {
            Ok(None)
        }

        async fn write_session(&self, _: &GuidedSession) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_read_degrades_to_empty_while_fast_reads_survive() {
        let store = Arc::new(StubStore {
            slow: vec![ContextCategory::RecentJournal],
            failing: vec![],
        });
        let fetcher = ContextFetcher::new(store, Duration::from_millis(50));

        let categories = [
            ContextCategory::Principles,
            ContextCategory::RecentJournal,
            ContextCategory::Victories,
        ];
        let fetched = fetcher.fetch_all(&categories, Utc::now()).await;

        assert_eq!(fetched.len(), 3);
        assert_eq!(fetched[&ContextCategory::Principles].len(), 1);
        assert!(fetched[&ContextCategory::RecentJournal].is_empty());
        assert_eq!(fetched[&ContextCategory::Victories].len(), 1);
    }

    #[tokio::test]
    async fn failed_read_degrades_to_empty() {
        let store = Arc::new(StubStore {
            slow: vec![],
            failing: vec![ContextCategory::TasksToday],
        });
        let fetcher = ContextFetcher::new(store, DEFAULT_READ_TIMEOUT);

        let categories = [ContextCategory::TasksToday, ContextCategory::Plans];
        let fetched = fetcher.fetch_all(&categories, Utc::now()).await;

        assert!(fetched[&ContextCategory::TasksToday].is_empty());
        assert_eq!(fetched[&ContextCategory::Plans].len(), 1);
    }

    #[tokio::test]
    async fn every_requested_category_is_present_in_the_result() {
        let store = Arc::new(StubStore::default());
        let fetcher = ContextFetcher::new(store, DEFAULT_READ_TIMEOUT);

        let fetched = fetcher.fetch_all(&ContextCategory::ALL, Utc::now()).await;
        assert_eq!(fetched.len(), ContextCategory::ALL.len());
    }
}
