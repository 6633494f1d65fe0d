use moka::future::Cache;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{FactRequest, FactValue, MetricSource};
use crate::observability::{SourceQueryMetrics, SourceQueryStats};

type QueryKey = (String, FactRequest, Vec<String>);

/// Per-run memo of metric source answers.
///
/// Identical queries issued concurrently are coalesced into one source call.
/// Failed calls are logged and cached as unknown so the run neither retries
/// them nor aborts.
#[derive(Debug, Clone)]
pub struct QueryCache {
    cache: Cache<QueryKey, Option<FactValue>>,
    metrics: Arc<SourceQueryMetrics>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(10_000).build(),
            metrics: Arc::new(SourceQueryMetrics::new()),
        }
    }

    /// Answer `request` from `source`, or `None` when the source could not.
    pub async fn fact(
        &self,
        source: &Arc<dyn MetricSource>,
        request: &FactRequest,
        ids: &[String],
    ) -> Option<FactValue> {
        let key = (source.id().to_string(), request.clone(), ids.to_vec());
        let entry = self
            .cache
            .entry(key)
            .or_insert_with(self.query(source, request, ids))
            .await;

        if entry.is_fresh() {
            self.metrics.record_cache_miss();
        } else {
            self.metrics.record_cache_hit();
            debug!(source = source.id(), fact = %request.fact, "Metric source cache hit");
        }
        entry.into_value()
    }

    async fn query(
        &self,
        source: &Arc<dyn MetricSource>,
        request: &FactRequest,
        ids: &[String],
    ) -> Option<FactValue> {
        self.metrics.record_query();
        match source.fact(request, ids).await {
            Ok(value) => Some(value),
            Err(error) => {
                self.metrics.record_failure();
                warn!(
                    source = source.id(),
                    fact = %request.fact,
                    ids = ?ids,
                    error = %error,
                    "Metric source query failed, value is unknown"
                );
                None
            }
        }
    }

    pub fn stats(&self) -> SourceQueryStats {
        self.metrics.get_stats()
    }

    pub fn log_stats(&self) {
        self.metrics.log_stats();
    }
}
