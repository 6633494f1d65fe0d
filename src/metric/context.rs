use chrono::{DateTime, Utc};

use crate::metric_source::QueryCache;

/// Everything a metric needs from the report run it is evaluated in.
#[derive(Debug, Clone)]
pub struct RunContext {
    now: DateTime<Utc>,
    cache: QueryCache,
}

impl RunContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_cache(now, QueryCache::new())
    }

    pub fn with_cache(now: DateTime<Utc>, cache: QueryCache) -> Self {
        Self { now, cache }
    }

    /// Run timestamp. Dynamic debt targets and date facts are evaluated at
    /// this instant, never at the wall clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}
