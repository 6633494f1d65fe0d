// In-memory metric source for tests. Answers from a fixed fact table and
// records every call it receives.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{ensure_capability, Capability, FactRequest, FactValue, MetricSource, SourceError};

#[derive(Debug)]
pub struct FakeSource {
    id: String,
    name: String,
    url: String,
    capabilities: Vec<Capability>,
    facts: HashMap<String, FactValue>,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(FactRequest, Vec<String>)>>,
}

impl FakeSource {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            url: format!("https://{id}.example.org"),
            capabilities: vec![
                Capability::Count,
                Capability::Percentage,
                Capability::Flag,
                Capability::Date,
            ],
            facts: HashMap::new(),
            failing: false,
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn with_number(mut self, fact: &str, value: f64) -> Self {
        self.facts.insert(fact.to_string(), FactValue::Number(value));
        self
    }

    pub fn with_flag(mut self, fact: &str, value: bool) -> Self {
        self.facts.insert(fact.to_string(), FactValue::Flag(value));
        self
    }

    pub fn with_date(mut self, fact: &str, value: DateTime<Utc>) -> Self {
        self.facts.insert(fact.to_string(), FactValue::Date(value));
        self
    }

    /// Every call fails with a connection error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(FactRequest, Vec<String>)> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MetricSource for FakeSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn metric_source_urls(&self, ids: &[String]) -> Vec<String> {
        ids.iter().map(|id| format!("{}/{id}", self.url)).collect()
    }

    async fn fact(&self, request: &FactRequest, ids: &[String]) -> Result<FactValue, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((request.clone(), ids.to_vec()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        ensure_capability(self, request)?;
        if self.failing {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{} is down", self.name),
            )));
        }
        self.facts
            .get(&request.fact)
            .cloned()
            .ok_or_else(|| SourceError::UnknownFact(request.fact.clone()))
    }
}
