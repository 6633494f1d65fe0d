use serde::Serialize;
use std::ops::Index;
use std::sync::Arc;

use crate::domain::Subject;
use crate::metric::Metric;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionHeader {
    pub id_prefix: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl SectionHeader {
    pub fn new(id_prefix: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
            title: title.into(),
            subtitle: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

/// Titled group of metrics. Metric ids are the section prefix plus the
/// 1-based position, so construction order is the id namespace.
#[derive(Debug)]
pub struct Section {
    header: SectionHeader,
    metrics: Vec<Metric>,
    product: Option<Arc<Subject>>,
}

impl Section {
    pub fn new(header: SectionHeader, mut metrics: Vec<Metric>) -> Self {
        for (index, metric) in metrics.iter_mut().enumerate() {
            metric.set_id(format!("{}-{}", header.id_prefix, index + 1));
        }
        Self {
            header,
            metrics,
            product: None,
        }
    }

    pub fn with_product(mut self, product: Arc<Subject>) -> Self {
        self.product = Some(product);
        self
    }

    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    pub fn id_prefix(&self) -> &str {
        &self.header.id_prefix
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.header.subtitle.as_deref()
    }

    pub fn product(&self) -> Option<&Arc<Subject>> {
        self.product.as_ref()
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn get(&self, id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|metric| metric.id() == id)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Index<usize> for Section {
    type Output = Metric;

    fn index(&self, index: usize) -> &Metric {
        &self.metrics[index]
    }
}
