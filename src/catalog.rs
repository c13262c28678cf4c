//! Metric catalog: which metrics are read from the node and how each one is
//! combined across resources and differenced across intervals.

use std::collections::HashSet;

/// How several raw readings landing in the same namespace are folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinePolicy {
    /// Add every reading (request counts, pending tasks).
    Sum,
    /// Keep the largest reading (latency percentiles).
    Max,
}

/// Static description of a single output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDefinition {
    /// MBean `name=` attribute, e.g. `ReadLatency`.
    pub source_name: &'static str,
    /// Attribute read from the MBean, e.g. `Count` or `99thPercentile`.
    pub source_key: &'static str,
    /// Column header and snapshot key. Unique within a catalog.
    pub display_name: &'static str,
    pub combine: CombinePolicy,
    /// Output the interval delta instead of the latest value.
    pub diff: bool,
    /// A nonzero value of this metric alone makes its row worth showing.
    pub significant: bool,
    /// Column width override.
    pub width: Option<usize>,
}

impl MetricDefinition {
    /// Column width: the override if set, otherwise the name plus two spaces.
    pub fn width(&self) -> usize {
        self.width.unwrap_or(self.display_name.len() + 2)
    }
}

/// Metrics shown by default, in column order.
pub const CASSANDRA_METRICS: &[MetricDefinition] = &[
    MetricDefinition {
        source_name: "ReadLatency",
        source_key: "Count",
        display_name: "Reads",
        combine: CombinePolicy::Sum,
        diff: true,
        significant: true,
        width: None,
    },
    MetricDefinition {
        source_name: "RangeLatency",
        source_key: "Count",
        display_name: "Ranges",
        combine: CombinePolicy::Sum,
        diff: true,
        significant: true,
        width: None,
    },
    MetricDefinition {
        source_name: "WriteLatency",
        source_key: "Count",
        display_name: "Writes",
        combine: CombinePolicy::Sum,
        diff: true,
        significant: true,
        width: None,
    },
    MetricDefinition {
        source_name: "ReadLatency",
        source_key: "99thPercentile",
        display_name: "Reads (99%) ms",
        combine: CombinePolicy::Max,
        diff: false,
        significant: false,
        width: None,
    },
    MetricDefinition {
        source_name: "RangeLatency",
        source_key: "99thPercentile",
        display_name: "Ranges (99%) ms",
        combine: CombinePolicy::Max,
        diff: false,
        significant: false,
        width: None,
    },
    MetricDefinition {
        source_name: "WriteLatency",
        source_key: "99thPercentile",
        display_name: "Writes (99%) ms",
        combine: CombinePolicy::Max,
        diff: false,
        significant: false,
        width: None,
    },
    MetricDefinition {
        source_name: "PendingCompactions",
        source_key: "Value",
        display_name: "Compactions",
        combine: CombinePolicy::Sum,
        diff: false,
        significant: false,
        width: None,
    },
    MetricDefinition {
        source_name: "PendingFlushes",
        source_key: "Count",
        display_name: "Flushes",
        combine: CombinePolicy::Sum,
        diff: false,
        significant: false,
        width: None,
    },
    MetricDefinition {
        source_name: "RowCacheMiss",
        source_key: "Count",
        display_name: "Row Cache Misses",
        combine: CombinePolicy::Sum,
        diff: true,
        significant: false,
        width: None,
    },
];

/// Error building a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Catalog has no metrics.
    Empty,
    /// Two metrics share a display name.
    DuplicateDisplayName(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "metric catalog is empty"),
            CatalogError::DuplicateDisplayName(name) => {
                write!(f, "duplicate metric display name '{}'", name)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Validated, ordered set of metric definitions.
#[derive(Debug, Clone)]
pub struct Catalog {
    metrics: Vec<MetricDefinition>,
}

impl Catalog {
    /// Builds a catalog, rejecting empty input and duplicate display names.
    pub fn new(metrics: Vec<MetricDefinition>) -> Result<Self, CatalogError> {
        if metrics.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::with_capacity(metrics.len());
        for m in &metrics {
            if !seen.insert(m.display_name) {
                return Err(CatalogError::DuplicateDisplayName(
                    m.display_name.to_string(),
                ));
            }
        }
        Ok(Self { metrics })
    }

    /// The built-in Cassandra table metrics.
    pub fn cassandra() -> Result<Self, CatalogError> {
        Self::new(CASSANDRA_METRICS.to_vec())
    }

    pub fn metrics(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn significant(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.metrics.iter().filter(|m| m.significant)
    }

    pub fn has_significant(&self) -> bool {
        self.significant().next().is_some()
    }
}
