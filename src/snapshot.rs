//! Per-interval snapshot: namespace → metric → value, in first-seen order.

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::{CombinePolicy, MetricDefinition};
use crate::config::StatOptions;
use crate::namespace::{Resolution, TOTAL_NAMESPACE, resolve};
use crate::source::RawSample;

/// Values of every metric recorded for one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricValues {
    values: HashMap<String, f64>,
}

impl MetricValues {
    /// Value of `display_name`, `0` when never recorded.
    pub fn get(&self, display_name: &str) -> f64 {
        self.values.get(display_name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, display_name: &str) -> bool {
        self.values.contains_key(display_name)
    }

    pub fn set(&mut self, display_name: &str, value: f64) {
        self.values.insert(display_name.to_string(), value);
    }

    /// Folds one reading in. The first reading is stored as is; later ones
    /// are added (`Sum`) or kept only when strictly larger (`Max`).
    pub fn combine(&mut self, display_name: &str, value: f64, policy: CombinePolicy) {
        match self.values.get_mut(display_name) {
            None => {
                self.values.insert(display_name.to_string(), value);
            }
            Some(current) => match policy {
                CombinePolicy::Sum => *current += value,
                CombinePolicy::Max => {
                    if value > *current {
                        *current = value;
                    }
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Aggregated values of one poll, keyed by namespace.
///
/// Iteration follows the order in which namespaces were first created, which
/// is the row order of the output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    order: Vec<String>,
    rows: HashMap<String, MetricValues>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty snapshot with `total` pre-created when totals are tracked, so
    /// that the total row always comes first.
    pub fn for_options(options: &StatOptions) -> Self {
        let mut snapshot = Self::new();
        if options.show_total {
            snapshot.namespace_mut(TOTAL_NAMESPACE);
        }
        snapshot
    }

    /// Values for `namespace`, creating the entry on first use.
    pub fn namespace_mut(&mut self, namespace: &str) -> &mut MetricValues {
        if !self.rows.contains_key(namespace) {
            self.order.push(namespace.to_string());
        }
        self.rows.entry(namespace.to_string()).or_default()
    }

    pub fn get(&self, namespace: &str) -> Option<&MetricValues> {
        self.rows.get(namespace)
    }

    /// Value of one metric in one namespace, `0` when missing.
    pub fn value(&self, namespace: &str, display_name: &str) -> f64 {
        self.get(namespace).map_or(0.0, |v| v.get(display_name))
    }

    /// Folds one reading into `namespace`.
    pub fn accumulate(
        &mut self,
        namespace: &str,
        display_name: &str,
        value: f64,
        policy: CombinePolicy,
    ) {
        self.namespace_mut(namespace)
            .combine(display_name, value, policy);
    }

    /// Resolves a raw sample and folds it into every namespace it targets.
    pub fn record(&mut self, sample: &RawSample, metric: &MetricDefinition, options: &StatOptions) {
        match resolve(sample, options) {
            Resolution::Excluded(reason) => {
                debug!(
                    "{} {:?}: excluded ({})",
                    metric.display_name, sample.attributes, reason
                );
            }
            Resolution::Targets { namespace, total } => {
                if let Some(ns) = namespace {
                    self.accumulate(&ns, metric.display_name, sample.value, metric.combine);
                }
                if total {
                    self.accumulate(
                        TOTAL_NAMESPACE,
                        metric.display_name,
                        sample.value,
                        metric.combine,
                    );
                }
            }
        }
    }

    /// Copies `display_name` from `previous` into every namespace that had it,
    /// for a metric whose fetch failed this interval.
    pub fn carry_forward(&mut self, previous: &Snapshot, display_name: &str) {
        for (ns, values) in previous.iter() {
            if values.contains(display_name) {
                self.namespace_mut(ns)
                    .set(display_name, values.get(display_name));
            }
        }
    }

    /// Namespaces with their values, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValues)> {
        self.order
            .iter()
            .filter_map(|ns| self.rows.get(ns).map(|v| (ns.as_str(), v)))
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.rows.contains_key(namespace)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
