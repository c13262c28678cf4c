//! cassandra-stat - iostat-like live view of Cassandra table traffic.
//!
//! Polls per-table metrics from a node's Jolokia agent, folds them into
//! keyspace / table / total rows, and prints interval deltas:
//! - `catalog` — which metrics are read and how they combine
//! - `source` — metrics source trait, Jolokia client, mock
//! - `namespace` — which rows a reading belongs to
//! - `snapshot` — per-interval aggregation
//! - `diff` — interval deltas
//! - `display` — row visibility and text layout
//! - `poller` — the fixed-rate loop
//! - `config` — runtime options

pub mod catalog;
pub mod config;
pub mod diff;
pub mod display;
pub mod namespace;
pub mod poller;
pub mod snapshot;
pub mod source;

pub use catalog::{CASSANDRA_METRICS, Catalog, CatalogError, CombinePolicy, MetricDefinition};
pub use config::StatOptions;
pub use poller::{Collection, PollError, PollState, Poller};
pub use snapshot::Snapshot;
pub use source::{JolokiaSource, MetricsSource, MockSource, RawSample, SourceError};
