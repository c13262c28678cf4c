//! Metrics source abstraction.
//!
//! A source answers one `(source_name, source_key)` query with a list of raw
//! per-resource readings. The poll loop only sees the [`MetricsSource`] trait:
//!
//! - [`JolokiaSource`] reads Cassandra table metrics over HTTP
//! - [`MockSource`] replays scripted readings for tests

mod jolokia;
pub mod mock;

pub use jolokia::{JolokiaSource, parse_object_name};
pub use mock::MockSource;

use std::collections::BTreeMap;

/// Attribute naming the parent resource (keyspace).
pub const PARENT_ATTR: &str = "keyspace";

/// Attribute naming the child resource (table).
pub const CHILD_ATTR: &str = "scope";

/// One reading of one metric for one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub attributes: BTreeMap<String, String>,
    pub value: f64,
}

impl RawSample {
    pub fn new(attributes: BTreeMap<String, String>, value: f64) -> Self {
        Self { attributes, value }
    }

    /// Reading for `keyspace.table`.
    pub fn table(keyspace: &str, table: &str, value: f64) -> Self {
        let attributes = BTreeMap::from([
            (PARENT_ATTR.to_string(), keyspace.to_string()),
            (CHILD_ATTR.to_string(), table.to_string()),
        ]);
        Self { attributes, value }
    }

    pub fn parent(&self) -> Option<&str> {
        self.attributes.get(PARENT_ATTR).map(String::as_str)
    }

    pub fn child(&self) -> Option<&str> {
        self.attributes.get(CHILD_ATTR).map(String::as_str)
    }
}

/// Error returned by a metrics source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source could not be reached at all.
    Unreachable(String),
    /// The source answered but refused this particular query.
    Rejected { metric: String, message: String },
    /// The answer could not be understood.
    Protocol(String),
}

impl SourceError {
    /// Fatal errors stop the poll loop; the rest skip one metric for one interval.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Unreachable(_))
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unreachable(msg) => write!(f, "metrics source unreachable: {}", msg),
            SourceError::Rejected { metric, message } => {
                write!(f, "metrics source rejected {}: {}", metric, message)
            }
            SourceError::Protocol(msg) => write!(f, "metrics source protocol error: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            SourceError::Unreachable(err.to_string())
        } else {
            SourceError::Protocol(err.to_string())
        }
    }
}

/// Source of raw metric readings.
pub trait MetricsSource {
    /// Reads every resource's value of `source_key` on metric `source_name`.
    fn fetch(&mut self, source_name: &str, source_key: &str)
    -> Result<Vec<RawSample>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_sample_has_parent_and_child() {
        let s = RawSample::table("ks1", "users", 3.0);
        assert_eq!(s.parent(), Some("ks1"));
        assert_eq!(s.child(), Some("users"));
    }

    #[test]
    fn only_unreachable_is_fatal() {
        assert!(SourceError::Unreachable("refused".into()).is_fatal());
        assert!(
            !SourceError::Rejected {
                metric: "ReadLatency/Count".into(),
                message: "no such attribute".into()
            }
            .is_fatal()
        );
        assert!(!SourceError::Protocol("bad json".into()).is_fatal());
    }
}
