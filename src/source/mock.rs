//! Scripted metrics source for testing the poll loop without a live node.

use std::collections::{HashMap, VecDeque};

use super::{MetricsSource, RawSample, SourceError};

type Response = Result<Vec<RawSample>, SourceError>;

/// In-memory source replaying queued responses.
///
/// Each `(source_name, source_key)` pair has its own queue; every fetch pops
/// one response. Unscripted or exhausted queries return no samples.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    responses: HashMap<(String, String), VecDeque<Response>>,
    calls: Vec<(String, String)>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues samples for the next unanswered fetch of this metric.
    pub fn push_samples(&mut self, source_name: &str, source_key: &str, samples: Vec<RawSample>) {
        self.queue(source_name, source_key).push_back(Ok(samples));
    }

    /// Queues an error for the next unanswered fetch of this metric.
    pub fn push_error(&mut self, source_name: &str, source_key: &str, err: SourceError) {
        self.queue(source_name, source_key).push_back(Err(err));
    }

    /// Every query received so far, in order.
    pub fn calls(&self) -> &[(String, String)] {
        &self.calls
    }

    fn queue(&mut self, source_name: &str, source_key: &str) -> &mut VecDeque<Response> {
        self.responses
            .entry((source_name.to_string(), source_key.to_string()))
            .or_default()
    }
}

impl MetricsSource for MockSource {
    fn fetch(
        &mut self,
        source_name: &str,
        source_key: &str,
    ) -> Result<Vec<RawSample>, SourceError> {
        let key = (source_name.to_string(), source_key.to_string());
        self.calls.push(key.clone());
        self.responses
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

impl MockSource {
    /// `ReadLatency/Count` whose node-wide total follows `totals`, one value
    /// per interval, split evenly across `ks1.users` and `ks1.events`.
    pub fn read_counts(totals: &[f64]) -> Self {
        let mut src = Self::new();
        for &total in totals {
            src.push_samples(
                "ReadLatency",
                "Count",
                vec![
                    RawSample::table("ks1", "users", total / 2.0),
                    RawSample::table("ks1", "events", total / 2.0),
                ],
            );
        }
        src
    }

    /// Two intervals of a small cluster: two user keyspaces, a system
    /// keyspace, and the node-wide aggregate entry Jolokia always includes.
    pub fn small_cluster() -> Self {
        let mut src = Self::new();
        let interval = |ks1_users: f64, ks2_orders: f64, system: f64| {
            vec![
                RawSample::table("ks1", "users", ks1_users),
                RawSample::table("ks2", "orders", ks2_orders),
                RawSample::table("system", "local", system),
                RawSample::new(Default::default(), ks1_users + ks2_orders + system),
            ]
        };
        src.push_samples("ReadLatency", "Count", interval(100.0, 50.0, 7.0));
        src.push_samples("ReadLatency", "Count", interval(130.0, 50.0, 9.0));
        src.push_samples("WriteLatency", "Count", interval(10.0, 20.0, 1.0));
        src.push_samples("WriteLatency", "Count", interval(10.0, 25.0, 1.0));
        src.push_samples("ReadLatency", "99thPercentile", interval(1.5, 4.25, 0.5));
        src.push_samples("ReadLatency", "99thPercentile", interval(2.0, 3.0, 0.5));
        src
    }
}
