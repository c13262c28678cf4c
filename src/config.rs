//! Runtime options shared by the resolver, display filter and poll loop.

use std::time::Duration;

/// Default Jolokia endpoint.
pub const DEFAULT_HOST: &str = "http://localhost:8778";

/// Default number of data intervals between repeated headers.
pub const DEFAULT_HEADER_ROWS: i64 = 10;

/// Options controlling what is collected and shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatOptions {
    /// Jolokia base URL, `http://HOST:PORT`.
    pub host: String,
    /// Header repetition: negative = never, 0 = once, N = every N intervals.
    pub header_rows: i64,
    /// Seconds between polls.
    pub rate: Duration,
    /// Include system keyspaces (also in `total`).
    pub show_system: bool,
    /// One row per keyspace.
    pub show_keyspace: bool,
    /// One row per keyspace.table.
    pub show_cfs: bool,
    /// Maintain and show the `total` row.
    pub show_total: bool,
    /// Show rows even when nothing significant happened.
    pub show_zeros: bool,
    /// Allow-list of `keyspace` or `keyspace.table` entries. Empty = everything.
    pub namespaces: Vec<String>,
}

impl Default for StatOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            header_rows: DEFAULT_HEADER_ROWS,
            rate: Duration::from_secs(1),
            show_system: false,
            show_keyspace: false,
            show_cfs: false,
            show_total: true,
            show_zeros: false,
            namespaces: Vec::new(),
        }
    }
}

/// Splits a comma-separated allow-list, dropping blank entries.
pub fn parse_namespaces(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .collect()
}
