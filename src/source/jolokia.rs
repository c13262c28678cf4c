//! Cassandra table metrics read through the Jolokia JMX-over-HTTP agent.
//!
//! One metric is read with a wildcard MBean pattern:
//!
//! ```text
//! GET {host}/jolokia/read/org.apache.cassandra.metrics:type=ColumnFamily,*,name=ReadLatency/Count
//! ```
//!
//! The agent answers with one entry per matching MBean, keyed by object name:
//!
//! ```text
//! {"value": {"org.apache.cassandra.metrics:keyspace=ks,name=ReadLatency,scope=users,type=ColumnFamily": {"Count": 42}}}
//! ```
//!
//! Failed reads come back as `{"error": "...", "status": 404}`.

use std::collections::BTreeMap;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::{MetricsSource, RawSample, SourceError};

const METRICS_DOMAIN: &str = "org.apache.cassandra.metrics";

#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Jolokia client for a single Cassandra node.
pub struct JolokiaSource {
    client: Client,
    host: String,
}

impl JolokiaSource {
    /// Creates a client for `host` (`http://HOST:PORT`).
    pub fn new(host: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SourceError::Protocol(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    /// Read URL for one metric attribute across all tables.
    pub fn read_url(&self, source_name: &str, source_key: &str) -> String {
        format!(
            "{}/jolokia/read/{}",
            self.host,
            mbean_pattern(source_name, source_key)
        )
    }
}

fn mbean_pattern(source_name: &str, source_key: &str) -> String {
    format!(
        "{}:type=ColumnFamily,*,name={}/{}",
        METRICS_DOMAIN, source_name, source_key
    )
}

impl MetricsSource for JolokiaSource {
    fn fetch(
        &mut self,
        source_name: &str,
        source_key: &str,
    ) -> Result<Vec<RawSample>, SourceError> {
        let url = self.read_url(source_name, source_key);
        debug!("GET {}", url);

        let resp = self.client.get(&url).send()?;
        let status = resp.status();
        let body: ReadResponse = resp
            .json()
            .map_err(|e| SourceError::Protocol(format!("HTTP {}: {}", status, e)))?;

        if let Some(message) = body.error.filter(|e| !e.is_empty()) {
            return Err(SourceError::Rejected {
                metric: mbean_pattern(source_name, source_key),
                message,
            });
        }

        let entries = match body.value {
            Some(Value::Object(entries)) => entries,
            Some(other) => {
                return Err(SourceError::Protocol(format!(
                    "expected an object of MBeans, got {}",
                    other
                )));
            }
            None => return Ok(Vec::new()),
        };

        let mut samples = Vec::with_capacity(entries.len());
        for (object_name, attrs) in entries {
            let Some(attributes) = parse_object_name(&object_name) else {
                warn!("Skipping malformed MBean name '{}'", object_name);
                continue;
            };
            let Some(value) = attrs.get(source_key).and_then(Value::as_f64) else {
                warn!("Skipping {}: no numeric '{}'", object_name, source_key);
                continue;
            };
            trace!("{} {}={}", object_name, source_key, value);
            samples.push(RawSample::new(attributes, value));
        }
        Ok(samples)
    }
}

/// Splits a JMX object name `domain:k1=v1,k2=v2` into its key properties.
///
/// Returns `None` when there is no domain separator or a property lacks `=`.
pub fn parse_object_name(name: &str) -> Option<BTreeMap<String, String>> {
    let (_, props) = name.split_once(':')?;
    let mut attrs = BTreeMap::new();
    for pair in props.split(',') {
        let (k, v) = pair.split_once('=')?;
        attrs.insert(k.to_string(), v.to_string());
    }
    Some(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const READ_COUNT_PATH: &str =
        "/jolokia/read/org.apache.cassandra.metrics:type=ColumnFamily,*,name=ReadLatency/Count";

    /// Runs the blocking client off the async runtime.
    fn fetch(host: String, source_key: &'static str) -> Result<Vec<RawSample>, SourceError> {
        thread::spawn(move || JolokiaSource::new(&host)?.fetch("ReadLatency", source_key))
            .join()
            .unwrap()
    }

    #[test]
    fn parse_object_name_splits_properties() {
        let attrs = parse_object_name(
            "org.apache.cassandra.metrics:keyspace=ks1,name=ReadLatency,scope=users,type=ColumnFamily",
        )
        .unwrap();
        assert_eq!(attrs.get("keyspace").map(String::as_str), Some("ks1"));
        assert_eq!(attrs.get("scope").map(String::as_str), Some("users"));
        assert_eq!(attrs.get("type").map(String::as_str), Some("ColumnFamily"));
    }

    #[test]
    fn parse_object_name_rejects_malformed() {
        assert!(parse_object_name("no-domain-separator").is_none());
        assert!(parse_object_name("domain:keyspace").is_none());
    }

    #[test]
    fn read_url_uses_wildcard_pattern() {
        let src = JolokiaSource::new("http://localhost:8778/").unwrap();
        assert_eq!(
            src.read_url("ReadLatency", "Count"),
            format!("http://localhost:8778{}", READ_COUNT_PATH)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_parses_entries_and_skips_bad_ones() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(READ_COUNT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "value": {
                    "org.apache.cassandra.metrics:keyspace=ks1,name=ReadLatency,scope=users,type=ColumnFamily": {"Count": 42},
                    "org.apache.cassandra.metrics:name=ReadLatency,type=ColumnFamily": {"Count": 100},
                    "garbage": {"Count": 1},
                    "org.apache.cassandra.metrics:keyspace=ks1,name=ReadLatency,scope=events,type=ColumnFamily": {"Other": 5}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let samples = fetch(server.uri(), "Count").unwrap();

        // The keyspace-less aggregate is still returned; the resolver drops it.
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].parent(), Some("ks1"));
        assert_eq!(samples[0].child(), Some("users"));
        assert_eq!(samples[0].value, 42.0);
        assert_eq!(samples[1].parent(), None);
        assert_eq!(samples[1].value, 100.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_reports_agent_error_as_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 404,
                "error_type": "javax.management.AttributeNotFoundException",
                "error": "No such attribute: Bogus"
            })))
            .mount(&server)
            .await;

        let err = fetch(server.uri(), "Bogus").unwrap_err();
        assert!(matches!(err, SourceError::Rejected { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_reports_bad_json_as_protocol() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(READ_COUNT_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html>not jolokia</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let err = fetch(server.uri(), "Count").unwrap_err();
        assert!(matches!(err, SourceError::Protocol(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn fetch_from_closed_port_is_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut src = JolokiaSource::new(&format!("http://127.0.0.1:{}", port)).unwrap();
        let err = src.fetch("ReadLatency", "Count").unwrap_err();
        assert!(err.is_fatal(), "expected unreachable, got {:?}", err);
    }
}
