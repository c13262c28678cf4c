//! Namespace resolution: where a raw reading is accounted.
//!
//! A reading for table `ks.tbl` lands in at most two namespaces:
//! - a per-resource row, `ks.tbl` (`show_cfs`) or `ks` (`show_keyspace`)
//! - the node-wide `total` row (`show_total`)
//!
//! System keyspaces and entries outside the allow-list are dropped before
//! either target is considered, so they never leak into `total`.

use crate::config::StatOptions;
use crate::source::RawSample;

/// Namespace of the node-wide aggregate row.
pub const TOTAL_NAMESPACE: &str = "total";

/// Keyspaces hidden unless `show_system` is set.
pub const SYSTEM_KEYSPACES: &[&str] = &["system", "system_keyspaces", "system_auth"];

/// Why a reading was not accounted anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// No keyspace: an aggregate the node already computed.
    Aggregate,
    SystemKeyspace,
    /// Not matched by the namespace allow-list.
    NotAllowed,
    /// Keyspace without a table name.
    MissingChild,
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exclusion::Aggregate => write!(f, "pre-aggregated entry"),
            Exclusion::SystemKeyspace => write!(f, "system keyspace"),
            Exclusion::NotAllowed => write!(f, "not in namespace list"),
            Exclusion::MissingChild => write!(f, "no table name"),
        }
    }
}

/// Outcome of resolving one reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Excluded(Exclusion),
    /// Per-resource namespace (if any granularity is enabled) and whether the
    /// reading also counts toward `total`.
    Targets {
        namespace: Option<String>,
        total: bool,
    },
}

/// Whether `keyspace.table` passes the allow-list.
///
/// Entries containing a dot must equal `keyspace.table`; other entries must
/// equal the keyspace. An empty list allows everything.
pub fn is_allowed(keyspace: &str, table: &str, allow: &[String]) -> bool {
    if allow.is_empty() {
        return true;
    }
    allow.iter().any(|entry| match entry.split_once('.') {
        Some((ks, tbl)) => ks == keyspace && tbl == table,
        None => entry == keyspace,
    })
}

/// Resolves a reading to its accumulation targets.
pub fn resolve(sample: &RawSample, options: &StatOptions) -> Resolution {
    let Some(keyspace) = sample.parent() else {
        return Resolution::Excluded(Exclusion::Aggregate);
    };
    if !options.show_system && SYSTEM_KEYSPACES.contains(&keyspace) {
        return Resolution::Excluded(Exclusion::SystemKeyspace);
    }
    // Malformed entries stay out of every row, `total` included.
    let Some(table) = sample.child() else {
        return Resolution::Excluded(Exclusion::MissingChild);
    };
    if !is_allowed(keyspace, table, &options.namespaces) {
        return Resolution::Excluded(Exclusion::NotAllowed);
    }

    let namespace = if options.show_cfs {
        Some(format!("{}.{}", keyspace, table))
    } else if options.show_keyspace {
        Some(keyspace.to_string())
    } else {
        None
    };

    Resolution::Targets {
        namespace,
        total: options.show_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn opts() -> StatOptions {
        StatOptions {
            show_cfs: true,
            ..StatOptions::default()
        }
    }

    fn targets(namespace: Option<&str>, total: bool) -> Resolution {
        Resolution::Targets {
            namespace: namespace.map(str::to_string),
            total,
        }
    }

    #[test]
    fn entry_without_keyspace_is_excluded() {
        let sample = RawSample::new(BTreeMap::new(), 10.0);
        assert_eq!(
            resolve(&sample, &opts()),
            Resolution::Excluded(Exclusion::Aggregate)
        );
    }

    #[test]
    fn system_keyspace_excluded_from_everything() {
        for ks in SYSTEM_KEYSPACES {
            let sample = RawSample::table(ks, "local", 1.0);
            assert_eq!(
                resolve(&sample, &opts()),
                Resolution::Excluded(Exclusion::SystemKeyspace)
            );
        }
    }

    #[test]
    fn system_keyspace_included_when_requested() {
        let o = StatOptions {
            show_system: true,
            ..opts()
        };
        let sample = RawSample::table("system", "local", 1.0);
        assert_eq!(resolve(&sample, &o), targets(Some("system.local"), true));
    }

    #[test]
    fn allow_list_matches_keyspace_or_full_name() {
        let o = StatOptions {
            namespaces: vec!["ks1".into(), "ks2.cf3".into()],
            ..opts()
        };
        assert_eq!(
            resolve(&RawSample::table("ks1", "cfX", 1.0), &o),
            targets(Some("ks1.cfX"), true)
        );
        assert_eq!(
            resolve(&RawSample::table("ks2", "cf3", 1.0), &o),
            targets(Some("ks2.cf3"), true)
        );
        assert_eq!(
            resolve(&RawSample::table("ks2", "cf4", 1.0), &o),
            Resolution::Excluded(Exclusion::NotAllowed)
        );
    }

    #[test]
    fn allow_list_does_not_match_prefixes() {
        let allow = vec!["ks".to_string(), "ks2.cf".to_string()];
        assert!(!is_allowed("ks1", "a", &allow));
        assert!(!is_allowed("ks2", "cf3", &allow));
        assert!(is_allowed("ks", "anything", &allow));
    }

    #[test]
    fn granularity_prefers_tables_over_keyspaces() {
        let sample = RawSample::table("ks1", "users", 1.0);

        let both = StatOptions {
            show_keyspace: true,
            ..opts()
        };
        assert_eq!(resolve(&sample, &both), targets(Some("ks1.users"), true));

        let keyspace = StatOptions {
            show_keyspace: true,
            ..StatOptions::default()
        };
        assert_eq!(resolve(&sample, &keyspace), targets(Some("ks1"), true));

        assert_eq!(
            resolve(&sample, &StatOptions::default()),
            targets(None, true)
        );
    }

    #[test]
    fn total_follows_show_total() {
        let o = StatOptions {
            show_total: false,
            ..opts()
        };
        assert_eq!(
            resolve(&RawSample::table("ks1", "users", 1.0), &o),
            targets(Some("ks1.users"), false)
        );
    }

    #[test]
    fn keyspace_without_table_is_excluded() {
        let attrs = BTreeMap::from([("keyspace".to_string(), "ks1".to_string())]);
        assert_eq!(
            resolve(&RawSample::new(attrs, 1.0), &opts()),
            Resolution::Excluded(Exclusion::MissingChild)
        );
    }
}
