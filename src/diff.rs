//! Interval differencing of two consecutive snapshots.
//!
//! Counter metrics (`diff = true`) report `current - previous`; gauges report
//! the latest value. Namespaces missing from the previous snapshot diff
//! against zero. A counter that went backwards (node restart) yields a
//! negative delta, which is reported as is.

use crate::catalog::Catalog;
use crate::snapshot::Snapshot;

/// Output values for every namespace of `current`, in the same order, with
/// one value per catalog metric.
pub fn diff(current: &Snapshot, previous: &Snapshot, catalog: &Catalog) -> Snapshot {
    let mut out = Snapshot::new();
    for (ns, values) in current.iter() {
        let row = out.namespace_mut(ns);
        for metric in catalog.metrics() {
            let name = metric.display_name;
            let value = if metric.diff {
                values.get(name) - previous.value(ns, name)
            } else {
                values.get(name)
            };
            row.set(name, value);
        }
    }
    out
}
