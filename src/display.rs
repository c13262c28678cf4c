//! Row visibility and plain-text rendering.
//!
//! Each column is centered in its metric's width, followed by the wall-clock
//! time (12 chars) and the namespace:
//!
//! ```text
//!  Reads  Ranges  Writes  ...     time    ns
//!    40     0       3     ...   14:02:11  total
//! ```

use std::io::{self, Write};

use crate::catalog::Catalog;
use crate::config::StatOptions;
use crate::namespace::TOTAL_NAMESPACE;
use crate::snapshot::{MetricValues, Snapshot};

/// Width of the time column.
pub const TIME_WIDTH: usize = 12;

/// Format of the time column.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Whether a namespace's row is printed this interval.
///
/// `total` is never shown when totals are disabled. Otherwise a row is shown
/// when zeros are requested, when the catalog has no significant metric, or
/// when at least one significant metric is nonzero.
pub fn should_show(
    namespace: &str,
    values: &MetricValues,
    catalog: &Catalog,
    options: &StatOptions,
) -> bool {
    if namespace == TOTAL_NAMESPACE && !options.show_total {
        return false;
    }
    if options.show_zeros || !catalog.has_significant() {
        return true;
    }
    catalog
        .significant()
        .any(|m| values.get(m.display_name) != 0.0)
}

/// Rows of a diffed snapshot that pass [`should_show`], in order.
pub fn visible_rows<'a>(
    diffed: &'a Snapshot,
    catalog: &Catalog,
    options: &StatOptions,
) -> Vec<(&'a str, &'a MetricValues)> {
    diffed
        .iter()
        .filter(|(ns, values)| should_show(ns, values, catalog, options))
        .collect()
}

/// Integral values without a fraction, others with two decimals.
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

/// Centers `s` in `width`. An odd margin puts the extra space on the left
/// when `width` is odd, on the right otherwise.
fn center(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(margin - left))
}

/// Column header line.
pub fn header_line(catalog: &Catalog) -> String {
    let mut line = String::new();
    for m in catalog.metrics() {
        line.push_str(&center(m.display_name, m.width()));
    }
    line.push_str(&center("time", TIME_WIDTH));
    line.push_str("ns");
    line
}

/// One data line for `namespace`.
pub fn data_line(catalog: &Catalog, values: &MetricValues, time: &str, namespace: &str) -> String {
    let mut line = String::new();
    for m in catalog.metrics() {
        line.push_str(&center(&format_value(values.get(m.display_name)), m.width()));
    }
    line.push_str(&center(time, TIME_WIDTH));
    line.push_str(namespace);
    line
}

/// Writes one interval's rows, plus a blank separator when more than one row
/// was printed. Returns the number of rows written.
pub fn write_block<W: Write>(
    out: &mut W,
    catalog: &Catalog,
    rows: &[(&str, &MetricValues)],
    time: &str,
) -> io::Result<usize> {
    for (ns, values) in rows {
        writeln!(out, "{}", data_line(catalog, values, time, ns))?;
    }
    if rows.len() > 1 {
        writeln!(out)?;
    }
    out.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CombinePolicy, MetricDefinition};

    fn def(display_name: &'static str, significant: bool) -> MetricDefinition {
        MetricDefinition {
            source_name: "ReadLatency",
            source_key: "Count",
            display_name,
            combine: CombinePolicy::Sum,
            diff: true,
            significant,
            width: None,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![def("Reads", true), def("Writes", true), def("Misses", false)]).unwrap()
    }

    fn values(reads: f64, writes: f64, misses: f64) -> MetricValues {
        let mut v = MetricValues::default();
        v.set("Reads", reads);
        v.set("Writes", writes);
        v.set("Misses", misses);
        v
    }

    #[test]
    fn idle_row_is_hidden() {
        let opts = StatOptions::default();
        assert!(!should_show("ks1", &values(0.0, 0.0, 9.0), &catalog(), &opts));
        assert!(should_show("ks1", &values(0.0, 2.0, 0.0), &catalog(), &opts));
    }

    #[test]
    fn missing_significant_value_counts_as_zero() {
        let opts = StatOptions::default();
        assert!(!should_show("ks1", &MetricValues::default(), &catalog(), &opts));
    }

    #[test]
    fn negative_delta_is_activity() {
        let opts = StatOptions::default();
        assert!(should_show("ks1", &values(-130.0, 0.0, 0.0), &catalog(), &opts));
    }

    #[test]
    fn show_zeros_shows_idle_rows() {
        let opts = StatOptions {
            show_zeros: true,
            ..StatOptions::default()
        };
        assert!(should_show("ks1", &values(0.0, 0.0, 0.0), &catalog(), &opts));
    }

    #[test]
    fn no_significant_metrics_shows_everything() {
        let catalog = Catalog::new(vec![def("Misses", false)]).unwrap();
        let opts = StatOptions::default();
        assert!(should_show("ks1", &MetricValues::default(), &catalog, &opts));
    }

    #[test]
    fn total_follows_activity_rule() {
        let opts = StatOptions::default();
        assert!(!should_show(TOTAL_NAMESPACE, &values(0.0, 0.0, 0.0), &catalog(), &opts));
        assert!(should_show(TOTAL_NAMESPACE, &values(1.0, 0.0, 0.0), &catalog(), &opts));
    }

    #[test]
    fn disabled_total_is_never_shown() {
        let opts = StatOptions {
            show_total: false,
            show_zeros: true,
            ..StatOptions::default()
        };
        assert!(!should_show(TOTAL_NAMESPACE, &values(5.0, 5.0, 5.0), &catalog(), &opts));
        assert!(should_show("ks1", &values(0.0, 0.0, 0.0), &catalog(), &opts));
    }

    #[test]
    fn format_value_trims_integral_values() {
        assert_eq!(format_value(40.0), "40");
        assert_eq!(format_value(-130.0), "-130");
        assert_eq!(format_value(1.5), "1.50");
        assert_eq!(format_value(2.3456), "2.35");
    }

    #[test]
    fn center_puts_odd_margin_by_width_parity() {
        assert_eq!(center("40", 7), "   40  ");
        assert_eq!(center("0", 8), "   0    ");
        assert_eq!(center("Reads", 7), " Reads ");
        assert_eq!(center("too long", 3), "too long");
    }

    #[test]
    fn header_centers_names() {
        let line = header_line(&catalog());
        assert_eq!(line, " Reads  Writes  Misses     time    ns");
    }

    #[test]
    fn data_line_layout() {
        let line = data_line(&catalog(), &values(40.0, 0.0, 3.0), "14:02:11", "total");
        assert_eq!(line, "   40     0       3      14:02:11  total");
    }

    #[test]
    fn blank_line_only_after_multi_row_block() {
        let cat = catalog();
        let a = values(1.0, 0.0, 0.0);
        let b = values(2.0, 0.0, 0.0);

        let mut out = Vec::new();
        assert_eq!(write_block(&mut out, &cat, &[("ks1", &a)], "t").unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);

        let mut out = Vec::new();
        assert_eq!(
            write_block(&mut out, &cat, &[("ks1", &a), ("ks2", &b)], "t").unwrap(),
            2
        );
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("ks2\n\n"));
    }

    #[test]
    fn visible_rows_keep_order() {
        let cat = catalog();
        let mut s = Snapshot::new();
        *s.namespace_mut("total") = values(3.0, 0.0, 0.0);
        *s.namespace_mut("ks1") = values(0.0, 0.0, 0.0);
        *s.namespace_mut("ks2") = values(0.0, 3.0, 0.0);
        let rows = visible_rows(&s, &cat, &StatOptions::default());
        let names: Vec<_> = rows.iter().map(|(ns, _)| *ns).collect();
        assert_eq!(names, vec!["total", "ks2"]);
    }
}
