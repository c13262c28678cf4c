//! Fixed-rate poll loop.
//!
//! ```text
//! INIT ─▶ SLEEP ─▶ FETCH/AGGREGATE ─▶ DIFF+FILTER+EMIT ─▶ ADVANCE ─┐
//!            ▲                         (only with previous)        │
//!            └─────────────────────────────────────────────────────┘
//! ```
//!
//! The first interval only establishes the baseline. Loop state is threaded
//! by value through [`Poller::tick`], so exactly one previous snapshot is
//! retained at any time.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use tracing::{debug, error, info};

use crate::catalog::Catalog;
use crate::config::StatOptions;
use crate::diff::diff;
use crate::display::{TIME_FORMAT, header_line, visible_rows, write_block};
use crate::snapshot::Snapshot;
use crate::source::{MetricsSource, SourceError};

/// Granularity of the interruptible sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Error that stops the poll loop.
#[derive(Debug)]
pub enum PollError {
    /// Fatal metrics source failure.
    Source(SourceError),
    /// Writing to the output failed.
    Io(io::Error),
}

impl std::fmt::Display for PollError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollError::Source(e) => write!(f, "{}", e),
            PollError::Io(e) => write!(f, "output error: {}", e),
        }
    }
}

impl std::error::Error for PollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PollError::Source(e) => Some(e),
            PollError::Io(e) => Some(e),
        }
    }
}

impl From<SourceError> for PollError {
    fn from(e: SourceError) -> Self {
        PollError::Source(e)
    }
}

impl From<io::Error> for PollError {
    fn from(e: io::Error) -> Self {
        PollError::Io(e)
    }
}

/// When header lines are printed.
///
/// Negative: never. Zero: once at start. `N`: at start and then before every
/// data interval that follows `N` data intervals since the last header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSchedule {
    every: i64,
    since_header: u64,
}

impl HeaderSchedule {
    pub fn new(header_rows: i64) -> Self {
        Self {
            every: header_rows,
            since_header: 0,
        }
    }

    /// Whether the header is printed before the first interval.
    pub fn initial(&self) -> bool {
        self.every >= 0
    }

    /// Called before each data interval; true when a header is due.
    pub fn before_data(&mut self) -> bool {
        let Ok(every) = u64::try_from(self.every) else {
            return false;
        };
        if every == 0 {
            return false;
        }
        let due = self.since_header == every;
        if due {
            self.since_header = 0;
        }
        self.since_header += 1;
        due
    }
}

/// State carried from one interval to the next.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    /// Snapshot of the previous interval; `None` before the baseline exists.
    pub previous: Option<Snapshot>,
    /// Data intervals emitted so far.
    pub intervals: u64,
}

/// One interval's readings.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub snapshot: Snapshot,
    /// Display names of metrics whose fetch failed this interval.
    pub skipped: Vec<&'static str>,
}

/// Fetches every catalog metric and aggregates the readings.
///
/// Non-fatal source errors are logged and skip that metric for this interval;
/// a fatal one aborts the whole snapshot.
pub fn collect_snapshot<S: MetricsSource>(
    source: &mut S,
    catalog: &Catalog,
    options: &StatOptions,
) -> Result<Collection, SourceError> {
    let mut collection = Collection {
        snapshot: Snapshot::for_options(options),
        skipped: Vec::new(),
    };
    for metric in catalog.metrics() {
        match source.fetch(metric.source_name, metric.source_key) {
            Ok(samples) => {
                debug!(
                    "{}/{}: {} entries",
                    metric.source_name,
                    metric.source_key,
                    samples.len()
                );
                for sample in &samples {
                    collection.snapshot.record(sample, metric, options);
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("{}", e);
                collection.skipped.push(metric.display_name);
            }
        }
    }
    Ok(collection)
}

/// Drives a metrics source and writes rows to `out`.
pub struct Poller<S, W> {
    source: S,
    catalog: Catalog,
    options: StatOptions,
    headers: HeaderSchedule,
    out: W,
}

impl<S: MetricsSource, W: Write> Poller<S, W> {
    pub fn new(source: S, catalog: Catalog, options: StatOptions, out: W) -> Self {
        let headers = HeaderSchedule::new(options.header_rows);
        Self {
            source,
            catalog,
            options,
            headers,
            out,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", header_line(&self.catalog))?;
        self.out.flush()
    }

    /// Prints the initial header if configured.
    pub fn start(&mut self) -> Result<(), PollError> {
        if self.headers.initial() {
            self.write_header()?;
        }
        Ok(())
    }

    /// One interval: fetch, then diff and print against the previous
    /// snapshot if there is one. Returns the state for the next interval.
    pub fn tick(&mut self, state: PollState) -> Result<PollState, PollError> {
        let Collection {
            snapshot: mut current,
            skipped,
        } = collect_snapshot(&mut self.source, &self.catalog, &self.options)?;

        let Some(previous) = state.previous else {
            debug!("Baseline: {} namespaces", current.len());
            return Ok(PollState {
                previous: Some(current),
                intervals: state.intervals,
            });
        };

        // A failed metric keeps its last good reading, so it shows no delta
        // now and the next interval diffs against that reading.
        for name in &skipped {
            current.carry_forward(&previous, name);
        }

        if self.headers.before_data() {
            self.write_header()?;
        }

        let diffed = diff(&current, &previous, &self.catalog);
        let rows = visible_rows(&diffed, &self.catalog, &self.options);
        let time = Local::now().format(TIME_FORMAT).to_string();
        let shown = write_block(&mut self.out, &self.catalog, &rows, &time)?;

        let intervals = state.intervals + 1;
        debug!(
            "Interval #{}: {} namespaces, {} shown",
            intervals,
            diffed.len(),
            shown
        );

        Ok(PollState {
            previous: Some(current),
            intervals,
        })
    }

    /// Runs until `running` is cleared. Sleeps `rate` before every fetch.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), PollError> {
        info!(
            "Polling {} metrics every {}s",
            self.catalog.len(),
            self.options.rate.as_secs()
        );
        self.start()?;

        let mut state = PollState::default();
        while running.load(Ordering::SeqCst) {
            sleep_while_running(self.options.rate, running);
            if !running.load(Ordering::SeqCst) {
                break;
            }
            state = self.tick(state)?;
        }

        info!("Stopped after {} intervals", state.intervals);
        Ok(())
    }
}

/// Sleeps for `total`, waking early once `running` is cleared.
fn sleep_while_running(total: Duration, running: &AtomicBool) {
    let mut remaining = total;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}
