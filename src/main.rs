//! cassandra-stat - live per-keyspace / per-table Cassandra traffic.
//!
//! Polls the node's Jolokia agent at a fixed rate and prints one line per
//! active namespace per interval until interrupted.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use cassandra_stat::config::{DEFAULT_HOST, parse_namespaces};
use cassandra_stat::{Catalog, JolokiaSource, PollError, Poller, SourceError, StatOptions};

/// Live monitoring of Cassandra traffic.
#[derive(Parser, Debug)]
#[command(
    name = "cassandra-stat",
    about = "Cassandra-stat tool for live monitoring of Cassandra traffic",
    version
)]
struct Args {
    /// Host and port to connect to, format http://HOST:PORT.
    #[arg(long, default_value = DEFAULT_HOST, env = "CASSANDRA_STAT_HOST")]
    host: String,

    /// How many intervals pass before a new header line is output.
    /// 0 prints only the first header, -1 prints none.
    #[arg(long = "header_rows", default_value_t = 10, allow_negative_numbers = true)]
    header_rows: i64,

    /// Seconds between server polls.
    #[arg(
        long,
        default_value_t = 1,
        env = "CASSANDRA_STAT_RATE",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    rate: u64,

    /// Include system keyspaces and their tables (also in "total").
    #[arg(long = "show_system")]
    show_system: bool,

    /// Show keyspace level output.
    #[arg(long = "show_keyspace")]
    show_keyspace: bool,

    /// Show <keyspace>.<table> level output.
    #[arg(long = "show_cfs")]
    show_cfs: bool,

    /// Show the "total" row (default).
    #[arg(long = "show_total", conflicts_with = "no_total")]
    show_total: bool,

    /// Suppress the "total" row. There may be no output at all when the
    /// database has no traffic.
    #[arg(long = "no_total")]
    no_total: bool,

    /// Show every selected namespace even without activity.
    #[arg(long = "show_zeros")]
    show_zeros: bool,

    /// Comma separated list of keyspaces and/or <keyspace>.<table> names to show.
    #[arg(long, default_value = "", env = "CASSANDRA_STAT_NAMESPACES")]
    namespaces: String,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn options(&self) -> StatOptions {
        StatOptions {
            host: self.host.clone(),
            header_rows: self.header_rows,
            rate: Duration::from_secs(self.rate),
            show_system: self.show_system,
            show_keyspace: self.show_keyspace,
            show_cfs: self.show_cfs,
            show_total: self.show_total || !self.no_total,
            show_zeros: self.show_zeros,
            namespaces: parse_namespaces(&self.namespaces),
        }
    }
}

/// Initializes the tracing subscriber on stderr; stdout carries the rows.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("cassandra_stat={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Explains how to get a reachable Jolokia agent.
fn print_unreachable(host: &str, error: &SourceError) {
    const RED: &str = "\x1b[1;31m";
    const YELLOW: &str = "\x1b[33m";
    const RESET: &str = "\x1b[0m";

    eprintln!("{RED}Could not connect to {host}: {error}{RESET}");
    eprintln!();
    eprintln!("{YELLOW}  Perhaps the port is not open to this host, or the Jolokia");
    eprintln!("  agent is not installed and active. Download the Jolokia JVM agent");
    eprintln!("  jar and add to cassandra-env.sh:");
    eprintln!("    JVM_OPTS=\"$JVM_OPTS -javaagent:PATH_TO_JOLOKIA_JAR.jar\"");
    eprintln!("  then restart Cassandra.{RESET}");
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let options = args.options();
    info!("cassandra-stat {} starting", env!("CARGO_PKG_VERSION"));
    debug!("Options: {:?}", options);
    if !options.show_cfs && !options.show_keyspace && !options.show_total {
        warn!("No --show_cfs, --show_keyspace or total row enabled: nothing will be shown");
    }

    let catalog = match Catalog::cassandra() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid metric catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source = match JolokiaSource::new(&options.host) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let host = options.host.clone();
    let mut poller = Poller::new(source, catalog, options, io::stdout().lock());
    match poller.run(&running) {
        Ok(()) => ExitCode::SUCCESS,
        Err(PollError::Source(e)) => {
            print_unreachable(&host, &e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
