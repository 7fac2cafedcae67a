#![forbid(unsafe_code)]

//! FrankenTUI timeline demo binary entry point.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;
use std::time::Duration;

use ftui_timeline::TimelineConfig;
use ftui_timeline::item::parse_day;
use ftui_timeline_demo::cli::Opts;
use ftui_timeline_demo::fixture::{load_fixture, synthesize};
use ftui_timeline_demo::harness::{Harness, HarnessConfig};
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn main() {
    let opts = Opts::parse();
    init_tracing(opts.log_json);

    let today = match opts.today.as_deref() {
        Some(raw) => match parse_day(raw) {
            Ok(day) => day,
            Err(e) => {
                eprintln!("Invalid --today value: {raw} ({e})");
                process::exit(1);
            }
        },
        None => OffsetDateTime::now_utc().date(),
    };

    let items = match opts.fixture.as_deref() {
        Some(path) => match load_fixture(Path::new(path)) {
            Ok(items) => items,
            Err(e) => {
                eprintln!("Failed to load fixture: {e}");
                process::exit(1);
            }
        },
        None => synthesize(opts.items, opts.days, today),
    };
    info!(items = items.len(), %today, page_size = opts.page_size, "timeline demo starting");

    let config = HarnessConfig {
        height: opts.height,
        page_size: opts.page_size,
        initial_page: opts.initial_page,
        latency: Duration::from_millis(opts.latency_ms),
        tick: Duration::from_millis(opts.tick_ms.max(1)),
        scroll_step: opts.scroll_step.max(1),
        max_ticks: opts.max_ticks,
        today,
        timeline: TimelineConfig::from_env(),
    };

    let mut out: Box<dyn Write> = match opts.jsonl.as_deref() {
        None | Some("-") => Box::new(BufWriter::new(io::stdout().lock())),
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(e) => {
                eprintln!("Cannot create {path}: {e}");
                process::exit(1);
            }
        },
    };

    let mut harness = Harness::new(items, config);
    match harness.run(&mut out) {
        Ok(summary) => {
            if let Ok(line) = serde_json::to_string(&summary) {
                eprintln!("{line}");
            }
            if !summary.completed {
                process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Output error: {e}");
            process::exit(1);
        }
    }
}
