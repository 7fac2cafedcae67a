#![forbid(unsafe_code)]

//! Command-line argument parsing for the timeline demo.
//!
//! Parses args manually, with environment variable overrides via the
//! `FTUI_TIMELINE_DEMO_*` prefix. Engine tuning (`FTUI_TIMELINE_*`) is read
//! separately by `TimelineConfig::from_env`.

use std::env;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
FrankenTUI Timeline Demo: scripted scroll through a paginated timeline

USAGE:
    ftui-timeline-demo [OPTIONS]

OPTIONS:
    --fixture=PATH       Load items from a JSON fixture instead of synthesizing
    --items=N            Synthetic item count (default: 500)
    --days=N             Synthetic distinct days (default: 25)
    --page-size=N        Items per page (default: 100)
    --initial-page=N     Page served by the initial load (default: 5, clamped)
    --latency-ms=N       Simulated fetch latency in ms (default: 500)
    --tick-ms=N          Simulated frame interval in ms (default: 16)
    --scroll-step=N      Cells scrolled per tick (default: 6)
    --height=N           Viewport height in cells (default: 40)
    --today=YYYY-MM-DD   Reference date for recency (default: system date)
    --max-ticks=N        Stop after N ticks (default: 20000)
    --jsonl=PATH         JSONL output path, '-' for stdout (default: -)
    --log-json           Emit tracing logs as JSON on stderr
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    FTUI_TIMELINE_DEMO_FIXTURE       Override --fixture
    FTUI_TIMELINE_DEMO_ITEMS         Override --items
    FTUI_TIMELINE_DEMO_DAYS          Override --days
    FTUI_TIMELINE_DEMO_PAGE_SIZE     Override --page-size
    FTUI_TIMELINE_DEMO_INITIAL_PAGE  Override --initial-page
    FTUI_TIMELINE_DEMO_LATENCY_MS    Override --latency-ms
    FTUI_TIMELINE_DEMO_TICK_MS       Override --tick-ms
    FTUI_TIMELINE_DEMO_SCROLL_STEP   Override --scroll-step
    FTUI_TIMELINE_DEMO_HEIGHT        Override --height
    FTUI_TIMELINE_DEMO_TODAY         Override --today
    FTUI_TIMELINE_DEMO_MAX_TICKS     Override --max-ticks
    FTUI_TIMELINE_DEMO_JSONL         Override --jsonl
    FTUI_TIMELINE_DEMO_LOG_JSON      Enable JSON logs (1/true)
    FTUI_TIMELINE_LOOKAHEAD          Engine lookahead in rows
    FTUI_TIMELINE_THROTTLE_MS        Engine scroll throttle in ms
    FTUI_TIMELINE_RETRY_MS           Engine retry backoff base in ms
    FTUI_TIMELINE_RETRY_MAX_MS       Engine retry backoff ceiling in ms
    FTUI_TIMELINE_SEED_BACKWARD      Seed a backward fetch after the first load
    FTUI_TIMELINE_STRICT             Panic on visible-range inconsistencies
    RUST_LOG                         Log filter (default: info)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    /// JSON fixture path (None = synthesize).
    pub fixture: Option<String>,
    /// Synthetic item count.
    pub items: u64,
    /// Synthetic distinct days.
    pub days: u64,
    /// Items per page.
    pub page_size: usize,
    /// Page served by the initial load.
    pub initial_page: usize,
    /// Simulated fetch latency in milliseconds.
    pub latency_ms: u64,
    /// Simulated frame interval in milliseconds.
    pub tick_ms: u64,
    /// Cells scrolled per tick.
    pub scroll_step: u32,
    /// Viewport height in cells.
    pub height: u16,
    /// Reference date, `YYYY-MM-DD` (None = system date).
    pub today: Option<String>,
    /// Hard stop.
    pub max_ticks: u64,
    /// JSONL output path (None or "-" = stdout).
    pub jsonl: Option<String>,
    /// JSON-formatted tracing output.
    pub log_json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            fixture: None,
            items: 500,
            days: 25,
            page_size: 100,
            initial_page: 5,
            latency_ms: 500,
            tick_ms: 16,
            scroll_step: 6,
            height: 40,
            today: None,
            max_ticks: 20_000,
            jsonl: None,
            log_json: false,
        }
    }
}

fn parse_value<T: std::str::FromStr>(flag: &'static str, val: &str) -> Result<T, ParseError> {
    val.parse().map_err(|_| ParseError::InvalidValue {
        flag,
        value: val.to_string(),
    })
}

fn non_empty(val: String) -> Option<String> {
    if val.trim().is_empty() { None } else { Some(val) }
}

impl Opts {
    /// Parse command-line arguments and environment variables.
    ///
    /// Environment variables take precedence over defaults but are overridden
    /// by explicit command-line flags.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("ftui-timeline-demo {VERSION}");
                process::exit(0);
            }
            Err(ParseError::InvalidValue { flag, value }) => {
                eprintln!("Invalid {flag} value: {value}");
                process::exit(1);
            }
            Err(ParseError::UnknownArg(arg)) => {
                eprintln!("Unknown argument: {arg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    fn parse_from_env_and_args<I, S, F>(args: I, get_env: F) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        // Apply environment variable defaults first
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_FIXTURE") {
            opts.fixture = non_empty(val);
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_ITEMS")
            && let Ok(n) = val.parse()
        {
            opts.items = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_DAYS")
            && let Ok(n) = val.parse()
        {
            opts.days = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_PAGE_SIZE")
            && let Ok(n) = val.parse()
        {
            opts.page_size = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_INITIAL_PAGE")
            && let Ok(n) = val.parse()
        {
            opts.initial_page = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_LATENCY_MS")
            && let Ok(n) = val.parse()
        {
            opts.latency_ms = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_TICK_MS")
            && let Ok(n) = val.parse()
        {
            opts.tick_ms = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_SCROLL_STEP")
            && let Ok(n) = val.parse()
        {
            opts.scroll_step = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_HEIGHT")
            && let Ok(n) = val.parse()
        {
            opts.height = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_TODAY") {
            opts.today = non_empty(val);
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_MAX_TICKS")
            && let Ok(n) = val.parse()
        {
            opts.max_ticks = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_JSONL") {
            opts.jsonl = non_empty(val);
        }
        if let Some(val) = get_env("FTUI_TIMELINE_DEMO_LOG_JSON") {
            opts.log_json = val == "1" || val.eq_ignore_ascii_case("true");
        }

        // Parse command-line args (override env vars)
        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                "--log-json" => opts.log_json = true,
                other => {
                    let Some((flag, val)) = other.split_once('=') else {
                        return Err(ParseError::UnknownArg(other.to_string()));
                    };
                    match flag {
                        "--fixture" => opts.fixture = non_empty(val.to_string()),
                        "--items" => opts.items = parse_value("--items", val)?,
                        "--days" => opts.days = parse_value("--days", val)?,
                        "--page-size" => opts.page_size = parse_value("--page-size", val)?,
                        "--initial-page" => {
                            opts.initial_page = parse_value("--initial-page", val)?;
                        }
                        "--latency-ms" => opts.latency_ms = parse_value("--latency-ms", val)?,
                        "--tick-ms" => opts.tick_ms = parse_value("--tick-ms", val)?,
                        "--scroll-step" => opts.scroll_step = parse_value("--scroll-step", val)?,
                        "--height" => opts.height = parse_value("--height", val)?,
                        "--today" => opts.today = non_empty(val.to_string()),
                        "--max-ticks" => opts.max_ticks = parse_value("--max-ticks", val)?,
                        "--jsonl" => opts.jsonl = non_empty(val.to_string()),
                        _ => return Err(ParseError::UnknownArg(other.to_string())),
                    }
                }
            }
        }

        if opts.page_size == 0 {
            return Err(ParseError::InvalidValue {
                flag: "--page-size",
                value: "0".into(),
            });
        }
        if opts.days == 0 {
            return Err(ParseError::InvalidValue {
                flag: "--days",
                value: "0".into(),
            });
        }
        Ok(opts)
    }
}
