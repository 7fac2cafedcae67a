#![forbid(unsafe_code)]

//! Scripted-scroll driver on a simulated clock.
//!
//! Each tick advances the clock by one frame, lands any fetch whose latency
//! has elapsed, scrolls one step, lets the timeline's throttle decide whether
//! to evaluate, and records the resulting state. The script scrolls down
//! until the forward edge is exhausted, then up until the backward edge is.

use std::io::{self, Write};
use std::time::Duration;

use ftui_timeline::item::parse_day;
use ftui_timeline::{
    FetchPhase, FetchRequest, Item, PagedSource, Row, Timeline, TimelineConfig, Viewport,
    VirtualViewport,
};
use serde::Serialize;
use time::Date;
use time::macros::format_description;
use tracing::{info, warn};
use web_time::Instant;

/// Harness parameters.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub height: u16,
    pub page_size: usize,
    pub initial_page: usize,
    pub latency: Duration,
    pub tick: Duration,
    pub scroll_step: u32,
    pub max_ticks: u64,
    pub today: Date,
    pub timeline: TimelineConfig,
}

/// Where the script is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPhase {
    Down,
    Up,
    Done,
}

/// End-of-run totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub fetches: u64,
    pub failures: u64,
    pub items: usize,
    pub rows: usize,
    pub evaluations: u64,
    pub renders: u64,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
struct JsonlTickRecord<'a> {
    tick: u64,
    elapsed_ms: u64,
    script: ScrollPhase,
    phase: &'a str,
    scroll_top: u32,
    visible_start: Option<usize>,
    visible_end: Option<usize>,
    active_header: Option<&'a str>,
    header_label: Option<String>,
    rows: usize,
    items: usize,
    shift: bool,
    has_forward: bool,
    has_backward: bool,
}

/// Display label for a header row.
///
/// Today's group reads `Today, Wed, Mar 20`; other groups drop the prefix.
/// Keys that are not ISO days are shown verbatim.
#[must_use]
pub fn header_label(key: &str, is_today: bool) -> String {
    let pretty = parse_day(key)
        .ok()
        .and_then(|day| {
            day.format(format_description!(
                "[weekday repr:short], [month repr:short] [day padding:none]"
            ))
            .ok()
        })
        .unwrap_or_else(|| key.to_string());
    if is_today {
        format!("Today, {pretty}")
    } else {
        pretty
    }
}

fn phase_name(phase: FetchPhase) -> &'static str {
    match phase {
        FetchPhase::Idle => "idle",
        FetchPhase::Loading => "loading",
        FetchPhase::FetchingForward => "fetching_forward",
        FetchPhase::FetchingBackward => "fetching_backward",
    }
}

/// A fetch waiting out its simulated latency.
#[derive(Debug)]
struct InFlight {
    request: FetchRequest,
    due: Instant,
}

/// Drives one timeline through the scripted scroll.
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    timeline: Timeline<VirtualViewport>,
    source: PagedSource,
    origin: Instant,
    now: Instant,
    in_flight: Option<InFlight>,
    script: ScrollPhase,
    ticks: u64,
    fetches: u64,
    failures: u64,
}

impl Harness {
    /// Build a harness over `items`.
    #[must_use]
    pub fn new(items: Vec<Item>, config: HarnessConfig) -> Self {
        let source =
            PagedSource::new(items, config.page_size).with_initial_page(config.initial_page);
        let viewport = VirtualViewport::new(config.height);
        let timeline = Timeline::new(viewport, config.timeline.clone(), config.today);
        let origin = Instant::now();
        Self {
            config,
            timeline,
            source,
            origin,
            now: origin,
            in_flight: None,
            script: ScrollPhase::Down,
            ticks: 0,
            fetches: 0,
            failures: 0,
        }
    }

    /// The timeline being driven.
    #[must_use]
    pub fn timeline(&self) -> &Timeline<VirtualViewport> {
        &self.timeline
    }

    /// The data source, for failure injection.
    pub fn source_mut(&mut self) -> &mut PagedSource {
        &mut self.source
    }

    /// Run the script to completion (or `max_ticks`), writing one JSONL
    /// record per tick to `out`.
    pub fn run<W: Write>(&mut self, out: &mut W) -> io::Result<RunSummary> {
        if let Some(request) = self.timeline.start_at(self.now) {
            self.dispatch(request);
        }
        while self.script != ScrollPhase::Done && self.ticks < self.config.max_ticks {
            self.step();
            self.write_record(out)?;
        }
        out.flush()?;

        let summary = self.summary();
        if summary.completed {
            info!(ticks = summary.ticks, items = summary.items, "scripted scroll finished");
        } else {
            warn!(ticks = summary.ticks, items = summary.items, "tick limit reached");
        }
        Ok(summary)
    }

    /// Advance one frame.
    pub fn step(&mut self) {
        self.ticks += 1;
        self.now += self.config.tick;
        self.land_due_fetch();
        // A failed initial load restarts once its backoff has elapsed.
        if self.in_flight.is_none()
            && let Some(request) = self.timeline.start_at(self.now)
        {
            self.dispatch(request);
        }

        let step = i64::from(self.config.scroll_step);
        let idle = self.in_flight.is_none() && self.timeline.is_loaded();
        let cursors = self.timeline.cursors();
        let (has_forward, has_backward) = (cursors.has_forward(), cursors.has_backward());

        match self.script {
            ScrollPhase::Down => {
                let viewport = self.timeline.viewport_mut();
                viewport.scroll_by(step);
                if viewport.is_at_bottom() && !has_forward && idle {
                    self.script = ScrollPhase::Up;
                }
            }
            ScrollPhase::Up => {
                let viewport = self.timeline.viewport_mut();
                viewport.scroll_by(-step);
                if viewport.scroll_top() == 0 && !has_backward && idle {
                    self.script = ScrollPhase::Done;
                }
            }
            ScrollPhase::Done => {}
        }

        self.timeline.on_scroll_at(self.now);
        if let Some(request) = self.timeline.poll_at(self.now) {
            self.dispatch(request);
        }
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            fetches: self.fetches,
            failures: self.failures,
            items: self.timeline.items().len(),
            rows: self.timeline.rows().len(),
            evaluations: self.timeline.evaluations(),
            renders: self.timeline.viewport().render_count(),
            completed: self.script == ScrollPhase::Done,
        }
    }

    // --- Internal ---

    fn dispatch(&mut self, request: FetchRequest) {
        self.fetches += 1;
        let due = self.now + self.config.latency;
        self.in_flight = Some(InFlight { request, due });
    }

    fn land_due_fetch(&mut self) {
        let now = self.now;
        let Some(flight) = self.in_flight.take_if(|f| f.due <= now) else {
            return;
        };
        match self
            .timeline
            .resolve_with(&mut self.source, &flight.request, self.now)
        {
            Ok(outcome) => {
                if let Some(follow_up) = outcome.follow_up {
                    self.dispatch(follow_up);
                }
            }
            Err(err) => {
                self.failures += 1;
                warn!(ticket = %flight.request.ticket, "{err}");
            }
        }
    }

    fn write_record<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let rows = self.timeline.rows();
        let range = self.timeline.viewport().visible_range();
        let header = self
            .timeline
            .active_header_index()
            .and_then(|i| rows.get(i))
            .and_then(|row| match row {
                Row::Header { key, is_today, .. } => Some((key.as_str(), *is_today)),
                Row::Item { .. } => None,
            });
        let cursors = self.timeline.cursors();
        let record = JsonlTickRecord {
            tick: self.ticks,
            elapsed_ms: u64::try_from((self.now - self.origin).as_millis()).unwrap_or(u64::MAX),
            script: self.script,
            phase: phase_name(self.timeline.phase()),
            scroll_top: self.timeline.viewport().scroll_top(),
            visible_start: range.map(|r| r.start),
            visible_end: range.map(|r| r.end),
            active_header: header.map(|(key, _)| key),
            header_label: header.map(|(key, is_today)| header_label(key, is_today)),
            rows: rows.len(),
            items: self.timeline.items().len(),
            shift: self.timeline.shift(),
            has_forward: cursors.has_forward(),
            has_backward: cursors.has_backward(),
        };
        let line = serde_json::to_string(&record).map_err(io::Error::other)?;
        writeln!(out, "{line}")
    }
}
