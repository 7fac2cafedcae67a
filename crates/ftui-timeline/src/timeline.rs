#![forbid(unsafe_code)]

//! Scroll orchestration: the single entry point for scroll events and
//! fetch completions.
//!
//! # Tick
//!
//! Each throttled evaluation:
//!
//! 1. reads the viewport's visible range,
//! 2. resolves and stores the sticky header,
//! 3. stops if any fetch is in flight,
//! 4. otherwise asks the pagination controller for a fetch.
//!
//! # Completion
//!
//! A successful page is merged at its end of the loaded sequence, groups
//! and rows are recomputed from scratch, and the viewport re-renders. A
//! backward page renders in shift mode anchored on the first visible item
//! row when the page landed (the top row when only headers are visible);
//! shift mode is released after that render.
//!
//! Whenever the sticky header changes, the viewport is told to keep it
//! mounted.
//!
//! ```ignore
//! let mut timeline = Timeline::new(VirtualViewport::new(40), TimelineConfig::default(), today);
//! let first = timeline.start().expect("fresh timeline");
//! spawn_fetch(first);
//!
//! // event loop
//! on_scroll => timeline.on_scroll_at(now),
//! on_timer  => if let Some(req) = timeline.poll_at(now) { spawn_fetch(req) },
//! on_page   => {
//!     let outcome = timeline.complete_at(ticket, result, now)?;
//!     if let Some(req) = outcome.follow_up { spawn_fetch(req) }
//! }
//! ```

use time::Date;
use tracing::{debug, debug_span, error, info};
use web_time::Instant;

use crate::config::TimelineConfig;
use crate::error::{FetchError, TimelineError};
use crate::grouper::{Group, group_items};
use crate::item::{Item, Page};
use crate::pagination::{
    FetchKind, FetchPhase, FetchRequest, FetchState, FetchTicket, PaginationController,
    PaginationCursors,
};
use crate::rows::{Row, RowKey, RowSet};
use crate::source::PageSource;
use crate::sticky::active_header;
use crate::throttle::ScrollThrottle;
use crate::viewport::{RenderPass, Viewport, VisibleRange};

/// Result of merging one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// What the page was for.
    pub kind: FetchKind,
    /// Items merged.
    pub added: usize,
    /// The page was empty and its edge is now exhausted.
    pub exhausted: bool,
    /// The render for this page ran in shift mode.
    pub shifted: bool,
    /// Fetch to issue immediately (the first-load backward seed).
    pub follow_up: Option<FetchRequest>,
}

/// A windowed, bidirectionally paginated, date-grouped timeline.
#[derive(Debug)]
pub struct Timeline<V> {
    config: TimelineConfig,
    viewport: V,
    today: Date,
    /// Every loaded item, oldest first.
    items: Vec<Item>,
    groups: Vec<Group>,
    rows: RowSet,
    pagination: PaginationController,
    throttle: ScrollThrottle,
    active_header: Option<usize>,
    /// Engaged from backward issuance until the prepend has rendered.
    shift: bool,
    last_range: Option<VisibleRange>,
    last_error: Option<TimelineError>,
    evaluations: u64,
}

impl<V: Viewport> Timeline<V> {
    /// Create an empty timeline around `viewport`.
    pub fn new(viewport: V, config: TimelineConfig, today: Date) -> Self {
        Self {
            pagination: PaginationController::new(config.clone()),
            throttle: ScrollThrottle::new(config.throttle_interval),
            config,
            viewport,
            today,
            items: Vec::new(),
            groups: Vec::new(),
            rows: RowSet::default(),
            active_header: None,
            shift: false,
            last_range: None,
            last_error: None,
            evaluations: 0,
        }
    }

    // ---------------------------------------------------------------
    // Host-facing state
    // ---------------------------------------------------------------

    /// Projected rows for the current pass.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        self.rows.rows()
    }

    /// The full row projection, including header lookups.
    #[must_use]
    pub fn row_set(&self) -> &RowSet {
        &self.rows
    }

    /// Current groups.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Every loaded item, oldest first.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Header row to pin at the top of the viewport.
    #[must_use]
    pub fn active_header_index(&self) -> Option<usize> {
        self.active_header
    }

    /// Whether shift mode is engaged for the upcoming render.
    #[must_use]
    pub fn shift(&self) -> bool {
        self.shift
    }

    /// Pagination phase.
    #[must_use]
    pub fn phase(&self) -> FetchPhase {
        self.pagination.phase()
    }

    /// Loading flags.
    #[must_use]
    pub fn fetch_state(&self) -> FetchState {
        self.pagination.fetch_state()
    }

    /// Whether the initial page is still loading.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pagination.phase() == FetchPhase::Loading
    }

    /// Whether the initial page has landed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.pagination.is_loaded()
    }

    /// Continuation cursors.
    #[must_use]
    pub fn cursors(&self) -> &PaginationCursors {
        self.pagination.cursors()
    }

    /// Header row of the group holding the recent item.
    #[must_use]
    pub fn recent_row_index(&self) -> Option<usize> {
        self.rows.recent_header()
    }

    /// Visible range observed by the last evaluation.
    #[must_use]
    pub fn last_range(&self) -> Option<VisibleRange> {
        self.last_range
    }

    /// Most recent error, cleared by the next successful load.
    #[must_use]
    pub fn last_error(&self) -> Option<&TimelineError> {
        self.last_error.as_ref()
    }

    /// Evaluations run so far.
    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// When the host should call [`poll_at`](Self::poll_at) next.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// The reference date for recency.
    #[must_use]
    pub fn today(&self) -> Date {
        self.today
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// The windowing primitive.
    #[must_use]
    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// The windowing primitive, for scrolling and measuring.
    ///
    /// Follow scroll changes with [`on_scroll_at`](Self::on_scroll_at).
    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    // ---------------------------------------------------------------
    // Driving
    // ---------------------------------------------------------------

    /// Issue the initial load. `None` if already loaded or loading.
    pub fn start(&mut self) -> Option<FetchRequest> {
        self.start_at(Instant::now())
    }

    /// Issue the initial load at `now`.
    ///
    /// After a failed initial load this also returns `None` until the retry
    /// backoff has elapsed.
    pub fn start_at(&mut self, now: Instant) -> Option<FetchRequest> {
        self.pagination.start_at(now)
    }

    /// Note a raw scroll event.
    pub fn on_scroll_at(&mut self, now: Instant) {
        self.throttle.notify_at(now);
    }

    /// Run the throttled evaluation if its window has closed.
    pub fn poll_at(&mut self, now: Instant) -> Option<FetchRequest> {
        if !self.throttle.poll_at(now) {
            return None;
        }
        self.evaluate_at(now)
    }

    /// Run one evaluation immediately, bypassing the throttle.
    pub fn evaluate_at(&mut self, now: Instant) -> Option<FetchRequest> {
        self.evaluations += 1;
        let _span = debug_span!("timeline_tick", evaluation = self.evaluations).entered();

        let range = self.checked_range()?;
        self.last_range = Some(range);
        let header = active_header(self.rows.header_indices(), range.start);
        if header != self.active_header {
            self.pin_header(header);
        }

        if self.pagination.is_in_flight() {
            debug!(phase = ?self.pagination.phase(), "fetch in flight; skipping pagination");
            return None;
        }

        let request = self.pagination.evaluate(range, self.rows.len(), now)?;
        if request.kind == FetchKind::Backward {
            self.shift = true;
        }
        Some(request)
    }

    /// Feed back the result of a fetch.
    pub fn complete_at(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page, FetchError>,
        now: Instant,
    ) -> Result<LoadOutcome, TimelineError> {
        let accepted = match self.pagination.complete(ticket, result, now) {
            Ok(accepted) => accepted,
            Err(err) => {
                if matches!(err, TimelineError::FetchFailure { .. }) {
                    // No prepend is coming.
                    self.shift = false;
                } else {
                    error!("{err}");
                }
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };
        self.last_error = None;

        // Identities to carry across the re-projection.
        let anchor = self.anchor_row().map(Row::key);
        let pinned = self
            .active_header
            .and_then(|i| self.rows.get(i))
            .map(Row::key);

        let added = accepted.items.len();
        match accepted.kind {
            FetchKind::Initial => self.items = accepted.items,
            FetchKind::Forward => self.items.extend(accepted.items),
            FetchKind::Backward => {
                let mut merged = accepted.items;
                merged.append(&mut self.items);
                self.items = merged;
            }
        }

        let shifted = accepted.kind == FetchKind::Backward && self.shift && added > 0;
        self.recompute();
        self.render_pass(shifted, anchor, pinned.as_ref());
        if accepted.kind == FetchKind::Backward {
            self.shift = false;
        }

        let mut follow_up = None;
        if accepted.kind == FetchKind::Initial && added > 0 && self.config.seed_backward {
            follow_up = self.pagination.seed_backward(self.rows.len());
            if follow_up.is_some() {
                self.shift = true;
            }
        }

        info!(
            kind = ?accepted.kind,
            added,
            rows = self.rows.len(),
            shifted,
            "timeline updated"
        );

        Ok(LoadOutcome {
            kind: accepted.kind,
            added,
            exhausted: accepted.exhausted,
            shifted,
            follow_up,
        })
    }

    /// Run `request` against `source` synchronously and complete it.
    pub fn resolve_with<S: PageSource>(
        &mut self,
        source: &mut S,
        request: &FetchRequest,
        now: Instant,
    ) -> Result<LoadOutcome, TimelineError> {
        let result = source.fetch_page(request);
        self.complete_at(request.ticket, result, now)
    }

    /// Scroll the recent group's header to the top.
    ///
    /// The move counts as a scroll event, so the next poll re-evaluates
    /// pagination at the new position.
    pub fn jump_to_recent_at(&mut self, now: Instant) -> Result<usize, TimelineError> {
        let index = self.rows.recent_header().ok_or(TimelineError::NotReady)?;
        self.viewport.scroll_to_index(index);
        self.throttle.notify_at(now);
        debug!(index, "jumped to recent group");
        Ok(index)
    }

    /// Change the reference date and recompute recency.
    pub fn set_today(&mut self, today: Date) {
        if today == self.today {
            return;
        }
        self.today = today;
        let pinned = self
            .active_header
            .and_then(|i| self.rows.get(i))
            .map(Row::key);
        self.recompute();
        self.render_pass(false, None, pinned.as_ref());
    }

    /// Re-render without data changes (after a resize, for instance).
    pub fn rerender(&mut self) {
        let pinned = self
            .active_header
            .and_then(|i| self.rows.get(i))
            .map(Row::key);
        self.render_pass(false, None, pinned.as_ref());
    }

    // --- Internal ---

    fn recompute(&mut self) {
        self.groups = group_items(&self.items, self.today);
        self.rows = RowSet::project(&self.groups);
    }

    fn render_pass(&mut self, shift: bool, anchor: Option<RowKey>, pinned: Option<&RowKey>) {
        let keep_mounted = pinned
            .and_then(|key| self.rows.position_of(key))
            .into_iter()
            .collect();
        let pass = RenderPass {
            shift,
            anchor: if shift { anchor } else { None },
            keep_mounted,
        };
        self.viewport.render(self.rows.rows(), &pass);
        self.refresh_sticky();
    }

    fn refresh_sticky(&mut self) {
        let header = match self.viewport.visible_range() {
            Some(range) if range.start < self.rows.len() => {
                active_header(self.rows.header_indices(), range.start)
            }
            _ => self.rows.header_indices().first().copied(),
        };
        // The render pass replaced the viewport's keep-mounted set.
        self.pin_header(header);
    }

    fn pin_header(&mut self, header: Option<usize>) {
        self.active_header = header;
        self.viewport.keep_mounted(header.as_slice());
    }

    /// Row to hold still across a prepend: the first visible item row,
    /// else the first visible row.
    fn anchor_row(&self) -> Option<&Row> {
        let range = self.viewport.visible_range()?;
        let end = range.end.min(self.rows.len().checked_sub(1)?);
        let visible = self.rows.rows().get(range.start..=end)?;
        visible
            .iter()
            .find(|row| !row.is_header())
            .or_else(|| visible.first())
    }

    /// The viewport's range, validated against the row sequence.
    fn checked_range(&mut self) -> Option<VisibleRange> {
        let range = self.viewport.visible_range()?;
        let len = self.rows.len();
        if range.start <= range.end && range.end < len {
            return Some(range);
        }
        let err = TimelineError::IndexInconsistency {
            start: range.start,
            end: range.end,
            len,
        };
        if self.config.strict_indices {
            panic!("{err}");
        }
        error!("{err}");
        self.last_error = Some(err);
        None
    }
}
