#![forbid(unsafe_code)]

//! Bidirectional pagination state machine.
//!
//! The controller never performs I/O. It hands out [`FetchRequest`]s, the
//! host runs them against the data layer however it likes (async task,
//! worker, synchronous call), and feeds the result back through
//! [`PaginationController::complete`] on the UI thread.
//!
//! # States
//!
//! ```text
//!            start()                       evaluate(): near end, has forward
//!   Idle ──────────────► Loading    Idle ───────────────────────► FetchingForward
//!    ▲                      │        ▲ ◄──────── complete ──────────────┘
//!    └──── complete ────────┘        │           evaluate(): near start, has backward
//!                                    └─────────────────────────────► FetchingBackward
//! ```
//!
//! # Invariants
//!
//! 1. At most one fetch is in flight, in any direction.
//! 2. Each direction fetches at most once per distinct row count.
//! 3. A failed fetch leaves cursors untouched and the edge retryable after
//!    a backoff.
//! 4. An empty page exhausts the edge it was fetched for.

use std::fmt;

use tracing::{debug, info, warn};
use web_time::Instant;

use crate::config::TimelineConfig;
use crate::error::{FetchError, TimelineError};
use crate::item::{Cursor, Direction, Item, Page};
use crate::viewport::VisibleRange;

/// Identifies one issued fetch so its completion can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch#{}", self.0)
    }
}

/// What a fetch is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// The first page, before any data is loaded.
    Initial,
    /// Newer content at the end.
    Forward,
    /// Older content at the front.
    Backward,
}

impl FetchKind {
    /// Direction of a paging fetch, `None` for the initial load.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Initial => None,
            Self::Forward => Some(Direction::Forward),
            Self::Backward => Some(Direction::Backward),
        }
    }
}

impl From<Direction> for FetchKind {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => Self::Forward,
            Direction::Backward => Self::Backward,
        }
    }
}

/// A fetch the host must run against the data layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Ticket to pass back on completion.
    pub ticket: FetchTicket,
    /// Initial load or paging direction.
    pub kind: FetchKind,
    /// Cursor to continue from; `None` asks for the initial page.
    pub cursor: Option<Cursor>,
}

/// Coarse controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Initial load in flight.
    Loading,
    /// Forward page in flight.
    FetchingForward,
    /// Backward page in flight.
    FetchingBackward,
}

/// Host-facing loading flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchState {
    /// Forward page in flight.
    pub is_fetching_forward: bool,
    /// Backward page in flight.
    pub is_fetching_backward: bool,
    /// Initial page in flight.
    pub is_loading: bool,
}

/// Continuation tokens for both ends of the loaded sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationCursors {
    /// Token for newer content.
    pub forward: Option<Cursor>,
    /// Token for older content.
    pub backward: Option<Cursor>,
}

impl PaginationCursors {
    /// Whether newer content may exist.
    #[must_use]
    pub fn has_forward(&self) -> bool {
        self.forward.is_some()
    }

    /// Whether older content may exist.
    #[must_use]
    pub fn has_backward(&self) -> bool {
        self.backward.is_some()
    }

    fn get(&self, direction: Direction) -> Option<&Cursor> {
        match direction {
            Direction::Forward => self.forward.as_ref(),
            Direction::Backward => self.backward.as_ref(),
        }
    }

    fn set(&mut self, direction: Direction, cursor: Option<Cursor>) {
        match direction {
            Direction::Forward => self.forward = cursor,
            Direction::Backward => self.backward = cursor,
        }
    }
}

/// A successful completion, ready to be merged by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// What the fetch was for.
    pub kind: FetchKind,
    /// Items to merge at the matching end.
    pub items: Vec<Item>,
    /// The page was empty and its edge is now exhausted.
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: FetchTicket,
    kind: FetchKind,
    rows_at_issue: usize,
}

/// Fetch-state owner and trigger policy.
#[derive(Debug, Clone)]
pub struct PaginationController {
    in_flight: Option<InFlight>,
    cursors: PaginationCursors,
    loaded: bool,
    /// Row count at which each direction last fetched.
    forward_fetched_at: Option<usize>,
    backward_fetched_at: Option<usize>,
    consecutive_failures: u32,
    retry_after: Option<Instant>,
    next_ticket: u64,
    config: TimelineConfig,
}

impl PaginationController {
    /// Create an idle controller with nothing loaded.
    #[must_use]
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            in_flight: None,
            cursors: PaginationCursors::default(),
            loaded: false,
            forward_fetched_at: None,
            backward_fetched_at: None,
            consecutive_failures: 0,
            retry_after: None,
            next_ticket: 0,
            config,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> FetchPhase {
        match self.in_flight.map(|f| f.kind) {
            None => FetchPhase::Idle,
            Some(FetchKind::Initial) => FetchPhase::Loading,
            Some(FetchKind::Forward) => FetchPhase::FetchingForward,
            Some(FetchKind::Backward) => FetchPhase::FetchingBackward,
        }
    }

    /// Loading flags for the host.
    #[must_use]
    pub fn fetch_state(&self) -> FetchState {
        let phase = self.phase();
        FetchState {
            is_fetching_forward: phase == FetchPhase::FetchingForward,
            is_fetching_backward: phase == FetchPhase::FetchingBackward,
            is_loading: phase == FetchPhase::Loading,
        }
    }

    /// Whether any fetch is outstanding.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Ticket of the outstanding fetch.
    #[must_use]
    pub fn in_flight_ticket(&self) -> Option<FetchTicket> {
        self.in_flight.map(|f| f.ticket)
    }

    /// Whether the initial page has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Current cursors.
    #[must_use]
    pub fn cursors(&self) -> &PaginationCursors {
        &self.cursors
    }

    /// Earliest time a failed edge may be fetched again.
    #[must_use]
    pub fn retry_after(&self) -> Option<Instant> {
        self.retry_after
    }

    /// Consecutive failed fetches since the last success.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Issue the initial load. `None` once loaded or while a fetch is out.
    pub fn start(&mut self) -> Option<FetchRequest> {
        self.start_at(Instant::now())
    }

    /// Issue the initial load at `now`, honoring the retry backoff left by
    /// a failed attempt.
    pub fn start_at(&mut self, now: Instant) -> Option<FetchRequest> {
        if self.loaded || self.in_flight.is_some() || self.backing_off(now) {
            return None;
        }
        Some(self.issue(FetchKind::Initial, None, 0))
    }

    /// Issue the unconditional backward fetch that follows the first load.
    pub fn seed_backward(&mut self, row_count: usize) -> Option<FetchRequest> {
        if !self.loaded || self.in_flight.is_some() {
            return None;
        }
        let cursor = self.cursors.backward.clone()?;
        Some(self.issue(FetchKind::Backward, Some(cursor), row_count))
    }

    /// Decide whether the visible range warrants a fetch.
    pub fn evaluate(
        &mut self,
        range: VisibleRange,
        row_count: usize,
        now: Instant,
    ) -> Option<FetchRequest> {
        if !self.loaded || self.in_flight.is_some() {
            return None;
        }
        if self.backing_off(now) {
            return None;
        }

        let near_end = range.end.saturating_add(self.config.lookahead) > row_count;
        let near_start = range.start < self.config.lookahead;

        if near_end && self.wants(Direction::Forward, row_count) {
            return self.issue_direction(Direction::Forward, row_count);
        }
        if near_start && self.wants(Direction::Backward, row_count) {
            return self.issue_direction(Direction::Backward, row_count);
        }
        None
    }

    /// Consume the result of the fetch identified by `ticket`.
    ///
    /// On success the caller must merge [`Accepted::items`] at the matching
    /// end. On failure the controller is idle again, cursors are unchanged,
    /// and the edge may retry once the backoff elapses.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page, FetchError>,
        now: Instant,
    ) -> Result<Accepted, TimelineError> {
        let flight = match self.in_flight {
            Some(flight) if flight.ticket == ticket => flight,
            other => {
                return Err(TimelineError::UnknownTicket {
                    ticket,
                    in_flight: other.map(|f| f.ticket),
                });
            }
        };
        self.in_flight = None;

        let page = match result {
            Ok(page) => page,
            Err(source) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                let backoff = self.config.backoff_for(self.consecutive_failures);
                self.retry_after = Some(now + backoff);
                if let Some(direction) = flight.kind.direction() {
                    self.set_marker(direction, None);
                }
                let err = TimelineError::FetchFailure {
                    direction: flight.kind.direction(),
                    source,
                };
                warn!(
                    %ticket,
                    failures = self.consecutive_failures,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "{err}"
                );
                return Err(err);
            }
        };

        self.consecutive_failures = 0;
        self.retry_after = None;
        let exhausted = page.items.is_empty();

        match flight.kind.direction() {
            None => {
                self.loaded = true;
                if exhausted {
                    self.cursors = PaginationCursors::default();
                } else {
                    self.cursors.forward = page.next_cursor;
                    self.cursors.backward = page.prev_cursor;
                }
            }
            Some(direction) => {
                let next = match direction {
                    Direction::Forward => page.next_cursor,
                    Direction::Backward => page.prev_cursor,
                };
                if exhausted {
                    let err = TimelineError::EmptyResult {
                        direction: Some(direction),
                        claimed_cursor: next.is_some(),
                    };
                    warn!(%ticket, "{err}");
                    self.cursors.set(direction, None);
                } else {
                    self.cursors.set(direction, next);
                }
            }
        }

        info!(
            %ticket,
            kind = ?flight.kind,
            items = page.items.len(),
            rows_at_issue = flight.rows_at_issue,
            has_forward = self.cursors.has_forward(),
            has_backward = self.cursors.has_backward(),
            "page loaded"
        );

        Ok(Accepted {
            kind: flight.kind,
            items: page.items,
            exhausted,
        })
    }

    // --- Internal ---

    fn backing_off(&self, now: Instant) -> bool {
        match self.retry_after {
            Some(deadline) if now < deadline => {
                debug!(failures = self.consecutive_failures, "pagination backing off");
                true
            }
            _ => false,
        }
    }

    fn wants(&self, direction: Direction, row_count: usize) -> bool {
        if self.cursors.get(direction).is_none() {
            return false;
        }
        let marker = match direction {
            Direction::Forward => self.forward_fetched_at,
            Direction::Backward => self.backward_fetched_at,
        };
        if marker == Some(row_count) {
            debug!(%direction, row_count, "already fetched at this row count");
            return false;
        }
        true
    }

    fn issue_direction(&mut self, direction: Direction, row_count: usize) -> Option<FetchRequest> {
        let cursor = self.cursors.get(direction).cloned()?;
        self.set_marker(direction, Some(row_count));
        Some(self.issue(direction.into(), Some(cursor), row_count))
    }

    fn set_marker(&mut self, direction: Direction, value: Option<usize>) {
        match direction {
            Direction::Forward => self.forward_fetched_at = value,
            Direction::Backward => self.backward_fetched_at = value,
        }
    }

    fn issue(&mut self, kind: FetchKind, cursor: Option<Cursor>, row_count: usize) -> FetchRequest {
        self.next_ticket += 1;
        let ticket = FetchTicket(self.next_ticket);
        self.in_flight = Some(InFlight {
            ticket,
            kind,
            rows_at_issue: row_count,
        });
        debug!(%ticket, ?kind, row_count, cursor = ?cursor.as_ref().map(Cursor::as_str), "fetch issued");
        FetchRequest {
            ticket,
            kind,
            cursor,
        }
    }
}
