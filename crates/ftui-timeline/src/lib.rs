#![forbid(unsafe_code)]

//! Timeline: a windowed, date-grouped list of unbounded length that pages
//! in both directions as the user scrolls.
//!
//! # Role in FrankenTUI
//! `ftui-timeline` is policy, not painting. It decides which rows exist,
//! which header is pinned, when to fetch older or newer pages, and how to
//! keep the user's place when older rows are prepended. Painting headers,
//! cards, and loading indicators is the host's job.
//!
//! # Pipeline
//!
//! ```text
//! scroll event ─► ScrollThrottle ─► Timeline::evaluate_at
//!                                      ├─► sticky::active_header
//!                                      └─► PaginationController::evaluate ─► FetchRequest
//! page ─► Timeline::complete_at ─► grouper ─► RowSet::project ─► Viewport::render (shift?)
//! ```
//!
//! Every data change recomputes groups and rows wholesale; the only state
//! with identity across renders is the pagination state (cursors, markers,
//! in-flight fetch) and the scroll throttle.
//!
//! # Concurrency
//! Everything runs on the host's UI thread. Fetches are the only suspension
//! points: the engine emits [`FetchRequest`]s and the host feeds results
//! back, in any async style, through [`Timeline::complete_at`]. At most one
//! fetch is outstanding at a time.

pub mod config;
pub mod error;
pub mod grouper;
pub mod item;
pub mod pagination;
pub mod rows;
pub mod source;
pub mod sticky;
pub mod throttle;
pub mod timeline;
pub mod viewport;

pub use config::TimelineConfig;
pub use error::{FetchError, TimelineError};
pub use grouper::{Group, group_items, recent_index};
pub use item::{Cursor, Direction, Item, ItemId, Page};
pub use pagination::{
    FetchKind, FetchPhase, FetchRequest, FetchState, FetchTicket, PaginationController,
    PaginationCursors,
};
pub use rows::{Row, RowKey, RowSet};
pub use source::{PageSource, PagedSource};
pub use sticky::active_header;
pub use throttle::ScrollThrottle;
pub use timeline::{LoadOutcome, Timeline};
pub use viewport::{RenderPass, RowHeights, Viewport, VirtualViewport, VisibleRange};
