#![forbid(unsafe_code)]

//! Data-layer contract and an in-memory paged source.

use tracing::trace;

use crate::error::FetchError;
use crate::item::{Cursor, Item, Page};
use crate::pagination::FetchRequest;

/// Something that can serve timeline pages.
///
/// A request with no cursor asks for the initial page. Implementations must
/// tolerate the same request being issued again after a failure.
pub trait PageSource {
    /// Serve one page.
    fn fetch_page(&mut self, request: &FetchRequest) -> Result<Page, FetchError>;
}

/// Pages over an owned, chronologically ordered item list.
///
/// Cursors are page numbers rendered as strings. Pages are `page_size`
/// long; the initial request starts at `initial_page`, so the first load can
/// land in the middle of the list.
#[derive(Debug, Clone)]
pub struct PagedSource {
    items: Vec<Item>,
    page_size: usize,
    initial_page: usize,
    /// Fail this many upcoming fetches.
    pending_failures: u32,
    fetches: u64,
}

impl PagedSource {
    /// Create a source serving `items` in pages of `page_size` (min 1).
    #[must_use]
    pub fn new(items: Vec<Item>, page_size: usize) -> Self {
        Self {
            items,
            page_size: page_size.max(1),
            initial_page: 0,
            pending_failures: 0,
            fetches: 0,
        }
    }

    /// Serve the initial request from `page` (clamped to the last page).
    #[must_use]
    pub fn with_initial_page(mut self, page: usize) -> Self {
        self.initial_page = page;
        self
    }

    /// Make the next `count` fetches fail.
    pub fn fail_next(&mut self, count: u32) {
        self.pending_failures = count;
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    /// Fetches served or failed so far.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    /// Build page `page` directly.
    #[must_use]
    pub fn page(&self, page: usize) -> Page {
        let start = page.saturating_mul(self.page_size).min(self.items.len());
        let end = start.saturating_add(self.page_size).min(self.items.len());
        let last = self.page_count().saturating_sub(1);
        Page {
            items: self.items[start..end].to_vec(),
            next_cursor: (page < last).then(|| Cursor::new((page + 1).to_string())),
            prev_cursor: (page > 0).then(|| Cursor::new((page - 1).to_string())),
        }
    }
}

impl PageSource for PagedSource {
    fn fetch_page(&mut self, request: &FetchRequest) -> Result<Page, FetchError> {
        self.fetches += 1;
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(FetchError::new("injected failure"));
        }
        let page = match &request.cursor {
            None => self.initial_page.min(self.page_count().saturating_sub(1)),
            Some(cursor) => cursor
                .as_str()
                .parse::<usize>()
                .map_err(|_| FetchError::new(format!("malformed cursor {cursor:?}")))?,
        };
        trace!(page, kind = ?request.kind, "serving page");
        Ok(self.page(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;
    use crate::pagination::PaginationController;
    use time::macros::date;

    fn source(n: u64, size: usize) -> PagedSource {
        let items = (0..n)
            .map(|i| Item::on(i, format!("i{i}"), date!(2024 - 01 - 01)))
            .collect();
        PagedSource::new(items, size)
    }

    #[test]
    fn pages_carry_neighbor_cursors() {
        let s = source(250, 100);
        assert_eq!(s.page_count(), 3);
        let first = s.page(0);
        assert_eq!(first.items.len(), 100);
        assert_eq!(first.next_cursor, Some(Cursor::new("1")));
        assert_eq!(first.prev_cursor, None);
        let last = s.page(2);
        assert_eq!(last.items.len(), 50);
        assert_eq!(last.next_cursor, None);
        assert_eq!(last.prev_cursor, Some(Cursor::new("1")));
    }

    #[test]
    fn initial_request_uses_clamped_initial_page() {
        let mut s = source(250, 100).with_initial_page(5);
        let mut c = PaginationController::new(TimelineConfig::default());
        let req = c.start().unwrap();
        let page = s.fetch_page(&req).unwrap();
        assert_eq!(page.items[0].id.0, 200);
    }

    #[test]
    fn malformed_cursor_is_a_fetch_error() {
        let mut s = source(10, 5);
        let mut c = PaginationController::new(TimelineConfig::default());
        let mut req = c.start().unwrap();
        req.cursor = Some(Cursor::new("not-a-page"));
        assert!(s.fetch_page(&req).is_err());
    }

    #[test]
    fn injected_failures_are_consumed() {
        let mut s = source(10, 5);
        s.fail_next(1);
        let mut c = PaginationController::new(TimelineConfig::default());
        let req = c.start().unwrap();
        assert!(s.fetch_page(&req).is_err());
        assert!(s.fetch_page(&req).is_ok());
        assert_eq!(s.fetch_count(), 2);
    }
}
