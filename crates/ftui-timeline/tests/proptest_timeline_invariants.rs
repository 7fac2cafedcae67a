//! Property-based invariant tests for the timeline engine.
//!
//! **Grouping:**
//! 1. Concatenating group items reproduces the input order.
//! 2. Group keys are unique and in first-occurrence order.
//! 3. A non-empty input has exactly one recent group, holding the last item
//!    dated on or before today (or the first item when none is).
//!
//! **Rows:**
//! 4. Row indices are dense and zero-based.
//! 5. Row count is item count plus group count.
//! 6. Header indices list exactly the header rows, ascending.
//!
//! **Sticky header:**
//! 7. The active header is a header at or before the first visible row,
//!    with no other header in between (or the first header when none
//!    precedes it).
//!
//! **Throttle:**
//! 8. Two firings are never closer than the interval.
//! 9. Every burst of notifications is eventually followed by a firing.
//!
//! **Orchestration:**
//! 10. At most one fetch flag is set at any time.
//! 11. Loaded items never contain duplicates and stay in source order.
//! 12. No panics on arbitrary scroll and completion sequences.
//! 13. The active header is always mounted, on-screen or not.

use std::collections::HashSet;
use std::time::Duration;

use ftui_timeline::{
    FetchRequest, Item, PagedSource, Row, RowSet, ScrollThrottle, Timeline, TimelineConfig,
    Viewport, VirtualViewport, active_header, group_items, recent_index,
};
use proptest::prelude::*;
use time::Date;
use time::macros::date;
use web_time::Instant;

const TODAY: Date = date!(2024 - 01 - 15);

// ── Strategies ────────────────────────────────────────────────────────────

/// Items dated within a month around `TODAY`, in arbitrary date order.
fn items_strategy(max_len: usize) -> impl Strategy<Value = Vec<Item>> {
    proptest::collection::vec(0i64..30, 0..=max_len).prop_map(|offsets| {
        offsets
            .into_iter()
            .enumerate()
            .map(|(i, offset)| {
                let day = date!(2024 - 01 - 01) + time::Duration::days(offset);
                Item::on(i as u64, format!("item {i}"), day)
            })
            .collect()
    })
}

/// Chronologically sorted items, as a real source would serve them.
fn sorted_items_strategy(max_len: usize) -> impl Strategy<Value = Vec<Item>> {
    proptest::collection::vec(0i64..30, 1..=max_len).prop_map(|mut offsets| {
        offsets.sort_unstable();
        offsets
            .into_iter()
            .enumerate()
            .map(|(i, offset)| {
                let day = date!(2024 - 01 - 01) + time::Duration::days(offset);
                Item::on(i as u64, format!("item {i}"), day)
            })
            .collect()
    })
}

#[derive(Debug, Clone)]
enum Step {
    Scroll(i64),
    Wait(u64),
    Complete,
    Fail,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (-60i64..=60).prop_map(Step::Scroll),
        2 => (0u64..=250).prop_map(Step::Wait),
        2 => Just(Step::Complete),
        1 => Just(Step::Fail),
    ]
}

// ── Grouping ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn groups_preserve_input_order(items in items_strategy(80)) {
        let groups = group_items(&items, TODAY);
        let mut keys = HashSet::new();
        for group in &groups {
            prop_assert!(keys.insert(group.key.clone()), "duplicate key {}", group.key);
            prop_assert!(!group.items.is_empty());
            prop_assert!(group.items.iter().all(|i| i.date_key == group.key));
        }

        // Each key's members keep their relative order.
        for group in &groups {
            let expected: Vec<_> = items.iter().filter(|i| i.date_key == group.key).collect();
            let actual: Vec<_> = group.items.iter().collect();
            prop_assert_eq!(expected, actual);
        }

        // First-occurrence order.
        let mut seen = Vec::new();
        for item in &items {
            if !seen.contains(&item.date_key) {
                seen.push(item.date_key.clone());
            }
        }
        let order: Vec<_> = groups.iter().map(|g| g.key.clone()).collect();
        prop_assert_eq!(seen, order);
    }

    #[test]
    fn sorted_groups_concatenate_to_input(items in sorted_items_strategy(80)) {
        let groups = group_items(&items, TODAY);
        let flat: Vec<_> = groups.iter().flat_map(|g| g.items.iter().cloned()).collect();
        prop_assert_eq!(flat, items);
    }

    #[test]
    fn exactly_one_recent_group(items in items_strategy(80)) {
        let groups = group_items(&items, TODAY);
        let recent = groups.iter().filter(|g| g.is_recent).count();
        if items.is_empty() {
            prop_assert_eq!(recent, 0);
            prop_assert_eq!(recent_index(&items, TODAY), None);
        } else {
            prop_assert_eq!(recent, 1);
            let idx = recent_index(&items, TODAY).unwrap();
            match items.iter().rposition(|i| i.date <= TODAY) {
                Some(expected) => prop_assert_eq!(idx, expected),
                None => prop_assert_eq!(idx, 0),
            }
            let group = groups.iter().find(|g| g.is_recent).unwrap();
            prop_assert_eq!(&group.key, &items[idx].date_key);
        }
    }
}

// ── Rows and sticky header ────────────────────────────────────────────────

proptest! {
    #[test]
    fn rows_are_dense(items in items_strategy(80)) {
        let groups = group_items(&items, TODAY);
        let set = RowSet::project(&groups);
        prop_assert_eq!(set.len(), items.len() + groups.len());
        for (i, row) in set.rows().iter().enumerate() {
            prop_assert_eq!(row.index(), i);
        }
        let headers: Vec<usize> = set
            .rows()
            .iter()
            .filter(|r| r.is_header())
            .map(Row::index)
            .collect();
        prop_assert_eq!(set.header_indices(), headers.as_slice());
        prop_assert!(headers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn active_header_precedes_first_visible(
        items in items_strategy(80),
        start_seed in any::<usize>(),
    ) {
        let set = RowSet::project(&group_items(&items, TODAY));
        let headers = set.header_indices();
        if set.is_empty() {
            prop_assert_eq!(active_header(headers, 0), None);
            return Ok(());
        }
        let start = start_seed % set.len();
        let active = active_header(headers, start).unwrap();
        prop_assert!(set.rows()[active].is_header());
        // Row 0 is always a header, so one always precedes `start`.
        prop_assert!(active <= start);
        prop_assert!(!headers.iter().any(|&h| h > active && h <= start));
    }
}

// ── Throttle ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn throttle_respects_interval(
        interval_ms in 1u64..=200,
        gaps in proptest::collection::vec(0u64..=150, 1..60),
    ) {
        let interval = Duration::from_millis(interval_ms);
        let mut throttle = ScrollThrottle::new(interval);
        let origin = Instant::now();
        let mut now = origin;
        let mut fired = Vec::new();

        for gap in gaps {
            now += Duration::from_millis(gap);
            if throttle.poll_at(now) {
                fired.push(now);
            }
            throttle.notify_at(now);
        }
        // Drain the trailing window.
        if let Some(deadline) = throttle.deadline() {
            prop_assert!(throttle.poll_at(deadline));
            fired.push(deadline);
        }
        prop_assert!(!throttle.is_pending());
        prop_assert!(!fired.is_empty());
        for pair in fired.windows(2) {
            prop_assert!(pair[1] - pair[0] >= interval);
        }
    }
}

// ── Orchestration ─────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scripted_sessions_keep_invariants(
        total in 1u64..=300,
        page_size in 1usize..=60,
        initial_page in 0usize..=10,
        height in 1u16..=30,
        steps in proptest::collection::vec(step_strategy(), 1..120),
    ) {
        let items: Vec<Item> = (0..total)
            .map(|i| {
                let day = date!(2024 - 01 - 01) + time::Duration::days((i / 7) as i64);
                Item::on(i, format!("item {i}"), day)
            })
            .collect();
        let mut source = PagedSource::new(items, page_size).with_initial_page(initial_page);
        let mut timeline = Timeline::new(
            VirtualViewport::new(height).with_row_heights(1, 2),
            TimelineConfig::default().with_strict_indices(true),
            TODAY,
        );
        let mut now = Instant::now();
        let mut pending: Option<FetchRequest> = timeline.start();

        for step in steps {
            match step {
                Step::Scroll(delta) => {
                    timeline.viewport_mut().scroll_by(delta);
                    timeline.on_scroll_at(now);
                }
                Step::Wait(ms) => now += Duration::from_millis(ms),
                Step::Complete => {
                    if let Some(req) = pending.take() {
                        let outcome = timeline.resolve_with(&mut source, &req, now);
                        pending = outcome.ok().and_then(|o| o.follow_up);
                    }
                }
                Step::Fail => {
                    if let Some(req) = pending.take() {
                        source.fail_next(1);
                        prop_assert!(timeline.resolve_with(&mut source, &req, now).is_err());
                    }
                }
            }
            if let Some(req) = timeline.poll_at(now) {
                prop_assert!(pending.is_none(), "second fetch while one is in flight");
                pending = Some(req);
            }

            let state = timeline.fetch_state();
            let flags = [state.is_loading, state.is_fetching_forward, state.is_fetching_backward]
                .iter()
                .filter(|&&f| f)
                .count();
            prop_assert!(flags <= 1);
            prop_assert_eq!(flags == 1, pending.is_some());

            let ids: Vec<u64> = timeline.items().iter().map(|i| i.id.0).collect();
            prop_assert!(ids.windows(2).all(|w| w[0] + 1 == w[1]), "gap or duplicate: {:?}", ids);

            if let Some(range) = timeline.viewport().visible_range() {
                prop_assert!(range.end < timeline.rows().len());
            }
            if let Some(active) = timeline.active_header_index() {
                prop_assert!(timeline.rows()[active].is_header());
                prop_assert!(timeline.viewport().mounted().contains(&active));
            }
        }
    }
}
