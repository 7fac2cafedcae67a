#![forbid(unsafe_code)]

//! Windowing contract and a reference virtualized viewport.
//!
//! The engine consumes any [`Viewport`]: something that renders a row
//! sequence, mounts only what is near the viewport, and reports which rows
//! intersect it. [`VirtualViewport`] is a headless implementation with
//! per-row extents, used by the demo harness and by tests.
//!
//! # Shift mode
//!
//! When rows are inserted in front of the content the user is looking at,
//! every offset below the insertion grows. A render pass with
//! [`RenderPass::shift`] set keeps the *anchor row* at the same screen
//! position by moving the scroll offset by exactly the inserted extent.
//!
//! ```ignore
//! let mut vp = VirtualViewport::new(24).with_row_heights(2, 4);
//! vp.render(rows.rows(), &RenderPass::default());
//! vp.scroll_by(30);
//! let range = vp.visible_range(); // Some(VisibleRange { start, end })
//! ```

use std::collections::HashMap;
use std::ops::Range;

use crate::rows::{Row, RowKey};

/// Inclusive bounds of the rows intersecting the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisibleRange {
    /// First visible row.
    pub start: usize,
    /// Last visible row (inclusive).
    pub end: usize,
}

impl VisibleRange {
    /// Create a range; `start <= end` is expected but not enforced.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of rows covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    /// Whether `index` is covered.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }
}

/// Per-pass render options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPass {
    /// Hold the anchor row still while rows before it change.
    pub shift: bool,
    /// Row to hold still. Defaults to the first visible row.
    pub anchor: Option<RowKey>,
    /// Rows that must stay mounted even when off-screen.
    pub keep_mounted: Vec<usize>,
}

/// A windowing primitive the engine can drive.
///
/// `visible_range` must reflect the most recent `render` by the time it
/// returns; the orchestrator consults it synchronously.
pub trait Viewport {
    /// Rows currently intersecting the viewport, `None` when nothing is shown.
    fn visible_range(&self) -> Option<VisibleRange>;

    /// Replace the row sequence.
    fn render(&mut self, rows: &[Row], pass: &RenderPass);

    /// Bring row `index` to the top of the viewport, as far as possible.
    fn scroll_to_index(&mut self, index: usize);

    /// Replace the set of rows that must stay mounted even when off-screen.
    ///
    /// Takes effect immediately, without a render pass.
    fn keep_mounted(&mut self, indices: &[usize]);
}

/// Estimated extents used until a row is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeights {
    /// Header row extent.
    pub header: u16,
    /// Item row extent.
    pub item: u16,
}

impl Default for RowHeights {
    fn default() -> Self {
        Self { header: 1, item: 3 }
    }
}

/// Headless virtualized viewport with variable row extents.
///
/// Extents are in abstract cells (terminal rows, pixels). Measured extents
/// are keyed by [`RowKey`] so they survive re-projection.
#[derive(Debug, Clone)]
pub struct VirtualViewport {
    /// Viewport extent.
    height: u32,
    /// Offset of the viewport's top edge into the content.
    scroll_top: u32,
    /// Extra rows mounted above/below the visible range.
    overscan: usize,
    estimates: RowHeights,
    measured: HashMap<RowKey, u16>,
    keys: Vec<RowKey>,
    /// `offsets[i]` is the top of row `i`; `offsets[len]` is the total extent.
    offsets: Vec<u32>,
    keep_mounted: Vec<usize>,
    renders: u64,
    last_shift: i64,
}

impl VirtualViewport {
    /// Create an empty viewport of the given extent.
    #[must_use]
    pub fn new(height: u16) -> Self {
        Self {
            height: u32::from(height),
            scroll_top: 0,
            overscan: 2,
            estimates: RowHeights::default(),
            measured: HashMap::new(),
            keys: Vec::new(),
            offsets: vec![0],
            keep_mounted: Vec::new(),
            renders: 0,
            last_shift: 0,
        }
    }

    /// Set estimated header and item extents.
    #[must_use]
    pub fn with_row_heights(mut self, header: u16, item: u16) -> Self {
        self.estimates = RowHeights { header, item };
        self
    }

    /// Set overscan amount.
    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no rows are rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Viewport extent.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current scroll offset.
    #[must_use]
    pub fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    /// Total content extent.
    #[must_use]
    pub fn total_height(&self) -> u32 {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Largest valid scroll offset.
    #[must_use]
    pub fn max_scroll(&self) -> u32 {
        self.total_height().saturating_sub(self.height)
    }

    /// Renders performed so far.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Scroll compensation applied by the last shift-mode render.
    #[must_use]
    pub fn last_shift(&self) -> i64 {
        self.last_shift
    }

    /// Top offset of row `index`.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> Option<u32> {
        if index < self.len() {
            self.offsets.get(index).copied()
        } else {
            None
        }
    }

    /// Row occupying content offset `offset`.
    ///
    /// Row `i` occupies `[offsets[i], offsets[i + 1])`. Offsets past the end
    /// resolve to the last row.
    #[must_use]
    pub fn row_at_offset(&self, offset: u32) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let tops = &self.offsets[..self.len()];
        let idx = tops.partition_point(|&top| top <= offset).saturating_sub(1);
        Some(idx.min(self.len() - 1))
    }

    /// Key of row `index`.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&RowKey> {
        self.keys.get(index)
    }

    /// Change the viewport extent.
    pub fn set_height(&mut self, height: u16) {
        self.height = u32::from(height);
        self.clamp_scroll();
    }

    /// Scroll by `delta` cells (positive = towards the end).
    pub fn scroll_by(&mut self, delta: i64) {
        let target = (i64::from(self.scroll_top) + delta).clamp(0, i64::from(self.max_scroll()));
        self.scroll_top = u32::try_from(target).unwrap_or(u32::MAX);
    }

    /// Scroll to an absolute content offset.
    pub fn scroll_to_offset(&mut self, offset: u32) {
        self.scroll_top = offset;
        self.clamp_scroll();
    }

    /// Put row `index` at the top of the viewport (as far as possible).
    pub fn scroll_to_index(&mut self, index: usize) {
        if let Some(top) = self.offset_of(index.min(self.len().saturating_sub(1))) {
            self.scroll_to_offset(top);
        }
    }

    /// Scroll to the start.
    pub fn scroll_to_top(&mut self) {
        self.scroll_top = 0;
    }

    /// Scroll to the end.
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.max_scroll();
    }

    /// Whether the viewport shows the last row in full.
    #[must_use]
    pub fn is_at_bottom(&self) -> bool {
        self.scroll_top >= self.max_scroll()
    }

    /// Record a measured extent for row `index`.
    ///
    /// A correction to a row above the first visible row moves the scroll
    /// offset by the same amount so visible content does not jump.
    pub fn measure(&mut self, index: usize, height: u16) {
        let Some(key) = self.keys.get(index).cloned() else {
            return;
        };
        let old = self.extent_of(&key);
        if old == height {
            return;
        }
        let first_visible = self.row_at_offset(self.scroll_top);
        self.measured.insert(key, height);
        self.rebuild_offsets();
        if first_visible.is_some_and(|first| index < first) {
            let delta = i64::from(height) - i64::from(old);
            let target = (i64::from(self.scroll_top) + delta).max(0);
            self.scroll_top = u32::try_from(target).unwrap_or(u32::MAX);
        }
        self.clamp_scroll();
    }

    /// Rows to paint: the visible range widened by overscan.
    #[must_use]
    pub fn render_range(&self) -> Range<usize> {
        match self.visible_range() {
            Some(range) => {
                let start = range.start.saturating_sub(self.overscan);
                let end = range.end.saturating_add(self.overscan + 1).min(self.len());
                start..end
            }
            None => 0..0,
        }
    }

    /// Rows held mounted outside the render range.
    #[must_use]
    pub fn kept_mounted(&self) -> &[usize] {
        &self.keep_mounted
    }

    /// Every mounted row: the render range plus keep-mounted rows, ascending.
    #[must_use]
    pub fn mounted(&self) -> Vec<usize> {
        let mut mounted: Vec<usize> = self.render_range().collect();
        mounted.extend(self.keep_mounted.iter().copied().filter(|&i| i < self.len()));
        mounted.sort_unstable();
        mounted.dedup();
        mounted
    }

    // --- Internal ---

    fn extent_of(&self, key: &RowKey) -> u16 {
        if let Some(&h) = self.measured.get(key) {
            return h;
        }
        match key {
            RowKey::Header(_) => self.estimates.header,
            RowKey::Item(_) => self.estimates.item,
        }
    }

    fn rebuild_offsets(&mut self) {
        let mut offsets = Vec::with_capacity(self.keys.len() + 1);
        let mut top = 0u32;
        offsets.push(top);
        for key in &self.keys {
            top = top.saturating_add(u32::from(self.extent_of(key)));
            offsets.push(top);
        }
        self.offsets = offsets;
    }

    fn clamp_scroll(&mut self) {
        self.scroll_top = self.scroll_top.min(self.max_scroll());
    }
}

impl Viewport for VirtualViewport {
    fn visible_range(&self) -> Option<VisibleRange> {
        if self.is_empty() || self.height == 0 {
            return None;
        }
        let start = self.row_at_offset(self.scroll_top)?;
        let bottom = self.scroll_top.saturating_add(self.height - 1);
        let end = self.row_at_offset(bottom)?;
        Some(VisibleRange { start, end })
    }

    fn scroll_to_index(&mut self, index: usize) {
        VirtualViewport::scroll_to_index(self, index);
    }

    fn keep_mounted(&mut self, indices: &[usize]) {
        let len = self.len();
        self.keep_mounted = indices.iter().copied().filter(|&i| i < len).collect();
    }

    fn render(&mut self, rows: &[Row], pass: &RenderPass) {
        // Resolve the anchor against the old layout.
        let anchor = if pass.shift {
            let key = pass.anchor.clone().or_else(|| {
                self.row_at_offset(self.scroll_top)
                    .and_then(|i| self.keys.get(i).cloned())
            });
            key.and_then(|key| {
                let old_index = self.keys.iter().position(|k| *k == key)?;
                // Negative when the anchor starts below the top edge.
                let inset = i64::from(self.scroll_top) - i64::from(self.offsets[old_index]);
                Some((key, inset))
            })
        } else {
            None
        };

        let before = self.scroll_top;
        self.keys = rows.iter().map(Row::key).collect();
        self.rebuild_offsets();
        self.renders += 1;
        self.last_shift = 0;

        if let Some((key, inset)) = anchor
            && let Some(new_index) = self.keys.iter().position(|k| *k == key)
        {
            let target = (i64::from(self.offsets[new_index]) + inset).max(0);
            self.scroll_top = u32::try_from(target).unwrap_or(u32::MAX);
            self.last_shift = i64::from(self.scroll_top) - i64::from(before);
        }
        self.clamp_scroll();

        self.keep_mounted = pass
            .keep_mounted
            .iter()
            .copied()
            .filter(|&i| i < rows.len())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouper::group_items;
    use crate::item::{Item, ItemId};
    use crate::rows::RowSet;
    use time::Date;
    use time::macros::date;

    fn day(offset: i64) -> Date {
        date!(2024 - 01 - 01) + time::Duration::days(offset)
    }

    /// `days` groups of `per_day` items, ids starting at `first_id`.
    fn rows(first_id: u64, first_day: i64, days: i64, per_day: u64) -> RowSet {
        let mut items = Vec::new();
        let mut id = first_id;
        for d in 0..days {
            for _ in 0..per_day {
                items.push(Item::on(id, format!("item {id}"), day(first_day + d)));
                id += 1;
            }
        }
        RowSet::project(&group_items(&items, day(1000)))
    }

    // Header extent 1, item extent 3: each day block is 1 + 3 * per_day.
    fn viewport(height: u16) -> VirtualViewport {
        VirtualViewport::new(height).with_row_heights(1, 3).with_overscan(1)
    }

    #[test]
    fn empty_viewport_has_no_range() {
        let vp = viewport(10);
        assert_eq!(vp.visible_range(), None);
        assert_eq!(vp.render_range(), 0..0);
    }

    #[test]
    fn visible_range_covers_partial_rows() {
        let set = rows(0, 0, 3, 2); // rows: H I I H I I H I I, extents 1 3 3 ...
        let mut vp = viewport(5);
        vp.render(set.rows(), &RenderPass::default());
        assert_eq!(vp.total_height(), 21);
        // Offsets 0..5 hit the header (0) and items 1 (1..4), 2 (4..7).
        assert_eq!(vp.visible_range(), Some(VisibleRange::new(0, 2)));
        vp.scroll_by(7);
        assert_eq!(vp.visible_range(), Some(VisibleRange::new(3, 5)));
    }

    #[test]
    fn scroll_is_clamped() {
        let set = rows(0, 0, 2, 2);
        let mut vp = viewport(4);
        vp.render(set.rows(), &RenderPass::default());
        vp.scroll_by(10_000);
        assert_eq!(vp.scroll_top(), vp.max_scroll());
        assert!(vp.is_at_bottom());
        assert_eq!(vp.visible_range().map(|r| r.end), Some(set.len() - 1));
        vp.scroll_by(-10_000);
        assert_eq!(vp.scroll_top(), 0);
    }

    #[test]
    fn shift_render_keeps_anchor_at_top() {
        let newer = rows(100, 10, 3, 3);
        let mut vp = viewport(8);
        vp.render(newer.rows(), &RenderPass::default());
        vp.scroll_by(2); // top row is item 100, two cells into the first item
        let top_before = vp.key_at(vp.visible_range().unwrap().start).cloned();
        assert_eq!(top_before, Some(RowKey::Item(ItemId(100))));

        // Prepend two older days.
        let mut items: Vec<Item> = Vec::new();
        for (i, d) in [(0u64, 8i64), (1, 8), (2, 9)] {
            items.push(Item::on(i, "old", day(d)));
        }
        for row in newer.rows() {
            if let Row::Item { item, .. } = row {
                items.push(item.clone());
            }
        }
        let merged = RowSet::project(&group_items(&items, day(1000)));
        vp.render(
            merged.rows(),
            &RenderPass {
                shift: true,
                ..RenderPass::default()
            },
        );

        let top_after = vp.key_at(vp.visible_range().unwrap().start).cloned();
        assert_eq!(top_after, top_before);
        // Two headers and three items were inserted in front.
        assert_eq!(vp.last_shift(), 2 + 3 * 3);
    }

    #[test]
    fn non_shift_render_keeps_raw_offset() {
        let newer = rows(100, 10, 2, 2);
        let mut vp = viewport(4);
        vp.render(newer.rows(), &RenderPass::default());
        vp.scroll_by(3);
        let merged = rows(0, 0, 4, 2);
        vp.render(merged.rows(), &RenderPass::default());
        assert_eq!(vp.scroll_top(), 3);
        assert_eq!(vp.last_shift(), 0);
    }

    #[test]
    fn explicit_anchor_is_honored() {
        let set = rows(0, 0, 3, 2);
        let mut vp = viewport(4);
        vp.render(set.rows(), &RenderPass::default());
        vp.scroll_to_index(4); // item 2
        let anchor = vp.key_at(4).cloned();
        vp.render(
            set.rows(),
            &RenderPass {
                shift: true,
                anchor: anchor.clone(),
                keep_mounted: Vec::new(),
            },
        );
        assert_eq!(vp.key_at(vp.visible_range().unwrap().start), anchor.as_ref());
    }

    #[test]
    fn measuring_above_viewport_keeps_content_still() {
        let set = rows(0, 0, 4, 2);
        let mut vp = viewport(4);
        vp.render(set.rows(), &RenderPass::default());
        vp.scroll_to_index(6);
        let top = vp.visible_range().unwrap().start;
        vp.measure(1, 10); // grows by 7, above the viewport
        assert_eq!(vp.visible_range().unwrap().start, top);
        assert_eq!(vp.scroll_top(), vp.offset_of(6).unwrap());
    }

    #[test]
    fn measurements_survive_reprojection() {
        let set = rows(0, 0, 1, 2);
        let mut vp = viewport(4);
        vp.render(set.rows(), &RenderPass::default());
        vp.measure(1, 9);
        let total = vp.total_height();
        vp.render(set.rows(), &RenderPass::default());
        assert_eq!(vp.total_height(), total);
    }

    #[test]
    fn keep_mounted_rows_are_mounted() {
        let set = rows(0, 0, 10, 3);
        let mut vp = viewport(4);
        vp.render(
            set.rows(),
            &RenderPass {
                keep_mounted: vec![0, 10_000],
                ..RenderPass::default()
            },
        );
        vp.scroll_to_index(30);
        let mounted = vp.mounted();
        assert!(mounted.contains(&0));
        assert!(mounted.contains(&30));
        assert!(!mounted.contains(&10_000));
        assert!(mounted.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn keep_mounted_applies_without_render() {
        let set = rows(0, 0, 10, 3);
        let mut vp = viewport(4);
        vp.render(set.rows(), &RenderPass::default());
        vp.scroll_to_index(30);
        assert!(!vp.mounted().contains(&4));

        Viewport::keep_mounted(&mut vp, &[4, 10_000]);
        assert_eq!(vp.kept_mounted(), &[4]);
        assert!(vp.mounted().contains(&4));

        // The next render pass replaces the set.
        vp.render(set.rows(), &RenderPass::default());
        assert!(vp.kept_mounted().is_empty());
    }

    #[test]
    fn anchor_below_top_edge_keeps_screen_position() {
        // Offsets: H 0, I0 1, I1 4, H 7, I2 8, I3 11, H 14, I4 15, I5 18.
        let set = rows(0, 0, 3, 2);
        let mut vp = viewport(6);
        vp.render(set.rows(), &RenderPass::default());
        vp.scroll_to_offset(7);
        assert_eq!(vp.visible_range().map(|r| r.start), Some(3));
        let anchor = vp.key_at(4).cloned();
        assert_eq!(anchor, Some(RowKey::Item(ItemId(2))));

        // An older item joins the anchor's day, above the anchor.
        let items: Vec<Item> = [(0, 0), (1, 0), (50, 1), (2, 1), (3, 1), (4, 2), (5, 2)]
            .into_iter()
            .map(|(id, d)| Item::on(id, format!("item {id}"), day(d)))
            .collect();
        let merged = RowSet::project(&group_items(&items, day(1000)));
        vp.render(
            merged.rows(),
            &RenderPass {
                shift: true,
                anchor: anchor.clone(),
                keep_mounted: Vec::new(),
            },
        );

        // I2 moved to index 5, offset 11; it is still one cell below the top.
        assert_eq!(vp.key_at(5), anchor.as_ref());
        assert_eq!(vp.scroll_top(), 10);
        assert_eq!(vp.last_shift(), 3);
    }
}
