#![forbid(unsafe_code)]

//! Date grouping and recent-item selection.
//!
//! The grouper always runs over the *entire* loaded sequence. Prepending
//! older items can move the "last item on or before today" marker, so there
//! is no incremental variant.
//!
//! # Invariants
//!
//! 1. Concatenating every group's items reproduces the input order.
//! 2. Group order is the first-occurrence order of each key.
//! 3. At most one group is recent, and exactly one when the input is non-empty.

use std::collections::HashMap;

use time::Date;

use crate::item::Item;

/// A run of items sharing a grouping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// The shared `date_key`.
    pub key: String,
    /// Member items in source order.
    pub items: Vec<Item>,
    /// Whether the recent item belongs to this group.
    pub is_recent: bool,
    /// Whether this group's day is `today`.
    pub is_today: bool,
}

/// Index of the recent item: the last item dated on or before `today`,
/// falling back to the first item. `None` for an empty sequence.
#[must_use]
pub fn recent_index(items: &[Item], today: Date) -> Option<usize> {
    if items.is_empty() {
        return None;
    }
    Some(items.iter().rposition(|item| item.date <= today).unwrap_or(0))
}

/// Partition `items` into groups keyed by `date_key`.
#[must_use]
pub fn group_items(items: &[Item], today: Date) -> Vec<Group> {
    let recent = recent_index(items, today);
    let mut groups: Vec<Group> = Vec::new();
    let mut slot_of: HashMap<&str, usize> = HashMap::new();

    for (idx, item) in items.iter().enumerate() {
        let slot = *slot_of.entry(item.date_key.as_str()).or_insert_with(|| {
            groups.push(Group {
                key: item.date_key.clone(),
                items: Vec::new(),
                is_recent: false,
                is_today: false,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.is_recent |= recent == Some(idx);
        group.is_today |= item.date == today;
        group.items.push(item.clone());
    }
    groups
}
