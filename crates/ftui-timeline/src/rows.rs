#![forbid(unsafe_code)]

//! Flattening groups into addressable rows.
//!
//! Every group becomes one header row followed by one row per item. Row
//! indices are dense and zero-based, and the whole [`RowSet`] is rebuilt on
//! every data change; nothing is patched in place.

use crate::grouper::Group;
use crate::item::{Item, ItemId};

/// One addressable line of the flattened timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Group header.
    Header {
        /// Grouping key of the group.
        key: String,
        /// Whether the group holds the recent item.
        is_recent: bool,
        /// Whether the group's day is today.
        is_today: bool,
        /// Position in the flattened sequence.
        index: usize,
    },
    /// A timeline item.
    Item {
        /// The item.
        item: Item,
        /// Position in the flattened sequence.
        index: usize,
        /// Whether the next row is a header (or there is none).
        last_in_group: bool,
    },
}

/// Identity of a row that survives re-projection.
///
/// Indices shift when rows are prepended; keys do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    /// A header, identified by its group key.
    Header(String),
    /// An item row, identified by its item id.
    Item(ItemId),
}

impl Row {
    /// Position in the flattened sequence.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Header { index, .. } | Self::Item { index, .. } => *index,
        }
    }

    /// Whether this is a header row.
    #[must_use]
    pub fn is_header(&self) -> bool {
        matches!(self, Self::Header { .. })
    }

    /// Stable identity of this row.
    #[must_use]
    pub fn key(&self) -> RowKey {
        match self {
            Self::Header { key, .. } => RowKey::Header(key.clone()),
            Self::Item { item, .. } => RowKey::Item(item.id),
        }
    }
}

/// The projected rows plus lookups derived from them once per projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    rows: Vec<Row>,
    header_indices: Vec<usize>,
    recent_header: Option<usize>,
}

impl RowSet {
    /// Project `groups` into rows.
    #[must_use]
    pub fn project(groups: &[Group]) -> Self {
        let capacity = groups.iter().map(|g| g.items.len() + 1).sum();
        let mut rows = Vec::with_capacity(capacity);
        let mut header_indices = Vec::with_capacity(groups.len());
        let mut recent_header = None;

        for group in groups {
            let index = rows.len();
            header_indices.push(index);
            if group.is_recent && recent_header.is_none() {
                recent_header = Some(index);
            }
            rows.push(Row::Header {
                key: group.key.clone(),
                is_recent: group.is_recent,
                is_today: group.is_today,
                index,
            });
            let last = group.items.len().saturating_sub(1);
            for (pos, item) in group.items.iter().enumerate() {
                let index = rows.len();
                rows.push(Row::Item {
                    item: item.clone(),
                    index,
                    last_in_group: pos == last,
                });
            }
        }

        Self {
            rows,
            header_indices,
            recent_header,
        }
    }

    /// All rows in order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Indices of every header row, ascending.
    #[must_use]
    pub fn header_indices(&self) -> &[usize] {
        &self.header_indices
    }

    /// Index of the header of the recent group, if any.
    #[must_use]
    pub fn recent_header(&self) -> Option<usize> {
        self.recent_header
    }

    /// Row count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at `index`.
    #[must_use = "use the returned row (if any)"]
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Current index of the row identified by `key`.
    #[must_use]
    pub fn position_of(&self, key: &RowKey) -> Option<usize> {
        match key {
            RowKey::Header(k) => self.header_indices.iter().copied().find(|&i| {
                matches!(&self.rows[i], Row::Header { key, .. } if key == k)
            }),
            RowKey::Item(id) => self
                .rows
                .iter()
                .position(|row| matches!(row, Row::Item { item, .. } if item.id == *id)),
        }
    }
}
