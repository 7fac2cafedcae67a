#![forbid(unsafe_code)]

//! Timeline records, opaque cursors, and fetched pages.
//!
//! Items are owned by the data layer and treated as read-only input: the
//! engine never mutates an [`Item`], it only regroups and re-projects the
//! accumulated sequence after every page load.

use std::fmt;

use time::Date;
use time::macros::format_description;

/// Stable identity of a timeline item, as assigned by the data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single timeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Data-layer identity.
    pub id: ItemId,
    /// Primary title shown on the card.
    pub title: String,
    /// Title of the content the entry refers to.
    pub content_title: String,
    /// Start date as delivered by the data layer (display-opaque).
    pub start_date: String,
    /// Optional end date (display-opaque).
    pub end_date: Option<String>,
    /// Calendar day used for recency decisions.
    pub date: Date,
    /// Display-agnostic grouping key derived from `date`.
    pub date_key: String,
}

impl Item {
    /// Build an item whose grouping key is the ISO form of `date`.
    ///
    /// `start_date` defaults to the same ISO string; use the struct literal
    /// when the data layer supplies richer values.
    #[must_use]
    pub fn on(id: u64, title: impl Into<String>, date: Date) -> Self {
        let key = date_key(date);
        Self {
            id: ItemId(id),
            title: title.into(),
            content_title: String::new(),
            start_date: key.clone(),
            end_date: None,
            date,
            date_key: key,
        }
    }

    /// Set the content title.
    #[must_use]
    pub fn with_content_title(mut self, content_title: impl Into<String>) -> Self {
        self.content_title = content_title.into();
        self
    }

    /// Set the end date.
    #[must_use]
    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }
}

/// ISO `YYYY-MM-DD` grouping key for a calendar day.
#[must_use]
pub fn date_key(date: Date) -> String {
    // The ISO format only fails on years outside 0..=9999.
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Parse the leading `YYYY-MM-DD` portion of a data-layer date string.
///
/// Accepts plain dates and RFC 3339 style timestamps (`2024-03-01T09:30:00Z`).
pub fn parse_day(raw: &str) -> Result<Date, time::error::Parse> {
    let head = raw.trim().get(..10).unwrap_or(raw);
    Date::parse(head, format_description!("[year]-[month]-[day]"))
}

/// Opaque continuation token handed out by the data layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token exactly as it was received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Fetch direction relative to the loaded sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Newer content, appended at the end.
    Forward,
    /// Older content, prepended at the front.
    Backward,
}

impl Direction {
    /// Short lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page returned by the data layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Items in chronological order.
    pub items: Vec<Item>,
    /// Token for the page after this one, `None` when exhausted.
    pub next_cursor: Option<Cursor>,
    /// Token for the page before this one, `None` when exhausted.
    pub prev_cursor: Option<Cursor>,
}

impl Page {
    /// Create a page.
    #[must_use]
    pub fn new(items: Vec<Item>, next_cursor: Option<Cursor>, prev_cursor: Option<Cursor>) -> Self {
        Self {
            items,
            next_cursor,
            prev_cursor,
        }
    }

    /// Cursor continuing in `direction`.
    #[must_use]
    pub fn cursor_for(&self, direction: Direction) -> Option<&Cursor> {
        match direction {
            Direction::Forward => self.next_cursor.as_ref(),
            Direction::Backward => self.prev_cursor.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn date_key_is_iso() {
        assert_eq!(date_key(date!(2024 - 03 - 07)), "2024-03-07");
    }

    #[test]
    fn parse_day_accepts_timestamps() {
        assert_eq!(parse_day("2024-03-07").unwrap(), date!(2024 - 03 - 07));
        assert_eq!(
            parse_day("2024-03-07T09:30:00.000Z").unwrap(),
            date!(2024 - 03 - 07)
        );
        assert!(parse_day("yesterday").is_err());
        assert!(parse_day("").is_err());
    }

    #[test]
    fn item_builder_sets_key_from_date() {
        let item = Item::on(7, "Standup", date!(2024 - 01 - 02))
            .with_content_title("Team")
            .with_end_date("2024-01-03");
        assert_eq!(item.id, ItemId(7));
        assert_eq!(item.date_key, "2024-01-02");
        assert_eq!(item.start_date, "2024-01-02");
        assert_eq!(item.content_title, "Team");
        assert_eq!(item.end_date.as_deref(), Some("2024-01-03"));
    }

    #[test]
    fn page_cursor_for_direction() {
        let page = Page::new(Vec::new(), Some("n".into()), Some("p".into()));
        assert_eq!(page.cursor_for(Direction::Forward).unwrap().as_str(), "n");
        assert_eq!(page.cursor_for(Direction::Backward).unwrap().as_str(), "p");
    }
}
