#![forbid(unsafe_code)]

//! Timeline data for the harness: JSON fixtures or synthetic items.
//!
//! Fixture records use the mock-API shape:
//!
//! ```json
//! {"id": 1, "title": "Standup", "content_title": "Team",
//!  "start_date": "2024-03-01T09:00:00Z", "end_date": null,
//!  "t_date": "2024-03-01", "formatted_t_date": "Fri, Mar 1"}
//! ```
//!
//! `t_date` drives grouping and recency; the other date fields are carried
//! through as display strings.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use ftui_timeline::item::{date_key, parse_day};
use ftui_timeline::{Item, ItemId};
use serde::Deserialize;
use time::Date;

/// One record of a JSON fixture.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content_title: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    pub t_date: String,
    #[serde(default)]
    pub formatted_t_date: Option<String>,
}

/// Failure to load a fixture.
#[derive(Debug)]
pub enum FixtureError {
    /// The file could not be read.
    Io { path: String, source: io::Error },
    /// The contents are not a JSON array of records.
    Json(serde_json::Error),
    /// A record's `t_date` is not a `YYYY-MM-DD` day.
    Date {
        id: u64,
        value: String,
        source: time::error::Parse,
    },
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read fixture {path}: {source}"),
            Self::Json(err) => write!(f, "malformed fixture: {err}"),
            Self::Date { id, value, source } => {
                write!(f, "record {id} has invalid t_date {value:?}: {source}")
            }
        }
    }
}

impl std::error::Error for FixtureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Date { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for FixtureError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl FixtureRecord {
    /// Convert into an engine item.
    pub fn into_item(self) -> Result<Item, FixtureError> {
        let date = parse_day(&self.t_date).map_err(|source| FixtureError::Date {
            id: self.id,
            value: self.t_date.clone(),
            source,
        })?;
        Ok(Item {
            id: ItemId(self.id),
            title: self.title,
            content_title: self.content_title,
            start_date: self.start_date,
            end_date: self.end_date,
            date,
            date_key: date_key(date),
        })
    }
}

/// Parse a fixture document, keeping record order.
pub fn parse_fixture(json: &str) -> Result<Vec<Item>, FixtureError> {
    let records: Vec<FixtureRecord> = serde_json::from_str(json)?;
    records.into_iter().map(FixtureRecord::into_item).collect()
}

/// Read and parse a fixture file.
pub fn load_fixture(path: &Path) -> Result<Vec<Item>, FixtureError> {
    let json = fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_fixture(&json)
}

const CALENDARS: [&str; 4] = ["Work", "Personal", "Release train", "On-call"];
const TITLES: [&str; 6] = [
    "Standup",
    "Design review",
    "1:1",
    "Deploy window",
    "Incident retro",
    "Planning",
];

/// `count` items over `days` consecutive days centered on `today`, oldest
/// first, spread as evenly as possible.
#[must_use]
pub fn synthesize(count: u64, days: u64, today: Date) -> Vec<Item> {
    let days = days.max(1);
    let first = today - time::Duration::days((days / 2) as i64);
    (0..count)
        .map(|i| {
            let offset = i * days / count.max(1);
            let day = first + time::Duration::days(offset as i64);
            let n = i as usize;
            let title = format!("{} #{i}", TITLES[n % TITLES.len()]);
            let item = Item::on(i, title, day).with_content_title(CALENDARS[n % CALENDARS.len()]);
            if n % 5 == 0 {
                let end = day + time::Duration::days(1);
                item.with_end_date(date_key(end))
            } else {
                item
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const SAMPLE: &str = r#"[
        {"id": 7, "title": "Kickoff", "content_title": "Launch",
         "start_date": "2024-03-01T09:00:00Z", "end_date": null,
         "t_date": "2024-03-01", "formatted_t_date": "Fri, Mar 1"},
        {"id": 8, "title": "Retro",
         "start_date": "2024-03-02T16:00:00Z", "end_date": "2024-03-02T17:00:00Z",
         "t_date": "2024-03-02T16:00:00Z"}
    ]"#;

    #[test]
    fn parses_records_in_order() {
        let items = parse_fixture(SAMPLE).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, ItemId(7));
        assert_eq!(items[0].content_title, "Launch");
        assert_eq!(items[0].date_key, "2024-03-01");
        assert_eq!(items[1].date, date!(2024 - 03 - 02));
        assert_eq!(items[1].end_date.as_deref(), Some("2024-03-02T17:00:00Z"));
        assert!(items[1].content_title.is_empty());
    }

    #[test]
    fn bad_date_names_the_record() {
        let json = r#"[{"id": 3, "title": "x", "start_date": "", "t_date": "soon"}]"#;
        let err = parse_fixture(json).unwrap_err();
        assert!(matches!(err, FixtureError::Date { id: 3, .. }));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn non_array_is_a_json_error() {
        let err = parse_fixture(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, FixtureError::Json(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_fixture(Path::new("/nonexistent/timeline.json")).unwrap_err();
        assert!(matches!(err, FixtureError::Io { .. }));
    }

    #[test]
    fn bundled_fixture_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/timeline.json");
        let items = load_fixture(&path).unwrap();
        assert_eq!(items.len(), 47);
        assert_eq!(items[0].date, date!(2024 - 03 - 11));
        assert_eq!(items[46].date, date!(2024 - 03 - 24));
        assert!(items.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn synthesize_spreads_items_over_days() {
        let today = date!(2024 - 03 - 20);
        let items = synthesize(250, 5, today);
        assert_eq!(items.len(), 250);
        assert_eq!(items.first().map(|i| i.date), Some(date!(2024 - 03 - 18)));
        assert_eq!(items.last().map(|i| i.date), Some(date!(2024 - 03 - 22)));
        assert!(items.windows(2).all(|w| w[0].date <= w[1].date));
        let mut keys: Vec<_> = items.iter().map(|i| i.date_key.clone()).collect();
        keys.dedup();
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn synthesize_handles_degenerate_counts() {
        let today = date!(2024 - 03 - 20);
        assert!(synthesize(0, 5, today).is_empty());
        assert_eq!(synthesize(3, 0, today).len(), 3);
    }
}
