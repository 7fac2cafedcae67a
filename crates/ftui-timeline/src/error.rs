#![forbid(unsafe_code)]

//! Error types for the timeline engine.
//!
//! | Error                 | Class            | Recovery                                   |
//! |-----------------------|------------------|--------------------------------------------|
//! | `FetchFailure`        | data layer       | back to idle, cursors kept, retry later    |
//! | `EmptyResult`         | data layer       | edge treated as exhausted                  |
//! | `IndexInconsistency`  | programming bug  | panic when strict, otherwise logged + skip |
//! | `UnknownTicket`       | host bug         | completion discarded                       |
//! | `NotReady`            | host bug         | call rejected, nothing loaded yet          |

use std::fmt;

use crate::item::Direction;
use crate::pagination::FetchTicket;

/// Failure reported by the data layer for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    message: String,
}

impl FetchError {
    /// Create a fetch error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The data layer's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FetchError {}

/// Errors surfaced by [`Timeline`](crate::timeline::Timeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// The data layer failed; state is unchanged and the edge stays retryable.
    FetchFailure {
        /// Direction of the failed fetch, `None` for the initial load.
        direction: Option<Direction>,
        /// Underlying data-layer error.
        source: FetchError,
    },
    /// A page arrived with no items; the edge is now considered exhausted.
    EmptyResult {
        /// Direction of the empty fetch, `None` for the initial load.
        direction: Option<Direction>,
        /// The cursor the page claimed, dropped.
        claimed_cursor: bool,
    },
    /// Visible-range arithmetic disagrees with the row sequence.
    IndexInconsistency {
        /// Reported first visible row.
        start: usize,
        /// Reported last visible row.
        end: usize,
        /// Rows actually projected.
        len: usize,
    },
    /// A completion arrived for a ticket that is not in flight.
    UnknownTicket {
        /// The ticket supplied by the host.
        ticket: FetchTicket,
        /// The ticket actually in flight, if any.
        in_flight: Option<FetchTicket>,
    },
    /// The operation needs loaded rows.
    NotReady,
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailure { direction, source } => match direction {
                Some(dir) => write!(f, "{dir} fetch failed: {source}"),
                None => write!(f, "initial fetch failed: {source}"),
            },
            Self::EmptyResult {
                direction,
                claimed_cursor,
            } => {
                let dir = direction.map_or("initial", |d| d.as_str());
                if *claimed_cursor {
                    write!(f, "{dir} fetch returned no items but claimed more; edge exhausted")
                } else {
                    write!(f, "{dir} fetch returned no items")
                }
            }
            Self::IndexInconsistency { start, end, len } => write!(
                f,
                "visible range {start}..={end} is inconsistent with {len} rows"
            ),
            Self::UnknownTicket { ticket, in_flight } => match in_flight {
                Some(current) => write!(f, "completion for {ticket} while {current} is in flight"),
                None => write!(f, "completion for {ticket} with no fetch in flight"),
            },
            Self::NotReady => f.write_str("timeline has no rows loaded"),
        }
    }
}

impl std::error::Error for TimelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FetchFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = TimelineError::FetchFailure {
            direction: Some(Direction::Forward),
            source: FetchError::new("timeout"),
        };
        assert_eq!(err.to_string(), "forward fetch failed: timeout");

        let err = TimelineError::EmptyResult {
            direction: Some(Direction::Backward),
            claimed_cursor: true,
        };
        assert!(err.to_string().contains("backward"));

        let err = TimelineError::IndexInconsistency {
            start: 5,
            end: 3,
            len: 4,
        };
        assert_eq!(
            err.to_string(),
            "visible range 5..=3 is inconsistent with 4 rows"
        );
    }

    #[test]
    fn fetch_failure_exposes_source() {
        use std::error::Error;
        let err = TimelineError::FetchFailure {
            direction: None,
            source: FetchError::new("offline"),
        };
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("offline"));
    }
}
