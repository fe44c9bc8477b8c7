//! Resumption cursors and resolved-timestamp tracking.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::CursorError;
use crate::types::ResolvedMarker;

/// A changefeed resumption point, e.g. `1586782034314054700.0000000000`.
///
/// The original text is kept verbatim. Comparison is numeric, so
/// `100.0` and `100.00` are equal.
#[derive(Debug, Clone)]
pub struct Cursor(String);

impl Cursor {
    /// Parse a decimal timestamp: digits, optionally followed by `.` and more digits.
    pub fn parse(s: &str) -> Result<Self, CursorError> {
        if s.is_empty() {
            return Err(CursorError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (s, None),
        };

        if !is_digits(whole) || frac.is_some_and(|f| !is_digits(f)) {
            return Err(CursorError::Invalid(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Integer and fractional digits with insignificant zeros removed.
    fn significant_parts(&self) -> (&str, &str) {
        let (whole, frac) = self.0.split_once('.').unwrap_or((self.0.as_str(), ""));
        (whole.trim_start_matches('0'), frac.trim_end_matches('0'))
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a_whole, a_frac) = self.significant_parts();
        let (b_whole, b_frac) = other.significant_parts();

        a_whole
            .len()
            .cmp(&b_whole.len())
            .then_with(|| a_whole.cmp(b_whole))
            .then_with(|| a_frac.cmp(b_frac))
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cursor {}

impl FromStr for Cursor {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved timestamp the tracker refused to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("resolved timestamp {observed} is earlier than current cursor {current}")]
    Regressed { current: Cursor, observed: Cursor },

    #[error("resolved timestamp '{observed}' is not a decimal timestamp")]
    Malformed { observed: String },
}

/// Outcome of applying a resolved timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// First cursor recorded.
    Initial,
    /// Cursor moved forward from `previous`.
    Advanced { previous: Cursor },
    /// Same timestamp as the current cursor.
    Unchanged,
}

/// Tracks the most recent resolved timestamp of a feed.
///
/// The cursor never moves backwards: an older timestamp is reported as a
/// [`ProtocolViolation`] and leaves the cursor as it was.
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    current: Option<Cursor>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known resumption point, typically the cursor the feed was resumed at.
    pub fn starting_at(cursor: Option<Cursor>) -> Self {
        Self { current: cursor }
    }

    pub fn current_cursor(&self) -> Option<&Cursor> {
        self.current.as_ref()
    }

    pub fn observe(&mut self, marker: &ResolvedMarker) -> Result<Advance, ProtocolViolation> {
        self.observe_timestamp(&marker.timestamp)
    }

    pub fn observe_timestamp(&mut self, timestamp: &str) -> Result<Advance, ProtocolViolation> {
        let observed = Cursor::parse(timestamp).map_err(|_| ProtocolViolation::Malformed {
            observed: timestamp.to_string(),
        })?;

        let Some(current) = self.current.as_mut() else {
            self.current = Some(observed);
            return Ok(Advance::Initial);
        };

        match observed.cmp(&*current) {
            Ordering::Less => Err(ProtocolViolation::Regressed {
                current: current.clone(),
                observed,
            }),
            Ordering::Equal => Ok(Advance::Unchanged),
            Ordering::Greater => {
                let previous = std::mem::replace(current, observed);
                Ok(Advance::Advanced { previous })
            }
        }
    }
}
