use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of the watched table, as carried in the `after` field of a changefeed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: Uuid,
    pub source: String,
    pub title: String,
    pub body: String,
}

/// The three undecoded columns of a changefeed row.
///
/// A `NULL` column is represented by an empty buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// Table identifier.
    pub table: Bytes,
    /// JSON array of primary key values.
    pub keys: Bytes,
    /// JSON object with `resolved`, `after` and `updated`.
    pub value: Bytes,
}

impl RawRow {
    pub fn new(
        table: impl Into<Bytes>,
        keys: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            table: table.into(),
            keys: keys.into(),
            value: value.into(),
        }
    }

    /// The columns in wire order.
    pub fn columns(&self) -> [&Bytes; 3] {
        [&self.table, &self.keys, &self.value]
    }
}

/// An insert, update or delete observed on a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowChange {
    pub table: String,
    /// Primary key values, in key column order.
    pub keys: Vec<String>,
    /// The row after the change. `None` signals a delete.
    pub after: Option<Row>,
    /// Store-assigned logical timestamp, present when the feed was started `WITH updated`.
    pub updated_at: Option<String>,
}

impl RowChange {
    pub fn is_delete(&self) -> bool {
        self.after.is_none()
    }
}

/// A watermark: no unobserved change exists at or before `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMarker {
    pub table: String,
    pub timestamp: String,
}

/// A decoded changefeed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    RowChange(RowChange),
    Resolved(ResolvedMarker),
}

impl ChangeEvent {
    pub fn table(&self) -> &str {
        match self {
            ChangeEvent::RowChange(change) => &change.table,
            ChangeEvent::Resolved(marker) => &marker.table,
        }
    }

    pub fn as_row_change(&self) -> Option<&RowChange> {
        match self {
            ChangeEvent::RowChange(change) => Some(change),
            ChangeEvent::Resolved(_) => None,
        }
    }

    pub fn as_resolved(&self) -> Option<&ResolvedMarker> {
        match self {
            ChangeEvent::Resolved(marker) => Some(marker),
            ChangeEvent::RowChange(_) => None,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::Resolved(marker) => {
                write!(f, "resolved table={} ts={}", marker.table, marker.timestamp)
            }
            ChangeEvent::RowChange(change) => {
                let op = if change.is_delete() { "delete" } else { "upsert" };
                write!(f, "{} table={} keys=[{}]", op, change.table, change.keys.join(","))?;
                if let Some(row) = &change.after {
                    write!(
                        f,
                        " id={} source={} title={} body={}",
                        row.id, row.source, row.title, row.body
                    )?;
                }
                if let Some(updated) = &change.updated_at {
                    write!(f, " updated={}", updated)?;
                }
                Ok(())
            }
        }
    }
}
