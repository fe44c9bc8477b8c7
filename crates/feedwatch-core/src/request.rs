//! Changefeed initiation statements.

use std::fmt;

use crate::cursor::Cursor;

/// How the changefeed should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    /// Start now, with per-row `updated` timestamps and periodic resolved markers.
    UpdatedResolved,
    /// Resume at the given cursor, with per-row `updated` timestamps.
    ResumeFrom(Cursor),
}

/// A changefeed initiation request for a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    table: String,
    mode: FeedMode,
}

impl QuerySpec {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn mode(&self) -> &FeedMode {
        &self.mode
    }

    /// The cursor the feed resumes from, if any.
    pub fn resume_cursor(&self) -> Option<&Cursor> {
        match &self.mode {
            FeedMode::ResumeFrom(cursor) => Some(cursor),
            FeedMode::UpdatedResolved => None,
        }
    }

    /// The SQL statement that opens the feed.
    pub fn statement(&self) -> String {
        match &self.mode {
            FeedMode::UpdatedResolved => format!(
                "EXPERIMENTAL CHANGEFEED FOR {} WITH updated, resolved",
                self.table
            ),
            FeedMode::ResumeFrom(cursor) => format!(
                "EXPERIMENTAL CHANGEFEED FOR {} WITH updated, cursor='{}'",
                self.table,
                cursor.as_str()
            ),
        }
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.statement())
    }
}

/// Build the request that opens a changefeed on `table`, resuming at `resume` when given.
pub fn build_initiation_request(table: &str, resume: Option<Cursor>) -> QuerySpec {
    let mode = match resume {
        Some(cursor) => FeedMode::ResumeFrom(cursor),
        None => FeedMode::UpdatedResolved,
    };

    QuerySpec {
        table: table.to_string(),
        mode,
    }
}

/// Check that a table name is a plain or schema-qualified SQL identifier.
pub fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|part| is_valid_ident(part))
}

fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_feed_statement() {
        let spec = build_initiation_request("messages", None);
        assert_eq!(
            spec.statement(),
            "EXPERIMENTAL CHANGEFEED FOR messages WITH updated, resolved"
        );
        assert_eq!(spec.mode(), &FeedMode::UpdatedResolved);
        assert!(spec.resume_cursor().is_none());
    }

    #[test]
    fn test_resume_statement() {
        let cursor = Cursor::parse("42.0").unwrap();
        let spec = build_initiation_request("messages", Some(cursor));
        assert_eq!(
            spec.statement(),
            "EXPERIMENTAL CHANGEFEED FOR messages WITH updated, cursor='42.0'"
        );
        assert_eq!(spec.to_string(), spec.statement());
        assert_eq!(spec.table(), "messages");
    }

    #[test]
    fn test_resume_cursor_embedded_verbatim() {
        let cursor = Cursor::parse("1586782034314054700.0000000000").unwrap();
        let spec = build_initiation_request("messages", Some(cursor));
        assert!(spec
            .statement()
            .ends_with("cursor='1586782034314054700.0000000000'"));
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("messages"));
        assert!(is_valid_table_name("public.messages"));
        assert!(is_valid_table_name("_t1"));

        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("1messages"));
        assert!(!is_valid_table_name("a.b.c"));
        assert!(!is_valid_table_name("messages;drop"));
        assert!(!is_valid_table_name("public."));
    }
}
