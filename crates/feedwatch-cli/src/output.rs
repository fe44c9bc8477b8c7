//! Diagnostic printing of changefeed rows. Not a machine-readable format.

use colored::Colorize;
use feedwatch_core::{ChangeEvent, Cursor, QuerySpec, RawRow};

pub fn print_statement(request: &QuerySpec) {
    println!("{}", request.statement().bold());
}

/// Lines for each raw column, as `raw[i]: '<text>'`.
pub fn raw_lines(raw: &RawRow) -> Vec<String> {
    raw.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| format!("raw[{}]: '{}'", i, String::from_utf8_lossy(col)))
        .collect()
}

pub fn print_raw(raw: &RawRow) {
    for line in raw_lines(raw) {
        println!("{}", line.dimmed());
    }
}

pub fn print_event(event: &ChangeEvent, cursor: Option<&Cursor>) {
    match event {
        ChangeEvent::RowChange(change) if change.is_delete() => {
            println!("{}", event.to_string().red());
        }
        ChangeEvent::RowChange(_) => println!("{}", event.to_string().green()),
        ChangeEvent::Resolved(_) => {
            println!("{}", event.to_string().cyan());
            if let Some(cursor) = cursor {
                println!("{} {}", "cursor:".cyan().bold(), cursor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_lines() {
        let raw = RawRow::new("messages", "", r#"{"resolved":"1.0"}"#);
        assert_eq!(
            raw_lines(&raw),
            vec![
                "raw[0]: 'messages'".to_string(),
                "raw[1]: ''".to_string(),
                r#"raw[2]: '{"resolved":"1.0"}'"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_raw_lines_lossy() {
        let raw = RawRow::new(vec![0xffu8], "[]", "{}");
        assert_eq!(raw_lines(&raw)[0], "raw[0]: '\u{fffd}'");
    }
}
