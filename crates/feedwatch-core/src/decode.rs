//! Decoding of raw changefeed rows into [`ChangeEvent`]s.

use serde::Deserialize;

use crate::error::{DecodeError, DecodeResult};
use crate::types::{ChangeEvent, RawRow, ResolvedMarker, Row, RowChange};

/// The JSON object carried in the `value` column.
#[derive(Debug, Deserialize)]
struct WireValue {
    #[serde(default)]
    resolved: Option<String>,
    #[serde(default)]
    after: Option<Row>,
    #[serde(default)]
    updated: Option<String>,
}

/// Decode one raw changefeed row.
///
/// The value column is decoded first; a non-empty `resolved` field yields a
/// [`ResolvedMarker`] and the keys column is never looked at.
pub fn decode(raw: &RawRow) -> DecodeResult<ChangeEvent> {
    let table = String::from_utf8(raw.table.to_vec()).map_err(DecodeError::Table)?;
    let value = parse_value(&raw.value)?;

    if let Some(timestamp) = value.resolved.filter(|ts| !ts.is_empty()) {
        return Ok(ChangeEvent::Resolved(ResolvedMarker { table, timestamp }));
    }

    let keys = parse_keys(&raw.keys)?;

    Ok(ChangeEvent::RowChange(RowChange {
        table,
        keys,
        after: value.after,
        updated_at: value.updated,
    }))
}

fn parse_value(data: &[u8]) -> DecodeResult<WireValue> {
    // Deserialize into a map first: derived struct impls also accept JSON arrays.
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(data).map_err(DecodeError::Value)?;
    serde_json::from_value(serde_json::Value::Object(object)).map_err(DecodeError::Value)
}

fn parse_keys(data: &[u8]) -> DecodeResult<Vec<String>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice(data).map_err(DecodeError::Keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeStage;

    const ROW_ID: &str = "6f1c7c1a-8d0e-4b4e-9c55-3b1f0c2a9d77";

    fn upsert_value() -> String {
        format!(
            r#"{{"after":{{"id":"{}","source":"a@noemail.com","title":"t","body":"b"}},"updated":"123.0"}}"#,
            ROW_ID
        )
    }

    #[test]
    fn test_decode_upsert() {
        let raw = RawRow::new("messages", format!(r#"["{}"]"#, ROW_ID), upsert_value());

        let event = decode(&raw).unwrap();
        let change = event.as_row_change().unwrap();
        assert_eq!(change.table, "messages");
        assert_eq!(change.keys, vec![ROW_ID.to_string()]);
        assert_eq!(change.updated_at.as_deref(), Some("123.0"));

        let row = change.after.as_ref().unwrap();
        assert_eq!(row.id.to_string(), ROW_ID);
        assert_eq!(row.source, "a@noemail.com");
        assert_eq!(row.title, "t");
        assert_eq!(row.body, "b");
    }

    #[test]
    fn test_decode_delete() {
        let raw = RawRow::new(
            "messages",
            format!(r#"["{}"]"#, ROW_ID),
            r#"{"after":null,"updated":"124.0"}"#,
        );

        let change = decode(&raw).unwrap().as_row_change().cloned().unwrap();
        assert!(change.is_delete());
        assert_eq!(change.updated_at.as_deref(), Some("124.0"));
    }

    #[test]
    fn test_decode_resolved() {
        let raw = RawRow::new("", "", r#"{"resolved":"1586782034314054700.0000000000"}"#);

        let event = decode(&raw).unwrap();
        let marker = event.as_resolved().unwrap();
        assert_eq!(marker.table, "");
        assert_eq!(marker.timestamp, "1586782034314054700.0000000000");
    }

    #[test]
    fn test_resolved_ignores_malformed_keys() {
        let raw = RawRow::new("messages", "not json [", r#"{"resolved":"100.0"}"#);
        assert!(decode(&raw).unwrap().as_resolved().is_some());
    }

    #[test]
    fn test_empty_resolved_is_row_change() {
        let raw = RawRow::new("messages", "", r#"{"resolved":""}"#);

        let change = decode(&raw).unwrap().as_row_change().cloned().unwrap();
        assert!(change.keys.is_empty());
        assert!(change.after.is_none());
        assert!(change.updated_at.is_none());
    }

    #[test]
    fn test_null_updated() {
        let raw = RawRow::new("messages", "[]", r#"{"updated":null}"#);
        let change = decode(&raw).unwrap().as_row_change().cloned().unwrap();
        assert!(change.updated_at.is_none());
    }

    #[test]
    fn test_keys_error_stage() {
        let raw = RawRow::new("messages", "[1, 2", r#"{}"#);
        assert_eq!(decode(&raw).unwrap_err().stage(), DecodeStage::Keys);

        // Non-string key elements are not accepted either.
        let raw = RawRow::new("messages", "[1, 2]", r#"{}"#);
        assert_eq!(decode(&raw).unwrap_err().stage(), DecodeStage::Keys);
    }

    #[test]
    fn test_value_error_stage() {
        for value in ["", "{", "[]", "\"text\"", "42"] {
            let raw = RawRow::new("messages", "[]", value);
            let err = decode(&raw).unwrap_err();
            assert_eq!(err.stage(), DecodeStage::Value, "value: {:?}", value);
        }
    }

    #[test]
    fn test_after_shape_mismatch_is_value_error() {
        let raw = RawRow::new("messages", "[]", r#"{"after":{"id":"not-a-uuid"}}"#);
        assert_eq!(decode(&raw).unwrap_err().stage(), DecodeStage::Value);
    }

    #[test]
    fn test_table_must_be_utf8() {
        let raw = RawRow::new(vec![0xffu8, 0xfe], "[]", "{}");
        assert_eq!(decode(&raw).unwrap_err().stage(), DecodeStage::Table);
    }
}
