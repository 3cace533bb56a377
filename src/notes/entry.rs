//! A single stored note and its one-line JSON encoding.

use crate::{NotesError, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// One immutable stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: String,
    pub timestamp: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Fields written by a newer version; carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Create a fresh entry with a new id. The timestamp defaults to now.
    pub fn create(
        text: impl Into<String>,
        file: Option<String>,
        kind: Option<String>,
        timestamp: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: timestamp.unwrap_or_else(now_iso8601),
            text: text.into(),
            file,
            kind,
            extra: Map::new(),
        }
    }
}

/// Current UTC time, e.g. `2024-05-01T09:30:00.123Z`
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Encode an entry as one JSON line (no trailing newline).
pub fn encode(entry: &Entry) -> Result<String> {
    Ok(serde_json::to_string(entry)?)
}

/// Decode one line of the store. `line_no` is 1-based and only used for
/// error reporting.
pub fn decode(line: &str, line_no: usize) -> Result<Entry> {
    let malformed = |reason: String| NotesError::MalformedRecord {
        line: line_no,
        reason,
    };

    let value: Value =
        serde_json::from_str(line).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(malformed(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            )))
        }
    };

    let id = take_required(&mut fields, "id").map_err(malformed)?;
    let timestamp = take_required(&mut fields, "timestamp").map_err(malformed)?;
    let text = take_required(&mut fields, "text").map_err(malformed)?;
    let file = take_optional(&mut fields, "file").map_err(malformed)?;
    let kind = take_optional(&mut fields, "kind").map_err(malformed)?;

    Ok(Entry {
        id,
        timestamp,
        text,
        file,
        kind,
        extra: fields,
    })
}

fn take_required(fields: &mut Map<String, Value>, name: &str) -> std::result::Result<String, String> {
    match fields.remove(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!(
            "field `{}` must be a string, got {}",
            name,
            type_name(&other)
        )),
        None => Err(format!("missing field `{}`", name)),
    }
}

fn take_optional(
    fields: &mut Map<String, Value>,
    name: &str,
) -> std::result::Result<Option<String>, String> {
    match fields.remove(name) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(format!(
            "field `{}` must be a string, got {}",
            name,
            type_name(&other)
        )),
        None => Ok(None),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(file: Option<&str>, kind: Option<&str>) -> Entry {
        Entry {
            id: "0b6f3c1e-6d0a-4d8e-9d55-1f2a3b4c5d6e".to_string(),
            timestamp: "2024-05-01T09:30:00.123Z".to_string(),
            text: "use explicit types".to_string(),
            file: file.map(String::from),
            kind: kind.map(String::from),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_round_trip_keeps_absent_fields_absent() {
        let entry = sample(None, None);
        let line = encode(&entry).unwrap();
        assert!(!line.contains("file"));
        assert!(!line.contains("kind"));
        assert_eq!(decode(&line, 1).unwrap(), entry);
    }

    #[test]
    fn test_round_trip_with_all_fields() {
        let entry = sample(Some("src/main.rs:12"), Some("teach.note"));
        let line = encode(&entry).unwrap();
        assert_eq!(decode(&line, 1).unwrap(), entry);
    }

    #[test]
    fn test_encode_is_single_line() {
        let mut entry = sample(None, None);
        entry.text = "line one\nline two\r\n\ttabbed ünïcødé 日本語".to_string();
        let line = encode(&entry).unwrap();
        assert!(!line.contains('\n'));
        assert!(!line.contains('\r'));
        assert_eq!(decode(&line, 1).unwrap().text, entry.text);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let line = r#"{"id":"a","timestamp":"t","text":"x","priority":3,"tags":["a"]}"#;
        let entry = decode(line, 1).unwrap();
        assert_eq!(entry.extra.get("priority"), Some(&serde_json::json!(3)));

        let again = decode(&encode(&entry).unwrap(), 1).unwrap();
        assert_eq!(again, entry);
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let err = decode("{not json", 4).unwrap_err();
        match err {
            NotesError::MalformedRecord { line, reason } => {
                assert_eq!(line, 4);
                assert!(reason.contains("invalid JSON"));
            }
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = decode(r#"["id"]"#, 2).unwrap_err();
        assert!(matches!(err, NotesError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_decode_rejects_missing_required_field() {
        let err = decode(r#"{"id":"a","text":"x"}"#, 7).unwrap_err();
        match err {
            NotesError::MalformedRecord { line, reason } => {
                assert_eq!(line, 7);
                assert!(reason.contains("timestamp"));
            }
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_wrong_field_types() {
        let cases = [
            r#"{"id":1,"timestamp":"t","text":"x"}"#,
            r#"{"id":"a","timestamp":"t","text":null}"#,
            r#"{"id":"a","timestamp":"t","text":"x","file":42}"#,
            r#"{"id":"a","timestamp":"t","text":"x","kind":null}"#,
            r#"{"id":"a","timestamp":"t","text":"x","kind":["teach.note"]}"#,
        ];
        for case in cases {
            assert!(
                matches!(decode(case, 1), Err(NotesError::MalformedRecord { .. })),
                "Should reject: {}",
                case
            );
        }
    }

    #[test]
    fn test_create_assigns_id_and_timestamp() {
        let a = Entry::create("same", None, None, None);
        let b = Entry::create("same", None, None, None);
        assert_ne!(a.id, b.id);
        assert!(chrono::DateTime::parse_from_rfc3339(&a.timestamp).is_ok());
        assert!(a.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_create_keeps_caller_timestamp() {
        let entry = Entry::create("x", None, None, Some("2020-01-01T00:00:00Z".to_string()));
        assert_eq!(entry.timestamp, "2020-01-01T00:00:00Z");
    }
}
