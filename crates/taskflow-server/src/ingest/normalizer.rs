//! Record normalizer
//!
//! Turns uploaded bytes into [`Task`]s. The payload must be a JSON array of
//! objects, each with at least `id`, `title`, `description` and `completed`.
//! Any other field is carried through untouched in [`Task::extra`].
//!
//! A single bad record rejects the whole batch: nothing partial ever reaches
//! the store.

use serde_json::{Map, Value};
use std::collections::HashSet;

use super::error::NormalizeError;
use crate::models::Task;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One decoded record before its fields are checked
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// Position in the uploaded array, used in error messages
    pub index: usize,
    /// Raw `id` value; `Value::Null` when the field was absent
    pub id: Value,
    /// Every other field of the record
    pub fields: Map<String, Value>,
}

/// Decode raw bytes into candidate records
pub fn parse(bytes: &[u8]) -> Result<Vec<CandidateRecord>, NormalizeError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| NormalizeError::malformed(format!("payload is not valid JSON: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(NormalizeError::malformed(format!(
            "expected a JSON array of records, found {}",
            json_type(&value)
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(mut fields) => {
                let id = fields.remove("id").unwrap_or(Value::Null);
                Ok(CandidateRecord { index, id, fields })
            },
            other => Err(NormalizeError::malformed(format!(
                "record {} is {}, expected an object",
                index,
                json_type(&other)
            ))),
        })
        .collect()
}

/// Coerce the record's `id` to an integer
///
/// Accepts integers, integral floats (`7.0`) and base-10 strings (`"7"`,
/// `" 42 "`). Everything else is an [`NormalizeError::InvalidIdentifier`].
pub fn normalize_id(record: &CandidateRecord) -> Result<i64, NormalizeError> {
    let index = record.index;

    match &record.id {
        Value::Null => Err(NormalizeError::invalid_id(index, "id is missing")),
        Value::Number(number) => {
            if let Some(id) = number.as_i64() {
                return Ok(id);
            }
            if number.is_u64() {
                return Err(NormalizeError::invalid_id(
                    index,
                    format!("id {} does not fit in a 64-bit integer", number),
                ));
            }
            match number.as_f64() {
                // 2^63 is exactly representable, so `<` keeps the cast in range
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                },
                _ => Err(NormalizeError::invalid_id(
                    index,
                    format!("id {} is not an integer", number),
                )),
            }
        },
        Value::String(raw) => raw.trim().parse::<i64>().map_err(|_| {
            NormalizeError::invalid_id(index, format!("id {:?} is not an integer", raw))
        }),
        other => Err(NormalizeError::invalid_id(
            index,
            format!("id must be a string or number, found {}", json_type(other)),
        )),
    }
}

/// Validate one candidate and build the task it describes
pub fn normalize_record(record: CandidateRecord) -> Result<Task, NormalizeError> {
    let id = normalize_id(&record)?;
    let CandidateRecord {
        index, mut fields, ..
    } = record;

    let title = take_string(&mut fields, index, "title")?;
    let description = take_string(&mut fields, index, "description")?;
    let completed = match fields.remove("completed") {
        Some(Value::Bool(completed)) => completed,
        Some(other) => {
            return Err(NormalizeError::malformed(format!(
                "record {}: completed must be a boolean, found {}",
                index,
                json_type(&other)
            )))
        },
        None => return Err(missing_field(index, "completed")),
    };

    Ok(Task {
        id,
        title,
        description,
        completed,
        extra: fields,
    })
}

/// Normalize every candidate, aborting on the first bad one
///
/// Repeated ids collapse to their last occurrence, the same outcome the
/// store's upsert would produce.
pub fn normalize_batch(records: Vec<CandidateRecord>) -> Result<Vec<Task>, NormalizeError> {
    let tasks = records
        .into_iter()
        .map(normalize_record)
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::with_capacity(tasks.len());
    let mut deduped: Vec<Task> = tasks
        .into_iter()
        .rev()
        .filter(|task| seen.insert(task.id))
        .collect();
    deduped.reverse();

    Ok(deduped)
}

/// Parse and normalize an uploaded payload in one step
pub fn normalize(bytes: &[u8]) -> Result<Vec<Task>, NormalizeError> {
    normalize_batch(parse(bytes)?)
}

fn take_string(
    fields: &mut Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<String, NormalizeError> {
    match fields.remove(field) {
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(NormalizeError::malformed(format!(
            "record {}: {} must be a string, found {}",
            index,
            field,
            json_type(&other)
        ))),
        None => Err(missing_field(index, field)),
    }
}

fn missing_field(index: usize, field: &str) -> NormalizeError {
    NormalizeError::malformed(format!("record {}: required field '{}' is missing", index, field))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(id: Value) -> CandidateRecord {
        CandidateRecord {
            index: 0,
            id,
            fields: Map::new(),
        }
    }

    #[test]
    fn test_parse_splits_id_from_fields() {
        let records = parse(br#"[{"id":"7","title":"a","description":"d","completed":false}]"#)
            .expect("valid payload");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, json!("7"));
        assert!(!records[0].fields.contains_key("id"));
        assert_eq!(records[0].fields.get("title"), Some(&json!("a")));
    }

    #[test]
    fn test_parse_accepts_bom_and_empty_array() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"  [ ]\n");
        assert!(parse(&bytes).expect("empty batch").is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array_payloads() {
        let payloads: [&[u8]; 5] = [
            br#"{"id":1}"#,
            b"not json",
            b"",
            b"[1, 2]",
            br#"[{"id":1}, null]"#,
        ];

        for payload in payloads {
            assert!(
                matches!(parse(payload), Err(NormalizeError::MalformedPayload { .. })),
                "payload {:?} should be malformed",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn test_normalize_id_accepts_integer_forms() {
        assert_eq!(normalize_id(&candidate(json!(7))).unwrap(), 7);
        assert_eq!(normalize_id(&candidate(json!(-3))).unwrap(), -3);
        assert_eq!(normalize_id(&candidate(json!(7.0))).unwrap(), 7);
        assert_eq!(normalize_id(&candidate(json!("7"))).unwrap(), 7);
        assert_eq!(normalize_id(&candidate(json!(" 42 "))).unwrap(), 42);
        assert_eq!(
            normalize_id(&candidate(json!(i64::MAX.to_string()))).unwrap(),
            i64::MAX
        );
    }

    #[test]
    fn test_normalize_id_rejects_non_coercible_values() {
        let bad = [
            json!("x"),
            json!("7.5"),
            json!(""),
            json!(7.5),
            json!(u64::MAX),
            json!(true),
            json!(null),
            json!([7]),
            json!({ "value": 7 }),
        ];

        for id in bad {
            assert!(
                matches!(
                    normalize_id(&candidate(id.clone())),
                    Err(NormalizeError::InvalidIdentifier { .. })
                ),
                "id {} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_normalize_keeps_unknown_fields() {
        let tasks = normalize(
            br#"[{"id":"7","title":"a","description":"d","completed":false,"priority":2,"tags":["x"]}]"#,
        )
        .unwrap();

        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.id, 7);
        assert_eq!(task.title, "a");
        assert_eq!(task.description, "d");
        assert!(!task.completed);
        assert_eq!(task.extra.get("priority"), Some(&json!(2)));
        assert_eq!(task.extra.get("tags"), Some(&json!(["x"])));
        assert_eq!(task.extra.len(), 2);
    }

    #[test]
    fn test_one_bad_id_rejects_the_whole_batch() {
        let result = normalize(
            br#"[
                {"id":1,"title":"ok","description":"","completed":true},
                {"id":"x","title":"bad","description":"","completed":false},
                {"id":3,"title":"ok","description":"","completed":false}
            ]"#,
        );

        assert_eq!(
            result,
            Err(NormalizeError::InvalidIdentifier {
                index: 1,
                reason: "id \"x\" is not an integer".to_string()
            })
        );
    }

    #[test]
    fn test_missing_or_mistyped_required_fields_are_malformed() {
        let payloads: [&[u8]; 4] = [
            br#"[{"id":1,"description":"","completed":true}]"#,
            br#"[{"id":1,"title":"t","completed":true}]"#,
            br#"[{"id":1,"title":"t","description":"","completed":"yes"}]"#,
            br#"[{"id":1,"title":5,"description":"","completed":true}]"#,
        ];

        for payload in payloads {
            assert!(matches!(
                normalize(payload),
                Err(NormalizeError::MalformedPayload { .. })
            ));
        }
    }

    #[test]
    fn test_duplicate_ids_keep_last_occurrence() {
        let tasks = normalize(
            br#"[
                {"id":1,"title":"first","description":"","completed":false},
                {"id":2,"title":"other","description":"","completed":false},
                {"id":"1","title":"second","description":"","completed":true}
            ]"#,
        )
        .unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, 2);
        assert_eq!(tasks[1].id, 1);
        assert_eq!(tasks[1].title, "second");
        assert!(tasks[1].completed);
    }
}
