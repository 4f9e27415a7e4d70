//! Record extraction: one `field: value` line per declared field, or a
//! single JSON object keyed by field name.

use llmbind_core::error::ParseError;
use llmbind_core::shape::{ParsedValue, Record, RecordSchema, ValueKind};
use serde_json::Value;

use crate::parse_value;
use crate::temporal::TemporalResolver;

/// Values a model writes when it has nothing for a non-text field.
const BLANKS: &[&str] = &["", "none", "null", "n/a", "na", "unknown", "-"];

/// One supplied field value. `literal` marks a JSON string (bare or quoted
/// on a line), which is taken verbatim for text fields.
struct Supplied {
    key: String,
    text: String,
    literal: bool,
}

pub fn parse_record(
    raw: &str,
    schema: &RecordSchema,
    resolver: &dyn TemporalResolver,
) -> Result<ParsedValue, ParseError> {
    let target = format!("record {}", schema.name);
    let keys: Vec<String> = schema.fields.iter().map(|f| normalize_key(&f.name)).collect();
    let supplied = supplied_fields(raw, &keys);

    let mut fields = Vec::with_capacity(schema.fields.len());
    for (field, key) in schema.fields.iter().zip(&keys) {
        let value = supplied
            .iter()
            .find(|s| s.key == *key)
            .filter(|s| !is_blank(s, field.kind));

        let parsed = match value {
            Some(s) => parse_value(&s.text, field.kind, resolver).map_err(|e| {
                ParseError::new(&target, format!("field '{}': {}", field.name, e.reason))
            })?,
            None if field.required => {
                return Err(ParseError::new(
                    &target,
                    format!("missing required field '{}'", field.name),
                ));
            }
            None => ParsedValue::Absent,
        };
        fields.push((field.name.clone(), parsed));
    }

    Ok(ParsedValue::Record(Record { fields }))
}

fn is_blank(supplied: &Supplied, kind: ValueKind) -> bool {
    match kind {
        ValueKind::Text => !supplied.literal && supplied.text.is_empty(),
        _ => BLANKS.contains(&supplied.text.to_lowercase().as_str()),
    }
}

/// A response that is a JSON object (optionally fenced) is read as one.
/// Otherwise `field: value` lines win as soon as they name a declared field;
/// an object embedded in prose is the last resort.
fn supplied_fields(raw: &str, keys: &[String]) -> Vec<Supplied> {
    let body = strip_fence(raw.trim());
    if body.starts_with('{') && body.ends_with('}') {
        if let Some(fields) = json_fields(body) {
            return fields;
        }
    }

    let lines = line_fields(raw);
    if lines.iter().any(|s| keys.contains(&s.key)) {
        return lines;
    }

    embedded_json(raw)
        .filter(|fields| fields.iter().any(|s| keys.contains(&s.key)))
        .unwrap_or(lines)
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// `first_name`, `firstName` and `First Name` all name the same field.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn embedded_json(raw: &str) -> Option<Vec<Supplied>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    json_fields(&raw[start..=end])
}

fn json_fields(text: &str) -> Option<Vec<Supplied>> {
    let object: serde_json::Map<String, Value> = serde_json::from_str(text).ok()?;

    Some(
        object
            .into_iter()
            .filter_map(|(key, value)| {
                let (text, literal) = match value {
                    Value::Null => return None,
                    Value::String(s) => (s, true),
                    other => (other.to_string(), false),
                };
                Some(Supplied {
                    key: normalize_key(&key),
                    text,
                    literal,
                })
            })
            .collect(),
    )
}

fn line_fields(raw: &str) -> Vec<Supplied> {
    let mut fields: Vec<Supplied> = Vec::new();
    for line in raw.lines() {
        let line = line
            .trim()
            .trim_start_matches(['-', '*', '•'])
            .trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = normalize_key(key);
        if key.is_empty() || fields.iter().any(|s| s.key == key) {
            continue;
        }
        let value = value
            .trim()
            .trim_end_matches(',')
            .trim_start_matches("**")
            .trim();
        let (text, literal) = match serde_json::from_str::<String>(value) {
            Ok(decoded) => (decoded, true),
            Err(_) => (value.trim_matches('"').trim().to_string(), false),
        };
        fields.push(Supplied { key, text, literal });
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::HeuristicResolver;
    use chrono::NaiveDate;
    use llmbind_core::shape::FieldSpec;

    fn person() -> RecordSchema {
        RecordSchema::new("Person")
            .field(FieldSpec::required("first_name", ValueKind::Text))
            .field(FieldSpec::required("last_name", ValueKind::Text))
            .field(FieldSpec::optional("birth_date", ValueKind::Date))
    }

    fn resolver() -> HeuristicResolver {
        HeuristicResolver::with_reference(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn parses_field_lines() {
        let raw = "first_name: John\nlast_name: Doe\nbirth_date: 1968-08-15";
        let value = parse_record(raw, &person(), &resolver()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("first_name"), Some(&ParsedValue::Text("John".into())));
        assert_eq!(
            record.get("birth_date"),
            Some(&ParsedValue::Date(NaiveDate::from_ymd_opt(1968, 8, 15).unwrap()))
        );
    }

    #[test]
    fn tolerates_bullets_and_key_styles() {
        let raw = "Here you go:\n- **First Name:** John\n- lastName: \"Doe\"\n";
        let value = parse_record(raw, &person(), &resolver()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("first_name"), Some(&ParsedValue::Text("John".into())));
        assert_eq!(record.get("last_name"), Some(&ParsedValue::Text("Doe".into())));
    }

    #[test]
    fn parses_json_object() {
        let raw = r#"```json
{"firstName": "John", "lastName": "Doe", "birthDate": null}
```"#;
        let value = parse_record(raw, &person(), &resolver()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("last_name"), Some(&ParsedValue::Text("Doe".into())));
        assert_eq!(record.get("birth_date"), Some(&ParsedValue::Absent));
    }

    #[test]
    fn missing_optional_is_absent() {
        let raw = "first_name: John\nlast_name: Doe\nbirth_date: unknown";
        let value = parse_record(raw, &person(), &resolver()).unwrap();
        assert!(value.as_record().unwrap().get("birth_date").unwrap().is_absent());
    }

    #[test]
    fn missing_required_fails() {
        let err = parse_record("first_name: John", &person(), &resolver()).unwrap_err();
        assert_eq!(err.target, "record Person");
        assert!(err.reason.contains("last_name"));
    }

    #[test]
    fn bad_field_value_fails_whole_record() {
        let raw = "first_name: John\nlast_name: Doe\nbirth_date: sometime";
        let err = parse_record(raw, &person(), &resolver()).unwrap_err();
        assert!(err.reason.contains("birth_date"));
    }

    #[test]
    fn canonical_rendering_round_trips() {
        let raw = "first_name: John\nlast_name: Doe";
        let value = parse_record(raw, &person(), &resolver()).unwrap();
        let again = parse_record(&value.to_string(), &person(), &resolver()).unwrap();
        assert_eq!(again, value);
    }

    fn snippet() -> RecordSchema {
        RecordSchema::new("Snippet")
            .field(FieldSpec::required("name", ValueKind::Text))
            .field(FieldSpec::required("body", ValueKind::Text))
    }

    #[test]
    fn braces_in_a_line_value_stay_text() {
        let raw = "name: empty map\nbody: {}";
        let value = parse_record(raw, &snippet(), &resolver()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("name"), Some(&ParsedValue::Text("empty map".into())));
        assert_eq!(record.get("body"), Some(&ParsedValue::Text("{}".into())));
    }

    #[test]
    fn json_object_embedded_in_prose() {
        let raw = r#"Sure! {"first_name": "Ada", "last_name": "Lovelace"} Hope that helps."#;
        let value = parse_record(raw, &person(), &resolver()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("last_name"), Some(&ParsedValue::Text("Lovelace".into())));
    }

    #[test]
    fn awkward_text_values_round_trip() {
        let values = [
            "{\"name\": \"nested\"}",
            "none",
            "-",
            "\"quoted\"",
            "trailing,",
            "**bold",
            "  padded ",
            "two\nlines",
            "",
        ];
        for body in values {
            let value = ParsedValue::Record(Record {
                fields: vec![
                    ("name".into(), ParsedValue::Text("sample".into())),
                    ("body".into(), ParsedValue::Text(body.into())),
                ],
            });
            let again = parse_record(&value.to_string(), &snippet(), &resolver()).unwrap();
            assert_eq!(again, value, "body {body:?}");
        }
    }

    #[test]
    fn blank_words_only_blank_non_text_fields() {
        let raw = "first_name: Unknown\nlast_name: -\nbirth_date: n/a";
        let value = parse_record(raw, &person(), &resolver()).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("first_name"), Some(&ParsedValue::Text("Unknown".into())));
        assert_eq!(record.get("last_name"), Some(&ParsedValue::Text("-".into())));
        assert!(record.get("birth_date").unwrap().is_absent());
    }
}
