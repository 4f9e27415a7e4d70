//! Return shapes and parsed values.
//!
//! A [`ReturnShape`] is what an assistant method declares it returns; a
//! [`ParsedValue`] is what the output parser hands back. The `Display` impl
//! of `ParsedValue` is the canonical rendering: parsing it again with the
//! matching shape yields an equal value.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use crate::error::ParseError;

/// Canonical formats used by both rendering and the strict parse stage.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A scalar or temporal value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Integer,
    Decimal,
    Date,
    Time,
    DateTime,
}

impl ValueKind {
    pub fn is_temporal(self) -> bool {
        matches!(self, ValueKind::Date | ValueKind::Time | ValueKind::DateTime)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Text => "text",
            ValueKind::Integer => "integer",
            ValueKind::Decimal => "decimal",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::DateTime => "date-time",
        };
        f.write_str(name)
    }
}

/// One field of a record schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ValueKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named record: field name to scalar/temporal kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// The declared return shape of an assistant method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    Value(ValueKind),
    Record(RecordSchema),
}

impl ReturnShape {
    pub fn text() -> Self {
        ReturnShape::Value(ValueKind::Text)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ReturnShape::Value(ValueKind::Text))
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            ReturnShape::Value(kind) => kind.to_string(),
            ReturnShape::Record(schema) => format!("record {}", schema.name),
        }
    }
}

impl From<ValueKind> for ReturnShape {
    fn from(kind: ValueKind) -> Self {
        ReturnShape::Value(kind)
    }
}

impl From<RecordSchema> for ReturnShape {
    fn from(schema: RecordSchema) -> Self {
        ReturnShape::Record(schema)
    }
}

/// Parsed record fields, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub fields: Vec<(String, ParsedValue)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&ParsedValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// The output of the structured output parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParsedValue {
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Text(String),
    Record(Record),
    /// An optional record field the model did not supply.
    Absent,
}

impl ParsedValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, ParsedValue::Absent)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            ParsedValue::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParsedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParsedValue::Integer(n) => write!(f, "{n}"),
            ParsedValue::Decimal(d) => write!(f, "{d}"),
            ParsedValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            ParsedValue::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            ParsedValue::DateTime(dt) => write!(f, "{}", dt.format(DATE_TIME_FORMAT)),
            ParsedValue::Text(s) => f.write_str(s),
            ParsedValue::Record(record) => {
                let mut first = true;
                for (name, value) in &record.fields {
                    if value.is_absent() {
                        continue;
                    }
                    if !first {
                        writeln!(f)?;
                    }
                    match value {
                        ParsedValue::Text(text) if needs_quoting(text) => {
                            let quoted = serde_json::to_string(text).map_err(|_| std::fmt::Error)?;
                            write!(f, "{name}: {quoted}")?;
                        }
                        _ => write!(f, "{name}: {value}")?,
                    }
                    first = false;
                }
                Ok(())
            }
            ParsedValue::Absent => Ok(()),
        }
    }
}

/// Record text that a `field: value` line would not carry verbatim is
/// written as a JSON string.
fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text.trim() != text
        || text.starts_with('"')
        || text.ends_with('"')
        || text.ends_with(',')
        || text.starts_with("**")
        || text.chars().any(char::is_control)
}

fn mismatch(expected: &str, got: &ParsedValue) -> ParseError {
    ParseError::new(expected, format!("value is {got:?}"))
}

impl TryFrom<ParsedValue> for i64 {
    type Error = ParseError;

    fn try_from(value: ParsedValue) -> Result<Self, Self::Error> {
        match value {
            ParsedValue::Integer(n) => Ok(n),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl TryFrom<ParsedValue> for f64 {
    type Error = ParseError;

    fn try_from(value: ParsedValue) -> Result<Self, Self::Error> {
        match value {
            ParsedValue::Decimal(d) => Ok(d),
            ParsedValue::Integer(n) => Ok(n as f64),
            other => Err(mismatch("decimal", &other)),
        }
    }
}

impl TryFrom<ParsedValue> for NaiveDate {
    type Error = ParseError;

    fn try_from(value: ParsedValue) -> Result<Self, Self::Error> {
        match value {
            ParsedValue::Date(d) => Ok(d),
            other => Err(mismatch("date", &other)),
        }
    }
}

impl TryFrom<ParsedValue> for NaiveTime {
    type Error = ParseError;

    fn try_from(value: ParsedValue) -> Result<Self, Self::Error> {
        match value {
            ParsedValue::Time(t) => Ok(t),
            other => Err(mismatch("time", &other)),
        }
    }
}

impl TryFrom<ParsedValue> for NaiveDateTime {
    type Error = ParseError;

    fn try_from(value: ParsedValue) -> Result<Self, Self::Error> {
        match value {
            ParsedValue::DateTime(dt) => Ok(dt),
            other => Err(mismatch("date-time", &other)),
        }
    }
}

impl TryFrom<ParsedValue> for String {
    type Error = ParseError;

    fn try_from(value: ParsedValue) -> Result<Self, Self::Error> {
        match value {
            ParsedValue::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl TryFrom<ParsedValue> for Record {
    type Error = ParseError;

    fn try_from(value: ParsedValue) -> Result<Self, Self::Error> {
        match value {
            ParsedValue::Record(r) => Ok(r),
            other => Err(mismatch("record", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_temporal_rendering() {
        let date = NaiveDate::from_ymd_opt(1968, 7, 4).unwrap();
        let time = NaiveTime::from_hms_opt(23, 45, 0).unwrap();
        assert_eq!(ParsedValue::Date(date).to_string(), "1968-07-04");
        assert_eq!(ParsedValue::Time(time).to_string(), "23:45:00");
        assert_eq!(
            ParsedValue::DateTime(date.and_time(time)).to_string(),
            "1968-07-04T23:45:00"
        );
    }

    #[test]
    fn record_rendering_skips_absent_fields() {
        let record = ParsedValue::Record(Record {
            fields: vec![
                ("first_name".into(), ParsedValue::Text("John".into())),
                ("nickname".into(), ParsedValue::Absent),
                ("age".into(), ParsedValue::Integer(56)),
            ],
        });
        assert_eq!(record.to_string(), "first_name: John\nage: 56");
    }

    #[test]
    fn record_text_quoted_when_lines_would_alter_it() {
        let record = ParsedValue::Record(Record {
            fields: vec![
                ("motto".into(), ParsedValue::Text("\"carpe diem\"".into())),
                ("note".into(), ParsedValue::Text("two\nlines".into())),
                ("plain".into(), ParsedValue::Text("none".into())),
            ],
        });
        assert_eq!(
            record.to_string(),
            "motto: \"\\\"carpe diem\\\"\"\nnote: \"two\\nlines\"\nplain: none"
        );
    }

    #[test]
    fn typed_conversions() {
        assert_eq!(i64::try_from(ParsedValue::Integer(42)).unwrap(), 42);
        assert_eq!(f64::try_from(ParsedValue::Integer(2)).unwrap(), 2.0);
        assert!(i64::try_from(ParsedValue::Text("42".into())).is_err());
        assert!(NaiveDate::try_from(ParsedValue::Absent).is_err());
    }

    #[test]
    fn record_lookup() {
        let record = Record {
            fields: vec![("city".into(), ParsedValue::Text("Lyon".into()))],
        };
        assert_eq!(record.get("city"), Some(&ParsedValue::Text("Lyon".into())));
        assert!(record.get("country").is_none());
    }

    #[test]
    fn shape_descriptions() {
        assert_eq!(ReturnShape::from(ValueKind::DateTime).describe(), "date-time");
        assert_eq!(ReturnShape::from(RecordSchema::new("Person")).describe(), "record Person");
        assert!(ReturnShape::text().is_text());
    }
}
