//! Format instructions appended to prompts for non-text return shapes.

use llmbind_core::shape::{RecordSchema, ReturnShape, ValueKind};

fn kind_format(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Text => "text",
        ValueKind::Integer => "integer number",
        ValueKind::Decimal => "decimal number",
        ValueKind::Date => "date in the format yyyy-MM-dd",
        ValueKind::Time => "time in the format HH:mm:ss",
        ValueKind::DateTime => "date-time in the format yyyy-MM-ddTHH:mm:ss",
    }
}

/// The instruction telling the model how to shape its answer, or `None`
/// when the method returns free text.
pub fn format_instructions(shape: &ReturnShape) -> Option<String> {
    match shape {
        ReturnShape::Value(ValueKind::Text) => None,
        ReturnShape::Value(kind) => Some(format!(
            "You must answer strictly with a single {} and nothing else.",
            kind_format(*kind)
        )),
        ReturnShape::Record(schema) => Some(record_instructions(schema)),
    }
}

fn record_instructions(schema: &RecordSchema) -> String {
    let mut out = String::from(
        "You must answer strictly with one line per field, written as `field: value`, and nothing else:\n",
    );
    for field in &schema.fields {
        out.push_str(&format!("{}: {}", field.name, kind_format(field.kind)));
        if let Some(description) = &field.description {
            out.push_str(&format!(" ({description})"));
        }
        if !field.required {
            out.push_str(" [optional; write `none` if unknown]");
        }
        out.push('\n');
    }
    out
}
