//! Structured output parser for llmbind.
//!
//! Converts raw model text into a [`ParsedValue`] of the requested
//! [`ReturnShape`]:
//!
//! - integers and decimals: the first digit-based numeral; several distinct
//!   numerals are ambiguous
//! - dates and times: a [`TemporalResolver`] maps free text to canonical
//!   text, which is then parsed with a fixed format
//! - records: `field: value` lines (or a JSON object), each field parsed by
//!   its own kind; missing optional fields become [`ParsedValue::Absent`]
//!
//! Parsing either fully succeeds or fails with a [`ParseError`]; partial
//! values are never returned.

pub mod instructions;
pub mod numeric;
pub mod record;
pub mod temporal;

use std::sync::Arc;

use llmbind_core::error::ParseError;
use llmbind_core::shape::{ParsedValue, ReturnShape, ValueKind};

pub use instructions::format_instructions;
pub use temporal::{HeuristicResolver, TemporalResolver};

/// Parse one scalar or temporal value.
pub fn parse_value(
    raw: &str,
    kind: ValueKind,
    resolver: &dyn TemporalResolver,
) -> Result<ParsedValue, ParseError> {
    match kind {
        ValueKind::Text => Ok(ParsedValue::Text(raw.to_string())),
        ValueKind::Integer => numeric::parse_integer(raw).map(ParsedValue::Integer),
        ValueKind::Decimal => numeric::parse_decimal(raw).map(ParsedValue::Decimal),
        ValueKind::Date | ValueKind::Time | ValueKind::DateTime => {
            temporal::parse_temporal(raw, kind, resolver)
        }
    }
}

/// Parser with a pluggable temporal resolution strategy.
#[derive(Clone)]
pub struct OutputParser {
    resolver: Arc<dyn TemporalResolver>,
}

impl OutputParser {
    /// A parser using [`HeuristicResolver`] anchored at today's date.
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(HeuristicResolver::new()))
    }

    pub fn with_resolver(resolver: Arc<dyn TemporalResolver>) -> Self {
        Self { resolver }
    }

    pub fn parse(&self, raw: &str, shape: &ReturnShape) -> Result<ParsedValue, ParseError> {
        let parsed = match shape {
            ReturnShape::Value(kind) => parse_value(raw, *kind, self.resolver.as_ref()),
            ReturnShape::Record(schema) => record::parse_record(raw, schema, self.resolver.as_ref()),
        };
        if let Err(e) = &parsed {
            tracing::debug!(target_shape = %shape.describe(), reason = %e.reason, "Response did not parse");
        }
        parsed
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OutputParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputParser").finish_non_exhaustive()
    }
}
