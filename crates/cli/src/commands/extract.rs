//! `llmbind extract`: Pull a typed value out of free text.

use clap::ValueEnum;
use llmbind_agent::{AssistantContract, MethodSpec, TemplateArgs};
use llmbind_core::shape::{FieldSpec, ParsedValue, RecordSchema, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractKind {
    Int,
    Decimal,
    Date,
    Time,
    Datetime,
    Person,
}

impl ExtractKind {
    fn method(self) -> &'static str {
        match self {
            ExtractKind::Int => "extract_int",
            ExtractKind::Decimal => "extract_decimal",
            ExtractKind::Date => "extract_date",
            ExtractKind::Time => "extract_time",
            ExtractKind::Datetime => "extract_date_time",
            ExtractKind::Person => "extract_person",
        }
    }
}

fn person() -> RecordSchema {
    RecordSchema::new("person")
        .field(FieldSpec::required("firstName", ValueKind::Text))
        .field(FieldSpec::required("lastName", ValueKind::Text))
        .field(FieldSpec::optional("birthDate", ValueKind::Date).describe("date of birth"))
        .field(FieldSpec::optional("city", ValueKind::Text).describe("where the person lives"))
}

pub fn extraction_contract() -> anyhow::Result<AssistantContract> {
    let scalar = |name: &str, what: &str, kind: ValueKind| {
        MethodSpec::new(name, format!("Extract {what} from the following text: {{text}}"))
            .param("text")
            .returns(kind)
    };

    Ok(AssistantContract::builder("extractor")
        .method(scalar("extract_int", "a whole number", ValueKind::Integer))
        .method(scalar("extract_decimal", "a number", ValueKind::Decimal))
        .method(scalar("extract_date", "a date", ValueKind::Date))
        .method(scalar("extract_time", "a time", ValueKind::Time))
        .method(scalar("extract_date_time", "a date and time", ValueKind::DateTime))
        .method(
            MethodSpec::new("extract_person", "Extract information about a person from {text}")
                .param("text")
                .returns(person()),
        )
        .build()?)
}

pub async fn run(kind: ExtractKind, text: &str) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let assistant = super::assistant_builder(&config, extraction_contract()?)?.build()?;

    let value = assistant
        .invoke(kind.method(), TemplateArgs::new().with("text", text))
        .await?;
    print_value(&value);
    Ok(())
}

fn print_value(value: &ParsedValue) {
    match value.as_record() {
        Some(record) => {
            for (name, field) in &record.fields {
                if field.is_absent() {
                    println!("{name}: (absent)");
                } else {
                    println!("{name}: {field}");
                }
            }
        }
        None => println!("{value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_method() {
        let contract = extraction_contract().unwrap();
        for kind in ExtractKind::value_variants() {
            assert!(contract.method(kind.method()).is_some(), "{kind:?}");
        }
    }

    #[test]
    fn person_returns_a_record() {
        let contract = extraction_contract().unwrap();
        let method = contract.method("extract_person").unwrap();
        assert!(!method.return_shape.is_text());
        assert!(!contract.uses_retrieval());
    }
}
