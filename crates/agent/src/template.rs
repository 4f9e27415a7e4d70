//! Template engine: textual placeholder substitution.
//!
//! Placeholders are `{name}` or `{0}`; `{{` and `}}` produce literal braces.
//! There is no expression language: a placeholder is replaced by its
//! argument's text and nothing else.

use std::borrow::Cow;
use std::fmt::Display;

use llmbind_core::error::TemplateBindingError;

/// A placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Named(String),
    Index(usize),
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placeholder::Named(name) => f.write_str(name),
            Placeholder::Index(i) => write!(f, "{i}"),
        }
    }
}

enum Segment<'t> {
    Literal(&'t str),
    Brace(char),
    Slot(Placeholder),
}

fn segments(template: &str) -> Result<Vec<Segment<'_>>, TemplateBindingError> {
    let malformed = |position: usize, reason: &str| TemplateBindingError::Malformed {
        position,
        reason: reason.into(),
    };

    let bytes = template.as_bytes();
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                out.push(Segment::Literal(&template[literal_start..i]));
                out.push(Segment::Brace(bytes[i] as char));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let close = template[i + 1..]
                    .find('}')
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| malformed(i, "unclosed '{'"))?;
                let name = template[i + 1..close].trim();
                let slot = if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
                    let index = name.parse().map_err(|_| malformed(i, "index too large"))?;
                    Placeholder::Index(index)
                } else if is_identifier(name) {
                    Placeholder::Named(name.to_string())
                } else {
                    return Err(malformed(i, "placeholder must be a name or an index"));
                };
                out.push(Segment::Literal(&template[literal_start..i]));
                out.push(Segment::Slot(slot));
                i = close + 1;
                literal_start = i;
            }
            b'}' => return Err(malformed(i, "unmatched '}'")),
            _ => i += 1,
        }
    }
    out.push(Segment::Literal(&template[literal_start..]));
    Ok(out)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Distinct placeholders of a template, in order of first appearance.
pub fn placeholders(template: &str) -> Result<Vec<Placeholder>, TemplateBindingError> {
    let mut found: Vec<Placeholder> = Vec::new();
    for segment in segments(template)? {
        if let Segment::Slot(p) = segment {
            if !found.contains(&p) {
                found.push(p);
            }
        }
    }
    Ok(found)
}

/// Render with a caller-supplied lookup. Fails on the first placeholder the
/// lookup cannot resolve.
pub fn render_with<'a, F>(template: &str, mut lookup: F) -> Result<String, TemplateBindingError>
where
    F: FnMut(&Placeholder) -> Option<Cow<'a, str>>,
{
    let mut out = String::with_capacity(template.len());
    for segment in segments(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Brace(c) => out.push(c),
            Segment::Slot(p) => {
                let value = lookup(&p).ok_or_else(|| TemplateBindingError::MissingArgument {
                    placeholder: p.to_string(),
                })?;
                out.push_str(&value);
            }
        }
    }
    Ok(out)
}

/// Arguments for [`render`]: named values plus positional values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateArgs {
    named: Vec<(String, String)>,
    positional: Vec<String>,
}

impl TemplateArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a named argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Display) -> Self {
        let name = name.into();
        let value = value.to_string();
        match self.named.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.named.push((name, value)),
        }
        self
    }

    /// Append the next positional argument.
    pub fn push(mut self, value: impl Display) -> Self {
        self.positional.push(value.to_string());
        self
    }

    /// Build from positional values only.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        values.into_iter().fold(Self::new(), |args, v| args.push(v))
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn positional_values(&self) -> &[String] {
        &self.positional
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for TemplateArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |args, (k, v)| args.with(k, v))
    }
}

/// Render `template` with `args`.
///
/// Every placeholder needs an argument and every argument needs a
/// placeholder; either mismatch is a [`TemplateBindingError`].
pub fn render(template: &str, args: &TemplateArgs) -> Result<String, TemplateBindingError> {
    let used = placeholders(template)?;

    if let Some((name, _)) = args
        .named
        .iter()
        .find(|(n, _)| !used.contains(&Placeholder::Named(n.clone())))
    {
        return Err(TemplateBindingError::UnusedArgument {
            argument: name.clone(),
        });
    }
    if let Some(index) =
        (0..args.positional.len()).find(|i| !used.contains(&Placeholder::Index(*i)))
    {
        return Err(TemplateBindingError::UnusedArgument {
            argument: index.to_string(),
        });
    }

    render_with(template, |p| match p {
        Placeholder::Named(name) => args.get(name).map(Cow::Borrowed),
        Placeholder::Index(i) => args.positional.get(*i).map(|v| Cow::Borrowed(v.as_str())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_named_placeholder() {
        let args = TemplateArgs::new().with("text", "John moved to Lyon.");
        let prompt = render("Extract the person's name and city from: {text}", &args).unwrap();
        assert!(prompt.contains("Extract the person's name and city from: "));
        assert!(prompt.contains("John moved to Lyon."));
        assert!(!prompt.contains("{text}"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let args = TemplateArgs::new().with("a", 1).with("b", "two");
        let t = "{a} then {b} then {a}";
        assert_eq!(render(t, &args).unwrap(), render(t, &args).unwrap());
        assert_eq!(render(t, &args).unwrap(), "1 then two then 1");
    }

    #[test]
    fn positional_placeholders() {
        let args = TemplateArgs::positional(["cucumber", "feta"]);
        assert_eq!(
            render("Recipe with {0} and {1}", &args).unwrap(),
            "Recipe with cucumber and feta"
        );
    }

    #[test]
    fn missing_argument_fails() {
        let err = render("Hello {name}", &TemplateArgs::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateBindingError::MissingArgument {
                placeholder: "name".into()
            }
        );
    }

    #[test]
    fn unused_argument_fails() {
        let args = TemplateArgs::new().with("name", "Ada").with("age", 36);
        let err = render("Hello {name}", &args).unwrap_err();
        assert_eq!(
            err,
            TemplateBindingError::UnusedArgument {
                argument: "age".into()
            }
        );
        let err = render("Hello", &TemplateArgs::positional(["x"])).unwrap_err();
        assert!(matches!(err, TemplateBindingError::UnusedArgument { .. }));
    }

    #[test]
    fn escaped_braces_are_literal() {
        let args = TemplateArgs::new().with("k", "v");
        assert_eq!(
            render(r#"Answer as {{"key": "{k}"}}"#, &args).unwrap(),
            r#"Answer as {"key": "v"}"#
        );
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let args = TemplateArgs::new().with("text", "{other}");
        assert_eq!(render("Echo: {text}", &args).unwrap(), "Echo: {other}");
    }

    #[test]
    fn malformed_templates() {
        assert!(matches!(
            placeholders("oops {name"),
            Err(TemplateBindingError::Malformed { position: 5, .. })
        ));
        assert!(placeholders("a } b").is_err());
        assert!(placeholders("{two words}").is_err());
    }

    #[test]
    fn placeholders_in_first_appearance_order() {
        let found = placeholders("{b} {a} {b} {0}").unwrap();
        assert_eq!(
            found,
            vec![
                Placeholder::Named("b".into()),
                Placeholder::Named("a".into()),
                Placeholder::Index(0)
            ]
        );
    }

    #[test]
    fn collect_named_args() {
        let args: TemplateArgs = [("city", "Lyon")].into_iter().collect();
        assert_eq!(args.get("city"), Some("Lyon"));
    }
}
