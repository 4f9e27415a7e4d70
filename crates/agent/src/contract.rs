//! Assistant contracts: the declared methods an assistant exposes.
//!
//! A method is plain data (name, template, parameter names, return shape,
//! retrieval and memory flags). A contract is validated once when built and
//! is immutable afterwards; lookups go through a name index.

use std::borrow::Cow;
use std::collections::HashMap;

use llmbind_core::error::{Error, TemplateBindingError};
use llmbind_core::shape::ReturnShape;

use crate::template::{placeholders, render_with, Placeholder, TemplateArgs};

/// One declared assistant method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSpec {
    pub name: String,
    pub template: String,
    /// Parameter names, in call order. `{0}` in the template means `params[0]`.
    pub params: Vec<String>,
    pub return_shape: ReturnShape,
    pub retrieval_augmented: bool,
    pub memory_aware: bool,
}

impl MethodSpec {
    /// A text-returning method with no parameters yet.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            params: Vec::new(),
            return_shape: ReturnShape::text(),
            retrieval_augmented: false,
            memory_aware: false,
        }
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn returns(mut self, shape: impl Into<ReturnShape>) -> Self {
        self.return_shape = shape.into();
        self
    }

    pub fn retrieval_augmented(mut self) -> Self {
        self.retrieval_augmented = true;
        self
    }

    pub fn memory_aware(mut self) -> Self {
        self.memory_aware = true;
        self
    }

    /// Placeholders and parameters must correspond one to one.
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("method name must not be empty".into());
        }

        let mut seen: Vec<&str> = Vec::new();
        for param in &self.params {
            if seen.contains(&param.as_str()) {
                return Err(format!("{}: parameter '{param}' declared twice", self.name));
            }
            seen.push(param);
        }

        let slots = placeholders(&self.template).map_err(|e| format!("{}: {e}", self.name))?;
        let mut referenced = vec![false; self.params.len()];
        for slot in &slots {
            let index = match slot {
                Placeholder::Named(name) => self.params.iter().position(|p| p == name),
                Placeholder::Index(i) => (*i < self.params.len()).then_some(*i),
            };
            match index {
                Some(i) => referenced[i] = true,
                None => {
                    return Err(format!(
                        "{}: placeholder {{{slot}}} matches no declared parameter",
                        self.name
                    ));
                }
            }
        }

        if let Some(i) = referenced.iter().position(|r| !r) {
            return Err(format!(
                "{}: parameter '{}' is not used by the template",
                self.name, self.params[i]
            ));
        }
        Ok(())
    }

    /// Render this method's template. Arguments may be named after the
    /// parameters or given positionally in parameter order.
    pub fn render(&self, args: &TemplateArgs) -> Result<String, TemplateBindingError> {
        let mut values: Vec<Option<&str>> = vec![None; self.params.len()];

        let positional = args
            .positional_values()
            .iter()
            .enumerate()
            .map(|(i, value)| (Some(i), i.to_string(), value.as_str()));
        let named = args
            .named()
            .map(|(name, value)| (self.params.iter().position(|p| p == name), name.to_string(), value));

        for (index, argument, value) in positional.chain(named) {
            let slot = index
                .and_then(|i| values.get_mut(i))
                .filter(|slot| slot.is_none())
                .ok_or(TemplateBindingError::UnusedArgument { argument })?;
            *slot = Some(value);
        }

        render_with(&self.template, |slot| {
            let index = match slot {
                Placeholder::Named(name) => self.params.iter().position(|p| p == name)?,
                Placeholder::Index(i) => *i,
            };
            values.get(index).copied().flatten().map(Cow::Borrowed)
        })
    }
}

/// A named, immutable set of methods.
#[derive(Debug, Clone)]
pub struct AssistantContract {
    name: String,
    methods: Vec<MethodSpec>,
    index: HashMap<String, usize>,
}

impl AssistantContract {
    pub fn builder(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.index.get(name).map(|&i| &self.methods[i])
    }

    /// All methods, in declaration order.
    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    pub fn uses_retrieval(&self) -> bool {
        self.methods.iter().any(|m| m.retrieval_augmented)
    }
}

/// Collects methods, then validates them all in [`ContractBuilder::build`].
#[derive(Debug)]
pub struct ContractBuilder {
    name: String,
    methods: Vec<MethodSpec>,
}

impl ContractBuilder {
    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn build(self) -> Result<AssistantContract, Error> {
        let contract_error = |message: String| Error::Contract { message };

        let mut index = HashMap::with_capacity(self.methods.len());
        for (i, method) in self.methods.iter().enumerate() {
            method.validate().map_err(contract_error)?;
            if index.insert(method.name.clone(), i).is_some() {
                return Err(contract_error(format!(
                    "method '{}' declared twice in {}",
                    method.name, self.name
                )));
            }
        }

        tracing::debug!(contract = %self.name, methods = self.methods.len(), "Contract registered");
        Ok(AssistantContract {
            name: self.name,
            methods: self.methods,
            index,
        })
    }
}
