// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Running rules against containers.

use std::fmt;
use std::sync::Arc;

use tracing::{trace, trace_span};
use understory_schema::{
    DefaultFormatter, PropertyContainer, Schema, SearchOptions, UntypedProperty, ValueFormatter,
};

use crate::message::{Message, Severity};
use crate::rule::{ValidationContext, ValidationRule};
use crate::synthesizer::ValidationSynthesizer;

/// Messages produced by one validation run, in rule order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    messages: Vec<Message>,
}

impl ValidationResult {
    /// Returns every message.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if no rule reported anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns `true` if no [`Severity::Error`] message was reported.
    ///
    /// Warnings and information do not make a container invalid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.messages.iter().any(Message::is_error)
    }

    /// Returns the [`Severity::Error`] messages.
    pub fn errors(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter().filter(|message| message.is_error())
    }

    /// Returns the messages at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Message> + '_ {
        self.messages
            .iter()
            .filter(move |message| message.severity() >= severity)
    }

    /// Returns the messages, consuming the result.
    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl IntoIterator for ValidationResult {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a Message;
    type IntoIter = core::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Validates containers against rule lists.
///
/// A validator is configuration only: the [`SearchOptions`] rules resolve
/// values with and the [`ValueFormatter`] used to render values in messages.
/// It is cheap to clone and can be shared between threads.
///
/// ```rust
/// use understory_schema::{Property, PropertyContainer, Schema};
/// use understory_validation::{ValidationSynthesizer, Validator};
///
/// let name = Property::<String>::builder("Name").nullable(false).build().unwrap();
/// let person = Schema::builder("Person").property(&name).build().unwrap();
///
/// let result = Validator::new().validate_schema(
///     &PropertyContainer::new(),
///     &person,
///     &ValidationSynthesizer::new(),
/// );
/// assert!(!result.is_valid());
/// assert_eq!(result.messages()[0].formatted(), "Name should not be null");
/// ```
#[derive(Clone)]
pub struct Validator {
    options: SearchOptions,
    formatter: Arc<dyn ValueFormatter>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Creates a validator with [`SearchOptions::DEFAULT`] and [`DefaultFormatter`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: SearchOptions::DEFAULT,
            formatter: Arc::new(DefaultFormatter),
        }
    }

    /// Sets the search options rules resolve values with.
    #[must_use]
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the formatter used for values in messages.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl ValueFormatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    /// Returns the search options.
    #[must_use]
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Runs `rules` in order against `container`.
    pub fn validate<I>(&self, container: &PropertyContainer, rules: I) -> ValidationResult
    where
        I: IntoIterator,
        I::Item: AsRef<dyn ValidationRule>,
    {
        let span = trace_span!("validate", values = container.len());
        let _guard = span.enter();

        let cx = ValidationContext::new(container, self.options, &*self.formatter);
        let mut messages = Vec::new();
        let mut count = 0_usize;
        for rule in rules {
            messages.extend(rule.as_ref().validate(&cx));
            count += 1;
        }
        trace!(rules = count, messages = messages.len(), "validated");
        ValidationResult { messages }
    }

    /// Runs a single rule against `container`.
    pub fn validate_rule(
        &self,
        container: &PropertyContainer,
        rule: &dyn ValidationRule,
    ) -> ValidationResult {
        let cx = ValidationContext::new(container, self.options, &*self.formatter);
        ValidationResult {
            messages: rule.validate(&cx),
        }
    }

    /// Runs the rules `synthesizer` derives for `property`.
    pub fn validate_property(
        &self,
        container: &PropertyContainer,
        property: &UntypedProperty,
        synthesizer: &ValidationSynthesizer,
    ) -> ValidationResult {
        self.validate(container, synthesizer.rules_for(property))
    }

    /// Runs the rules `synthesizer` derives for every property of `schema`.
    pub fn validate_schema(
        &self,
        container: &PropertyContainer,
        schema: &Schema,
        synthesizer: &ValidationSynthesizer,
    ) -> ValidationResult {
        self.validate(container, synthesizer.rules_for_schema(schema))
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
