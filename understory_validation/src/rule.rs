// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The validation rule contract and its combinators.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use understory_schema::{
    ErasedValue, PropertyContainer, PropertyValue, Resolver, SchemaError, SearchOptions,
    UntypedProperty, ValueFormatter, ValueType,
};

use crate::composite::{And, Or};
use crate::message::{Message, Severity, arg};

/// A validation rule shared between rule lists, schemas and combinators.
pub type SharedRule = Arc<dyn ValidationRule>;

/// What a rule sees while validating one container.
///
/// Values are resolved with the validator's [`SearchOptions`], so a rule
/// sees parent, calculated and default values exactly as a reader would.
pub struct ValidationContext<'a> {
    resolver: Resolver<'a>,
    formatter: &'a dyn ValueFormatter,
}

impl<'a> ValidationContext<'a> {
    /// Creates a context over `container`.
    pub fn new(
        container: &'a PropertyContainer,
        options: SearchOptions,
        formatter: &'a dyn ValueFormatter,
    ) -> Self {
        Self {
            resolver: Resolver::new(container, options),
            formatter,
        }
    }

    /// Returns the container under validation.
    #[must_use]
    #[inline]
    pub fn container(&self) -> &'a PropertyContainer {
        self.resolver.container()
    }

    /// Returns the resolver used for value lookup.
    #[must_use]
    #[inline]
    pub fn resolver(&self) -> &Resolver<'a> {
        &self.resolver
    }

    /// Resolves `property`.
    ///
    /// A miss is reported as a [`Provenance::NotDefined`] value so rules can
    /// treat "absent" uniformly whatever the search options.
    ///
    /// # Errors
    ///
    /// A resolution failure is turned into an error [`Message`] about the
    /// property, ready to be reported.
    ///
    /// [`Provenance::NotDefined`]: understory_schema::Provenance::NotDefined
    pub fn value(&self, property: &UntypedProperty) -> Result<PropertyValue, Message> {
        match self.resolver.resolve(property) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(PropertyValue::not_defined(property.clone())),
            Err(err) => Err(Message::error("{propertyName} could not be resolved: {error}")
                .with_property(property.name())
                .with_arg(arg::ERROR, err.to_string())),
        }
    }

    /// Formats a value for a message.
    #[must_use]
    pub fn format(&self, value: &ErasedValue, value_type: &ValueType) -> String {
        self.formatter.format_value(value, value_type)
    }
}

impl fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// A check over one property of a container.
///
/// Rules never fail: a violation is one or more [`Message`]s, and a valid
/// value yields none.
pub trait ValidationRule: fmt::Debug + Send + Sync {
    /// Returns the property this rule validates.
    fn property(&self) -> &UntypedProperty;

    /// Validates the container behind `cx`.
    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message>;
}

impl<R: ValidationRule + ?Sized> ValidationRule for Arc<R> {
    fn property(&self) -> &UntypedProperty {
        (**self).property()
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        (**self).validate(cx)
    }
}

/// Combinators available on every rule.
pub trait RuleExt: ValidationRule + Sized + 'static {
    /// Runs `self`, then `last`, reporting the messages of both.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::PropertyMismatch`] if the two rules validate
    /// different properties.
    fn and<R: ValidationRule + 'static>(self, last: R) -> Result<And, SchemaError> {
        And::new(self.shared(), last.shared(), false)
    }

    /// Like [`and`](Self::and), but stops at the first message from either side.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::PropertyMismatch`] if the two rules validate
    /// different properties.
    fn and_break<R: ValidationRule + 'static>(self, last: R) -> Result<And, SchemaError> {
        And::new(self.shared(), last.shared(), true)
    }

    /// Passes when either rule passes; the rules may target different properties.
    fn or<R: ValidationRule + 'static>(self, last: R) -> Or {
        Or::new(self.shared(), last.shared())
    }

    /// Replaces the template of every message the rule produces.
    ///
    /// The rule's arguments (`{propertyName}`, `{value}`, ...) stay available.
    fn with_message(self, template: impl Into<Cow<'static, str>>) -> Customized {
        Customized::new(self.shared()).with_message(template)
    }

    /// Replaces the severity of every message the rule produces.
    fn with_severity(self, severity: Severity) -> Customized {
        Customized::new(self.shared()).with_severity(severity)
    }

    /// Moves the rule behind a [`SharedRule`].
    fn shared(self) -> SharedRule {
        Arc::new(self)
    }
}

impl<R: ValidationRule + 'static> RuleExt for R {}

/// A rule whose messages get a different template or severity.
#[derive(Clone, Debug)]
pub struct Customized {
    inner: SharedRule,
    template: Option<Cow<'static, str>>,
    severity: Option<Severity>,
}

impl Customized {
    /// Wraps `inner` without changing anything yet.
    #[must_use]
    pub fn new(inner: SharedRule) -> Self {
        Self {
            inner,
            template: None,
            severity: None,
        }
    }

    /// Sets the replacement template.
    #[must_use]
    pub fn with_message(mut self, template: impl Into<Cow<'static, str>>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Sets the replacement severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Returns the wrapped rule.
    #[must_use]
    pub fn inner(&self) -> &SharedRule {
        &self.inner
    }
}

impl ValidationRule for Customized {
    fn property(&self) -> &UntypedProperty {
        self.inner.property()
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        self.inner
            .validate(cx)
            .into_iter()
            .map(|mut message| {
                if let Some(template) = &self.template {
                    message = message.with_template(template.clone());
                }
                if let Some(severity) = self.severity {
                    message = message.with_severity(severity);
                }
                message
            })
            .collect()
    }
}
