// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostic messages with named-argument templates.

use std::borrow::Cow;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Names of the arguments the built-in rules attach to their messages.
pub mod arg {
    /// Name of the validated property.
    pub const PROPERTY_NAME: &str = "propertyName";
    /// The offending value, formatted.
    pub const VALUE: &str = "value";
    /// Length of the offending text value.
    pub const LENGTH: &str = "length";
    /// Lower length bound.
    pub const MIN_LENGTH: &str = "minLength";
    /// Upper length bound.
    pub const MAX_LENGTH: &str = "maxLength";
    /// Allowed values, formatted and comma separated.
    pub const ALLOWED_VALUES: &str = "allowedValues";
    /// Interval in bracket notation, e.g. `[0, 10)`.
    pub const RANGE: &str = "range";
    /// Formatted messages of the first side of a combination.
    pub const FIRST: &str = "first";
    /// Formatted messages of the last side of a combination.
    pub const LAST: &str = "last";
    /// Resolution failure text.
    pub const ERROR: &str = "error";
}

/// Inline capacity for message arguments; built-in rules use at most four.
const ARGS_INLINE: usize = 4;

/// How serious a [`Message`] is.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    /// Informational note.
    Information,
    /// Suspicious but acceptable.
    Warning,
    /// The value is invalid.
    #[default]
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Information => "information",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A validation diagnostic.
///
/// The text is a template whose `{name}` placeholders are filled from named
/// arguments when the message is [formatted](Self::formatted). Placeholders
/// without a matching argument are left as written.
///
/// ```rust
/// use understory_validation::{Message, Severity};
///
/// let message = Message::error("{propertyName} should be over 18! but was {value}")
///     .with_arg("propertyName", "Age")
///     .with_arg("value", "9");
/// assert_eq!(message.severity(), Severity::Error);
/// assert_eq!(message.formatted(), "Age should be over 18! but was 9");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    severity: Severity,
    template: Cow<'static, str>,
    args: SmallVec<[(Cow<'static, str>, String); ARGS_INLINE]>,
    property: Option<String>,
}

impl Message {
    /// Creates a message without arguments.
    pub fn new(severity: Severity, template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            severity,
            template: template.into(),
            args: SmallVec::new(),
            property: None,
        }
    }

    /// Creates a [`Severity::Error`] message.
    pub fn error(template: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Severity::Error, template)
    }

    /// Creates a [`Severity::Warning`] message.
    pub fn warning(template: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Severity::Warning, template)
    }

    /// Creates a [`Severity::Information`] message.
    pub fn information(template: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Severity::Information, template)
    }

    /// Sets an argument, replacing an earlier one with the same name.
    #[must_use]
    pub fn with_arg(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let value = value.into();
        match self.args.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.args.push((name, value)),
        }
        self
    }

    /// Records the property the message is about and sets the
    /// [`propertyName`](arg::PROPERTY_NAME) argument.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.property = Some(name.clone());
        self.with_arg(arg::PROPERTY_NAME, name)
    }

    /// Replaces the template, keeping the arguments.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<Cow<'static, str>>) -> Self {
        self.template = template.into();
        self
    }

    /// Replaces the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Returns the severity.
    #[must_use]
    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the unformatted template.
    #[must_use]
    #[inline]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the property the message is about, if recorded.
    #[must_use]
    #[inline]
    pub fn property_name(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Returns the value of argument `name`.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the arguments in the order they were first set.
    pub fn args(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.args
            .iter()
            .map(|(key, value)| (&**key, value.as_str()))
    }

    /// Returns `true` for [`Severity::Error`].
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Fills the template placeholders from the arguments.
    #[must_use]
    pub fn formatted(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest: &str = &self.template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let name = &after[..close];
            match self.arg(name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}
