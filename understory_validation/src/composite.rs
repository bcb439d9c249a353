// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! AND / OR combination of two rules.

use understory_schema::{PropertyComparer, SchemaError, UntypedProperty};

use crate::message::{Message, Severity, arg};
use crate::rule::{SharedRule, ValidationContext, ValidationRule};

/// Runs two rules on one property and reports the messages of both, in order.
///
/// With `break_on_first_error`, evaluation stops at the first message from
/// either side and only that message is reported.
#[derive(Clone, Debug)]
pub struct And {
    first: SharedRule,
    last: SharedRule,
    break_on_first_error: bool,
}

impl And {
    /// Combines two rules.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::PropertyMismatch`] unless both rules validate the
    /// same property.
    pub fn new(
        first: SharedRule,
        last: SharedRule,
        break_on_first_error: bool,
    ) -> Result<Self, SchemaError> {
        if !PropertyComparer::ByReference.eq(first.property(), last.property()) {
            return Err(SchemaError::PropertyMismatch {
                first: first.property().name().to_owned(),
                second: last.property().name().to_owned(),
            });
        }
        Ok(Self {
            first,
            last,
            break_on_first_error,
        })
    }

    /// Returns the rule evaluated first.
    #[must_use]
    pub fn first(&self) -> &SharedRule {
        &self.first
    }

    /// Returns the rule evaluated last.
    #[must_use]
    pub fn last(&self) -> &SharedRule {
        &self.last
    }

    /// Returns `true` if evaluation stops at the first message.
    #[must_use]
    pub fn break_on_first_error(&self) -> bool {
        self.break_on_first_error
    }
}

impl ValidationRule for And {
    fn property(&self) -> &UntypedProperty {
        self.first.property()
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        let mut messages = self.first.validate(cx);
        if self.break_on_first_error && !messages.is_empty() {
            messages.truncate(1);
            return messages;
        }
        let mut rest = self.last.validate(cx);
        if self.break_on_first_error {
            rest.truncate(1);
        }
        messages.append(&mut rest);
        messages
    }
}

/// Passes when at least one of two rules passes.
///
/// Both rules are always evaluated. When both fail, a single message
/// `[first messages] or [last messages]` is reported, at the highest severity
/// of the combined messages. The rules may validate different properties; the
/// combination reports against the first one.
#[derive(Clone, Debug)]
pub struct Or {
    first: SharedRule,
    last: SharedRule,
}

impl Or {
    /// Combines two rules.
    #[must_use]
    pub fn new(first: SharedRule, last: SharedRule) -> Self {
        Self { first, last }
    }

    /// Returns the first alternative.
    #[must_use]
    pub fn first(&self) -> &SharedRule {
        &self.first
    }

    /// Returns the last alternative.
    #[must_use]
    pub fn last(&self) -> &SharedRule {
        &self.last
    }
}

fn joined(messages: &[Message]) -> String {
    messages
        .iter()
        .map(Message::formatted)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationRule for Or {
    fn property(&self) -> &UntypedProperty {
        self.first.property()
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        let first = self.first.validate(cx);
        let last = self.last.validate(cx);
        if first.is_empty() || last.is_empty() {
            return Vec::new();
        }
        let severity = first
            .iter()
            .chain(&last)
            .map(Message::severity)
            .max()
            .unwrap_or(Severity::Error);
        vec![
            Message::new(severity, "[{first}] or [{last}]")
                .with_property(self.property().name())
                .with_arg(arg::FIRST, joined(&first))
                .with_arg(arg::LAST, joined(&last)),
        ]
    }
}
