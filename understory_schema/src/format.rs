// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering values as text for diagnostics.

use crate::value::ErasedValue;
use crate::value_type::ValueType;

/// Renders a value of a known type as text.
///
/// Closures of the right shape are formatters too:
///
/// ```rust
/// use understory_schema::{ErasedValue, PropertyType, ValueFormatter};
///
/// let quoted = |value: &ErasedValue, ty: &understory_schema::ValueType| {
///     format!("\"{}\"", ty.format(value))
/// };
/// let text = quoted.format_value(&ErasedValue::new(3_i32), &i32::value_type());
/// assert_eq!(text, "\"3\"");
/// ```
pub trait ValueFormatter: Send + Sync {
    /// Formats `value`, which is of type `value_type`.
    fn format_value(&self, value: &ErasedValue, value_type: &ValueType) -> String;
}

/// Formats through [`ValueType::format`].
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultFormatter;

impl ValueFormatter for DefaultFormatter {
    fn format_value(&self, value: &ErasedValue, value_type: &ValueType) -> String {
        value_type.format(value)
    }
}

impl<F> ValueFormatter for F
where
    F: Fn(&ErasedValue, &ValueType) -> String + Send + Sync,
{
    fn format_value(&self, value: &ErasedValue, value_type: &ValueType) -> String {
        self(value, value_type)
    }
}
