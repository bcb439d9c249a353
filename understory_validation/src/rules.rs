// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in rules, one per constraint kind, plus predicates.
//!
//! Except for [`NotNull`] and [`NotDefault`], rules only look at values that
//! are present: an absent or null value is the business of those two.

use std::fmt;
use std::sync::Arc;

use understory_schema::{
    AllowedValues, Metadata, NumericInterval, Property, PropertyType, PropertyValue, SchemaError,
    StringLength, UntypedProperty,
};

use crate::message::{Message, arg};
use crate::rule::{ValidationContext, ValidationRule};

/// Resolves `property`, or returns early with the resolution failure message.
macro_rules! value_or_report {
    ($cx:expr, $property:expr) => {
        match $cx.value($property) {
            Ok(value) => value,
            Err(message) => return vec![message],
        }
    };
}

/// Returns `true` if the value is present and not null.
fn is_present(value: &PropertyValue) -> bool {
    value.has_value() && !value.property().value_type().is_null(value.value())
}

fn formatted(cx: &ValidationContext<'_>, value: &PropertyValue) -> String {
    cx.format(value.value(), &value.property().value_type())
}

/// The value must be present and not null.
#[derive(Clone, Debug)]
pub struct NotNull {
    property: UntypedProperty,
}

impl NotNull {
    /// Creates the rule.
    pub fn new(property: impl AsRef<UntypedProperty>) -> Self {
        Self {
            property: property.as_ref().clone(),
        }
    }
}

impl ValidationRule for NotNull {
    fn property(&self) -> &UntypedProperty {
        &self.property
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        let value = value_or_report!(cx, &self.property);
        if is_present(&value) {
            return Vec::new();
        }
        vec![
            Message::error("{propertyName} should not be null")
                .with_property(self.property.name()),
        ]
    }
}

/// The value must be present and differ from the type's zero value.
#[derive(Clone, Debug)]
pub struct NotDefault {
    property: UntypedProperty,
}

impl NotDefault {
    /// Creates the rule.
    pub fn new(property: impl AsRef<UntypedProperty>) -> Self {
        Self {
            property: property.as_ref().clone(),
        }
    }
}

impl ValidationRule for NotDefault {
    fn property(&self) -> &UntypedProperty {
        &self.property
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        let value = value_or_report!(cx, &self.property);
        let value_type = self.property.value_type();
        if value.has_value() && !value_type.is_zero(value.value()) {
            return Vec::new();
        }
        vec![
            Message::error("{propertyName} should not have default value {value}")
                .with_property(self.property.name())
                .with_arg(arg::VALUE, formatted(cx, &value)),
        ]
    }
}

/// A predicate over a present value.
pub struct Predicate<T> {
    property: Property<T>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: PropertyType> Predicate<T> {
    /// Creates the rule.
    pub fn new<F>(property: &Property<T>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            property: property.clone(),
            predicate: Arc::new(predicate),
        }
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("property", &self.property)
            .finish_non_exhaustive()
    }
}

impl<T: PropertyType> ValidationRule for Predicate<T> {
    fn property(&self) -> &UntypedProperty {
        self.property.untyped()
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        let value = value_or_report!(cx, self.property.untyped());
        if !value.has_value() {
            return Vec::new();
        }
        match value.downcast_ref::<T>() {
            Some(typed) if !(self.predicate)(typed) => vec![
                Message::error("{value} is not valid for {propertyName}")
                    .with_property(self.property.name())
                    .with_arg(arg::VALUE, formatted(cx, &value)),
            ],
            _ => Vec::new(),
        }
    }
}

/// Text length must fall within a [`StringLength`].
#[derive(Clone, Debug)]
pub struct LengthRule {
    property: UntypedProperty,
    length: StringLength,
}

impl LengthRule {
    /// Creates the rule.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NonTextLength`] unless the property is textual.
    pub fn new(
        property: impl AsRef<UntypedProperty>,
        length: StringLength,
    ) -> Result<Self, SchemaError> {
        let property = property.as_ref();
        length.check(property.name(), &property.value_type())?;
        Ok(Self {
            property: property.clone(),
            length,
        })
    }

    /// Returns the bounds.
    #[must_use]
    pub fn length(&self) -> StringLength {
        self.length
    }
}

impl ValidationRule for LengthRule {
    fn property(&self) -> &UntypedProperty {
        &self.property
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        let value = value_or_report!(cx, &self.property);
        if !is_present(&value) {
            return Vec::new();
        }
        let Some(len) = self.property.value_type().text_len(value.value()) else {
            return Vec::new();
        };
        if self.length.contains(len) {
            return Vec::new();
        }
        let (min, max) = (self.length.min_length(), self.length.max_length());
        let template = match (min, max) {
            (Some(_), Some(_)) => concat!(
                "{propertyName} length should be between {minLength} and {maxLength}",
                " but was {length}",
            ),
            (Some(_), None) => {
                "{propertyName} length should be at least {minLength} but was {length}"
            }
            _ => "{propertyName} length should be at most {maxLength} but was {length}",
        };
        let mut message = Message::error(template)
            .with_property(self.property.name())
            .with_arg(arg::LENGTH, len.to_string())
            .with_arg(arg::VALUE, formatted(cx, &value));
        if let Some(min) = min {
            message = message.with_arg(arg::MIN_LENGTH, min.to_string());
        }
        if let Some(max) = max {
            message = message.with_arg(arg::MAX_LENGTH, max.to_string());
        }
        vec![message]
    }
}

/// The value must be one of an [`AllowedValues`] list.
#[derive(Clone, Debug)]
pub struct AllowedValuesRule {
    property: UntypedProperty,
    values: AllowedValues,
}

impl AllowedValuesRule {
    /// Creates the rule.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::AllowedValueType`] if a value is not of the
    /// property's type.
    pub fn new(
        property: impl AsRef<UntypedProperty>,
        values: AllowedValues,
    ) -> Result<Self, SchemaError> {
        let property = property.as_ref();
        values.check(property.name(), &property.value_type())?;
        Ok(Self {
            property: property.clone(),
            values,
        })
    }

    /// Returns the allowed values.
    #[must_use]
    pub fn values(&self) -> &AllowedValues {
        &self.values
    }
}

impl ValidationRule for AllowedValuesRule {
    fn property(&self) -> &UntypedProperty {
        &self.property
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        let value = value_or_report!(cx, &self.property);
        let value_type = self.property.value_type();
        if !value.has_value() || self.values.contains(value.value(), &value_type) {
            return Vec::new();
        }
        let allowed = self
            .values
            .values()
            .iter()
            .map(|allowed| cx.format(allowed, &value_type))
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            Message::error("{propertyName} should be one of [{allowedValues}] but was {value}")
                .with_property(self.property.name())
                .with_arg(arg::ALLOWED_VALUES, allowed)
                .with_arg(arg::VALUE, formatted(cx, &value)),
        ]
    }
}

/// A numeric value must fall within a [`NumericInterval`].
///
/// The value is projected to `f64` before the comparison. Integers beyond
/// 2^53 in magnitude lose precision in that projection, so a 64- or 128-bit
/// value within a few units of a bound may be judged on the wrong side.
#[derive(Clone, Debug)]
pub struct RangeRule {
    property: UntypedProperty,
    interval: NumericInterval,
}

impl RangeRule {
    /// Creates the rule.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NonNumericInterval`] unless the property is numeric,
    /// and [`SchemaError::InvalidInterval`] for a `NaN` bound or an empty interval.
    pub fn new(
        property: impl AsRef<UntypedProperty>,
        interval: NumericInterval,
    ) -> Result<Self, SchemaError> {
        let property = property.as_ref();
        interval.check(property.name(), &property.value_type())?;
        Ok(Self {
            property: property.clone(),
            interval,
        })
    }

    /// Returns the interval.
    #[must_use]
    pub fn interval(&self) -> NumericInterval {
        self.interval
    }
}

/// Renders an interval in bracket notation, e.g. `[0, 10)`.
fn bracketed(interval: &NumericInterval) -> String {
    let lower = match interval.minimum {
        Some(min) if interval.exclusive_minimum => format!("({min}"),
        Some(min) => format!("[{min}"),
        None => String::from("(-inf"),
    };
    let upper = match interval.maximum {
        Some(max) if interval.exclusive_maximum => format!("{max})"),
        Some(max) => format!("{max}]"),
        None => String::from("inf)"),
    };
    format!("{lower}, {upper}")
}

impl ValidationRule for RangeRule {
    fn property(&self) -> &UntypedProperty {
        &self.property
    }

    fn validate(&self, cx: &ValidationContext<'_>) -> Vec<Message> {
        let value = value_or_report!(cx, &self.property);
        if !value.has_value() {
            return Vec::new();
        }
        match self.property.value_type().to_f64(value.value()) {
            Some(number) if !self.interval.contains(number) => vec![
                Message::error("{propertyName} should be in range {range} but was {value}")
                    .with_property(self.property.name())
                    .with_arg(arg::RANGE, bracketed(&self.interval))
                    .with_arg(arg::VALUE, formatted(cx, &value)),
            ],
            _ => Vec::new(),
        }
    }
}

/// Fluent rule constructors on typed properties.
///
/// ```rust
/// use understory_schema::{Property, PropertyContainer};
/// use understory_validation::{PropertyRules, RuleExt, Validator};
///
/// let age = Property::<i32>::new("Age");
/// let rule = age
///     .not_default()
///     .and(
///         age.should_be(|a| *a > 18)
///             .with_message("{propertyName} should be over 18! but was {value}"),
///     )
///     .unwrap();
///
/// let record = PropertyContainer::builder().set(&age, 9).build();
/// let result = Validator::new().validate_rule(&record, &rule);
/// assert_eq!(result.messages()[0].formatted(), "Age should be over 18! but was 9");
/// ```
pub trait PropertyRules<T: PropertyType> {
    /// See [`NotNull`].
    fn not_null(&self) -> NotNull;

    /// See [`NotDefault`].
    fn not_default(&self) -> NotDefault;

    /// See [`Predicate`].
    fn should_be<F>(&self, predicate: F) -> Predicate<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static;

    /// See [`LengthRule`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NonTextLength`] unless `T` is textual.
    fn length(&self, length: StringLength) -> Result<LengthRule, SchemaError>;

    /// See [`AllowedValuesRule`].
    ///
    /// # Errors
    ///
    /// Never fails for typed values; the signature matches the other
    /// constraint constructors.
    fn allowed_values<I>(&self, values: I) -> Result<AllowedValuesRule, SchemaError>
    where
        I: IntoIterator<Item = T>;

    /// See [`RangeRule`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NonNumericInterval`] unless `T` is numeric, and
    /// [`SchemaError::InvalidInterval`] for bounds that admit no value.
    fn interval(&self, interval: NumericInterval) -> Result<RangeRule, SchemaError>;
}

impl<T: PropertyType> PropertyRules<T> for Property<T> {
    fn not_null(&self) -> NotNull {
        NotNull::new(self)
    }

    fn not_default(&self) -> NotDefault {
        NotDefault::new(self)
    }

    fn should_be<F>(&self, predicate: F) -> Predicate<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Predicate::new(self, predicate)
    }

    fn length(&self, length: StringLength) -> Result<LengthRule, SchemaError> {
        LengthRule::new(self, length)
    }

    fn allowed_values<I>(&self, values: I) -> Result<AllowedValuesRule, SchemaError>
    where
        I: IntoIterator<Item = T>,
    {
        AllowedValuesRule::new(self, AllowedValues::new(values))
    }

    fn interval(&self, interval: NumericInterval) -> Result<RangeRule, SchemaError> {
        RangeRule::new(self, interval)
    }
}
