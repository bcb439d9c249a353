// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative constraint metadata.
//!
//! These metadata kinds describe what a valid value looks like. They carry no
//! behavior of their own; the validation layer turns them into rules.

use crate::error::SchemaError;
use crate::metadata::Metadata;
use crate::value::ErasedValue;
use crate::value_type::ValueType;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a property accepts a missing or null value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Nullability {
    /// `true` if null is acceptable.
    pub allow_null: bool,
}

impl Nullability {
    /// A value is required.
    pub const REQUIRED: Self = Self { allow_null: false };
    /// Null is acceptable.
    pub const OPTIONAL: Self = Self { allow_null: true };
}

impl Metadata for Nullability {}

/// Minimum and maximum length, in chars, of a text property.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StringLength {
    min: Option<usize>,
    max: Option<usize>,
}

impl StringLength {
    /// No bounds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// Both bounds, inclusive.
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Sets the inclusive minimum.
    #[must_use]
    pub const fn with_min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the inclusive maximum.
    #[must_use]
    pub const fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Returns the inclusive minimum.
    #[must_use]
    pub const fn min_length(&self) -> Option<usize> {
        self.min
    }

    /// Returns the inclusive maximum.
    #[must_use]
    pub const fn max_length(&self) -> Option<usize> {
        self.max
    }

    /// Returns `true` if `len` satisfies both bounds.
    #[must_use]
    pub fn contains(&self, len: usize) -> bool {
        self.min.is_none_or(|min| len >= min) && self.max.is_none_or(|max| len <= max)
    }
}

impl Metadata for StringLength {
    fn check(&self, property: &str, value_type: &ValueType) -> Result<(), SchemaError> {
        if value_type.is_textual() {
            Ok(())
        } else {
            Err(SchemaError::NonTextLength {
                property: property.to_owned(),
                type_name: value_type.short_name(),
            })
        }
    }
}

/// The closed set of values a property accepts.
#[derive(Clone, Debug, Default)]
pub struct AllowedValues(Vec<ErasedValue>);

impl AllowedValues {
    /// Creates the set from typed values.
    pub fn new<T: Clone + Send + Sync + 'static>(values: impl IntoIterator<Item = T>) -> Self {
        Self(values.into_iter().map(ErasedValue::new).collect())
    }

    /// Creates the set from erased values.
    #[must_use]
    pub fn from_erased(values: Vec<ErasedValue>) -> Self {
        Self(values)
    }

    /// Returns the allowed values in declaration order.
    #[must_use]
    pub fn values(&self) -> &[ErasedValue] {
        &self.0
    }

    /// Returns `true` if `value` equals one of the allowed values.
    #[must_use]
    pub fn contains(&self, value: &ErasedValue, value_type: &ValueType) -> bool {
        self.0
            .iter()
            .any(|allowed| value_type.values_equal(allowed, value))
    }
}

impl Metadata for AllowedValues {
    fn check(&self, property: &str, value_type: &ValueType) -> Result<(), SchemaError> {
        match self.0.iter().find(|v| v.type_id() != value_type.type_id()) {
            None => Ok(()),
            Some(value) => Err(SchemaError::AllowedValueType {
                property: property.to_owned(),
                type_name: value_type.short_name(),
                found: value.type_name().to_owned(),
            }),
        }
    }
}

/// A numeric interval; each bound is independently inclusive or exclusive.
///
/// Attaching an interval to a property whose type is not numeric is rejected
/// when the property is built, as is an interval with a `NaN` bound or one
/// that contains no value (`min > max`, or `min == max` with an exclusive
/// bound).
///
/// Values are compared as `f64`. Integers of more than 53 significant bits
/// (large `i64`, `u64`, `i128`, `u128`) are rounded first, so they may be
/// misjudged right at a bound.
///
/// ```rust
/// use understory_schema::NumericInterval;
///
/// let interval = NumericInterval::new().min(0.0).max_exclusive(10.0);
/// assert!(interval.contains(0.0));
/// assert!(interval.contains(9.999));
/// assert!(!interval.contains(10.0));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NumericInterval {
    /// Lower bound.
    pub minimum: Option<f64>,
    /// `true` if the lower bound itself is excluded.
    pub exclusive_minimum: bool,
    /// Upper bound.
    pub maximum: Option<f64>,
    /// `true` if the upper bound itself is excluded.
    pub exclusive_maximum: bool,
}

impl NumericInterval {
    /// An unbounded interval.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            minimum: None,
            exclusive_minimum: false,
            maximum: None,
            exclusive_maximum: false,
        }
    }

    /// Sets an inclusive lower bound.
    #[must_use]
    pub const fn min(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self.exclusive_minimum = false;
        self
    }

    /// Sets an exclusive lower bound.
    #[must_use]
    pub const fn min_exclusive(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self.exclusive_minimum = true;
        self
    }

    /// Sets an inclusive upper bound.
    #[must_use]
    pub const fn max(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self.exclusive_maximum = false;
        self
    }

    /// Sets an exclusive upper bound.
    #[must_use]
    pub const fn max_exclusive(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self.exclusive_maximum = true;
        self
    }

    /// Returns `true` if `value` lies within the interval.
    ///
    /// `NaN` is never contained in a bounded interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        let above = match self.minimum {
            None => true,
            Some(min) if self.exclusive_minimum => value > min,
            Some(min) => value >= min,
        };
        let below = match self.maximum {
            None => true,
            Some(max) if self.exclusive_maximum => value < max,
            Some(max) => value <= max,
        };
        above && below
    }

    /// Returns why the bounds admit no value, if they do not.
    fn defect(&self) -> Option<String> {
        if self.minimum.is_some_and(f64::is_nan) || self.maximum.is_some_and(f64::is_nan) {
            return Some(String::from("bound is NaN"));
        }
        let (Some(min), Some(max)) = (self.minimum, self.maximum) else {
            return None;
        };
        if min > max {
            Some(format!("minimum {min} is greater than maximum {max}"))
        } else if min == max && (self.exclusive_minimum || self.exclusive_maximum) {
            Some(format!("exclusive bound at {min} leaves the interval empty"))
        } else {
            None
        }
    }
}

impl Metadata for NumericInterval {
    fn check(&self, property: &str, value_type: &ValueType) -> Result<(), SchemaError> {
        if !value_type.is_numeric() {
            return Err(SchemaError::NonNumericInterval {
                property: property.to_owned(),
                type_name: value_type.short_name(),
            });
        }
        match self.defect() {
            Some(reason) => Err(SchemaError::InvalidInterval {
                property: property.to_owned(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PropertyType;

    #[test]
    fn half_open_interval_boundaries() {
        let interval = NumericInterval::new().min(0.0).max_exclusive(10.0);
        assert!(interval.contains(0.0));
        assert!(interval.contains(9.999));
        assert!(!interval.contains(10.0));
        assert!(!interval.contains(-0.001));
    }

    #[test]
    fn exclusive_minimum() {
        let interval = NumericInterval::new().min_exclusive(0.0);
        assert!(!interval.contains(0.0));
        assert!(interval.contains(0.5));
        assert!(interval.contains(f64::MAX));
        assert!(!interval.contains(f64::NAN));
    }

    #[test]
    fn interval_rejects_non_numeric_type() {
        let interval = NumericInterval::new().max(1.0);
        assert!(interval.check("Count", &u8::value_type()).is_ok());
        assert!(interval.check("Count", &Option::<f32>::value_type()).is_ok());
        let err = interval.check("Name", &String::value_type()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::NonNumericInterval {
                property: "Name".into(),
                type_name: "String".into(),
            }
        );
    }

    #[test]
    fn interval_rejects_nan_and_empty_bounds() {
        let ty = f64::value_type();
        let invalid = |interval: NumericInterval| {
            matches!(
                interval.check("Score", &ty),
                Err(SchemaError::InvalidInterval { .. })
            )
        };
        assert!(invalid(NumericInterval::new().min(f64::NAN)));
        assert!(invalid(NumericInterval::new().max_exclusive(f64::NAN)));
        assert!(invalid(NumericInterval::new().min(5.0).max(1.0)));
        assert!(invalid(NumericInterval::new().min(5.0).max_exclusive(5.0)));
        assert!(NumericInterval::new().min(5.0).max(5.0).check("Score", &ty).is_ok());
        assert!(NumericInterval::new().min(f64::NEG_INFINITY).check("Score", &ty).is_ok());

        let err = NumericInterval::new().min(3.0).max(2.0).check("Score", &ty).unwrap_err();
        assert_eq!(
            err.to_string(),
            "numeric interval on property 'Score' is invalid: minimum 3 is greater than maximum 2"
        );
    }

    #[test]
    fn string_length_bounds() {
        let length = StringLength::between(2, 4);
        assert!(!length.contains(1));
        assert!(length.contains(2));
        assert!(length.contains(4));
        assert!(!length.contains(5));
        assert!(StringLength::new().with_min(1).contains(100));
        assert!(length.check("Age", &i32::value_type()).is_err());
        assert!(length.check("Name", &Option::<String>::value_type()).is_ok());
    }

    #[test]
    fn allowed_values_type_check_and_contains() {
        let allowed = AllowedValues::new([1_i32, 2, 3]);
        let ty = i32::value_type();
        assert!(allowed.check("N", &ty).is_ok());
        assert!(allowed.contains(&ErasedValue::new(2_i32), &ty));
        assert!(!allowed.contains(&ErasedValue::new(4_i32), &ty));
        assert!(allowed.check("N", &i64::value_type()).is_err());
    }
}
