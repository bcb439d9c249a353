// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Configuration mistakes surface as [`SchemaError`] when a property or
//! schema is built. Re-entrant calculations that read themselves surface as
//! [`ResolveError`]. Text that cannot be converted to a property value
//! surfaces as [`ParseError`].
//!
//! Resolution misses are not errors: they are `Ok(None)` from the resolver.

use thiserror::Error;

/// A configuration error raised while attaching metadata or building a schema.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A numeric interval was attached to a property whose type is not numeric.
    #[error("numeric interval on property '{property}' requires a numeric type, found {type_name}")]
    NonNumericInterval {
        /// The offending property.
        property: String,
        /// The declared type of the property.
        type_name: String,
    },
    /// A numeric interval has a `NaN` bound or contains no value.
    #[error("numeric interval on property '{property}' is invalid: {reason}")]
    InvalidInterval {
        /// The offending property.
        property: String,
        /// What is wrong with the bounds.
        reason: String,
    },
    /// A string length constraint was attached to a property that is not text.
    #[error("length constraint on property '{property}' requires a text type, found {type_name}")]
    NonTextLength {
        /// The offending property.
        property: String,
        /// The declared type of the property.
        type_name: String,
    },
    /// An allowed value does not match the declared type of the property.
    #[error("allowed value of type {found} on property '{property}' does not match {type_name}")]
    AllowedValueType {
        /// The offending property.
        property: String,
        /// The declared type of the property.
        type_name: String,
        /// The type of the rejected value.
        found: String,
    },
    /// A default value does not match the declared type of the property.
    #[error("default value of type {found} on property '{property}' does not match {type_name}")]
    DefaultValueType {
        /// The offending property.
        property: String,
        /// The declared type of the property.
        type_name: String,
        /// The type of the rejected value.
        found: String,
    },
    /// Two rules that must target one property target different ones.
    #[error("rules target different properties: '{first}' and '{second}'")]
    PropertyMismatch {
        /// Property of the first rule.
        first: String,
        /// Property of the second rule.
        second: String,
    },
    /// A schema declares two properties with the same name.
    #[error("schema '{schema}' declares property '{property}' more than once")]
    DuplicateProperty {
        /// The schema name.
        schema: String,
        /// The duplicated property name.
        property: String,
    },
}

/// An error raised while resolving a property value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A calculated property depends on itself.
    #[error("calculated property '{property}' depends on itself ({})", path.join(" -> "))]
    Cycle {
        /// The property whose calculation re-entered.
        property: String,
        /// The chain of calculated properties, outermost first, ending with `property`.
        path: Vec<String>,
    },
}

/// An error raised while converting text into a property value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text is not a valid value of the target type.
    #[error("'{input}' is not a valid {type_name}")]
    Invalid {
        /// The rejected text.
        input: String,
        /// The target type.
        type_name: String,
    },
    /// Null input for a type that does not accept it.
    #[error("null is not a valid {type_name}")]
    Null {
        /// The target type.
        type_name: String,
    },
    /// The text names no variant of the target enum.
    #[error("'{input}' is not a variant of {type_name}; expected one of: {}", expected.join(", "))]
    UnknownVariant {
        /// The rejected text.
        input: String,
        /// The target enum type.
        type_name: String,
        /// The accepted variant names.
        expected: Vec<String>,
    },
    /// The parser chosen for a property produces values of another type.
    #[error("parser for property '{property}' produces {found}, expected {expected}")]
    TypeMismatch {
        /// The property being parsed.
        property: String,
        /// The declared type of the property.
        expected: String,
        /// The type the parser produces.
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_property_and_type() {
        let err = SchemaError::NonNumericInterval {
            property: "Name".into(),
            type_name: "String".into(),
        };
        let text = err.to_string();
        assert!(text.contains("'Name'"));
        assert!(text.contains("String"));
    }

    #[test]
    fn cycle_error_lists_path() {
        let err = ResolveError::Cycle {
            property: "A".into(),
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(
            err.to_string(),
            "calculated property 'A' depends on itself (A -> B -> A)"
        );
    }

    #[test]
    fn unknown_variant_lists_expected() {
        let err = ParseError::UnknownVariant {
            input: "Blue".into(),
            type_name: "Color".into(),
            expected: vec!["Red".into(), "Green".into()],
        };
        assert_eq!(
            err.to_string(),
            "'Blue' is not a variant of Color; expected one of: Red, Green"
        );
    }

    #[test]
    fn type_mismatch_names_both_types() {
        let err = ParseError::TypeMismatch {
            property: "age".into(),
            expected: "String".into(),
            found: "i32".into(),
        };
        assert_eq!(
            err.to_string(),
            "parser for property 'age' produces i32, expected String"
        );
    }
}
