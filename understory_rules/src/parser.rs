// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text-to-value parsers.
//!
//! Parsers are the standard handler type for a [`RuleProvider`]: the
//! [`ParserFallbacks`] synthesize enum, nullable and collection parsers, and
//! [`standard_rules`] covers the primitives and `String`.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use tracing::trace;
use understory_schema::{
    CollectionKind, EnumKind, ErasedValue, NullableKind, ParseError, PropertyType,
    PropertyValue, Provenance, UntypedProperty, ValueKind, ValueType, eq_ignore_case,
};

use crate::fallback::Fallbacks;
use crate::provider::{CollectionFormat, RuleProvider, RuleResolver};
use crate::rule::Rule;

/// Converts optional text into a value of a fixed type.
///
/// `None` is null input; how it is treated depends on the parser.
pub trait ValueParser: fmt::Debug + Send + Sync {
    /// Returns the type of the values this parser produces.
    fn value_type(&self) -> ValueType;

    /// Parses `input`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing why the input was rejected.
    fn parse(&self, input: Option<&str>) -> Result<ErasedValue, ParseError>;
}

/// A [`RuleProvider`] of parsers with parser synthesis enabled.
pub type ParserProvider = RuleProvider<dyn ValueParser, ParserFallbacks>;

fn is_null(input: Option<&str>) -> bool {
    input.is_none_or(|text| {
        let text = text.trim();
        text.is_empty() || eq_ignore_case(text, "null")
    })
}

fn invalid(input: &str, value_type: ValueType) -> ParseError {
    ParseError::Invalid {
        input: input.to_owned(),
        type_name: value_type.short_name(),
    }
}

fn null(value_type: ValueType) -> ParseError {
    ParseError::Null {
        type_name: value_type.short_name(),
    }
}

/// Parses through [`FromStr`].
///
/// The input is used verbatim; null input is rejected.
pub struct FromStrParser<T>(PhantomData<fn() -> T>);

impl<T> FromStrParser<T> {
    /// Creates the parser.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FromStrParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FromStrParser<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FromStrParser")
            .field(&core::any::type_name::<T>())
            .finish()
    }
}

impl<T: PropertyType + FromStr> ValueParser for FromStrParser<T> {
    fn value_type(&self) -> ValueType {
        T::value_type()
    }

    fn parse(&self, input: Option<&str>) -> Result<ErasedValue, ParseError> {
        let text = input.ok_or_else(|| null(T::value_type()))?;
        text.parse::<T>()
            .map(ErasedValue::new)
            .map_err(|_| invalid(text, T::value_type()))
    }
}

/// Parses enum variants by case-insensitive name.
///
/// Built over an enum type, or over `Option<E>` in which case null input
/// (missing, blank or `null`) is accepted.
#[derive(Debug)]
pub struct EnumParser {
    value_type: ValueType,
    kind: EnumKind,
    nullable: Option<NullableKind>,
}

impl EnumParser {
    /// Creates a parser for an enum or nullable enum type.
    ///
    /// Returns `None` for any other type.
    #[must_use]
    pub fn for_type(value_type: ValueType) -> Option<Self> {
        match value_type.kind() {
            ValueKind::Enum(kind) => Some(Self {
                value_type,
                kind,
                nullable: None,
            }),
            ValueKind::Nullable(nullable) => match nullable.inner().kind() {
                ValueKind::Enum(kind) => Some(Self {
                    value_type,
                    kind,
                    nullable: Some(nullable),
                }),
                _ => None,
            },
            _ => None,
        }
    }

    fn unknown(&self, input: &str) -> ParseError {
        let enum_type = match self.nullable {
            Some(nullable) => nullable.inner(),
            None => self.value_type,
        };
        ParseError::UnknownVariant {
            input: input.to_owned(),
            type_name: enum_type.short_name(),
            expected: self.kind.names().into_iter().map(str::to_owned).collect(),
        }
    }
}

impl ValueParser for EnumParser {
    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn parse(&self, input: Option<&str>) -> Result<ErasedValue, ParseError> {
        match (self.nullable, input) {
            (Some(nullable), input) if is_null(input) => nullable
                .wrap(None)
                .ok_or_else(|| null(self.value_type)),
            (_, None) => Err(null(self.value_type)),
            (nullable, Some(text)) => {
                let variant = self.kind.parse(text).ok_or_else(|| self.unknown(text))?;
                match nullable {
                    Some(nullable) => nullable
                        .wrap(Some(variant))
                        .ok_or_else(|| invalid(text, self.value_type)),
                    None => Ok(variant),
                }
            }
        }
    }
}

/// Wraps the parser of `T` into a parser of `Option<T>`.
///
/// Null input (missing, blank or `null`) produces `None`.
#[derive(Debug)]
pub struct NullableParser {
    value_type: ValueType,
    nullable: NullableKind,
    inner: Arc<dyn ValueParser>,
}

impl NullableParser {
    /// Creates the parser; `value_type` must be a nullable type.
    #[must_use]
    pub fn for_type(value_type: ValueType, inner: Arc<dyn ValueParser>) -> Option<Self> {
        match value_type.kind() {
            ValueKind::Nullable(nullable) => Some(Self {
                value_type,
                nullable,
                inner,
            }),
            _ => None,
        }
    }
}

impl ValueParser for NullableParser {
    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn parse(&self, input: Option<&str>) -> Result<ErasedValue, ParseError> {
        match input {
            Some(text) if !is_null(input) => {
                let inner = self.inner.parse(Some(text))?;
                self.nullable
                    .wrap(Some(inner))
                    .ok_or_else(|| invalid(text, self.value_type))
            }
            _ => self
                .nullable
                .wrap(None)
                .ok_or_else(|| null(self.value_type)),
        }
    }
}

/// Parses delimited lists such as `[1, 2, 3]` element by element.
///
/// Elements are parsed in order and parsing stops at the first failure, whose
/// error is returned unchanged.
#[derive(Debug)]
pub struct CollectionParser {
    value_type: ValueType,
    kind: CollectionKind,
    element: Arc<dyn ValueParser>,
    format: CollectionFormat,
}

impl CollectionParser {
    /// Creates the parser; `value_type` must be a collection type.
    #[must_use]
    pub fn for_type(
        value_type: ValueType,
        element: Arc<dyn ValueParser>,
        format: CollectionFormat,
    ) -> Option<Self> {
        match value_type.kind() {
            ValueKind::Collection(kind) => Some(Self {
                value_type,
                kind,
                element,
                format,
            }),
            _ => None,
        }
    }
}

impl ValueParser for CollectionParser {
    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn parse(&self, input: Option<&str>) -> Result<ErasedValue, ParseError> {
        let text = input.ok_or_else(|| null(self.value_type))?;
        let body = self.format.strip(text);
        let items = self
            .format
            .split(body)
            .map(|piece| self.element.parse(Some(piece)))
            .collect::<Result<Vec<_>, _>>()?;
        self.kind
            .collect(items)
            .ok_or_else(|| invalid(text, self.value_type))
    }
}

/// [`Fallbacks`] producing [`EnumParser`], [`NullableParser`] and [`CollectionParser`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ParserFallbacks;

impl Fallbacks<dyn ValueParser> for ParserFallbacks {
    fn enumeration(
        &self,
        value_type: ValueType,
        _kind: EnumKind,
    ) -> Option<Arc<dyn ValueParser>> {
        let parser = EnumParser::for_type(value_type)?;
        Some(Arc::new(parser))
    }

    fn nullable_enumeration(
        &self,
        value_type: ValueType,
        _nullable: NullableKind,
        _kind: EnumKind,
    ) -> Option<Arc<dyn ValueParser>> {
        let parser = EnumParser::for_type(value_type)?;
        Some(Arc::new(parser))
    }

    fn nullable(
        &self,
        value_type: ValueType,
        _nullable: NullableKind,
        inner: Arc<dyn ValueParser>,
    ) -> Option<Arc<dyn ValueParser>> {
        let parser = NullableParser::for_type(value_type, inner)?;
        Some(Arc::new(parser))
    }

    fn collection(
        &self,
        value_type: ValueType,
        _kind: CollectionKind,
        element: Arc<dyn ValueParser>,
        format: &CollectionFormat,
    ) -> Option<Arc<dyn ValueParser>> {
        let parser = CollectionParser::for_type(value_type, element, format.clone())?;
        Some(Arc::new(parser))
    }
}

fn from_str_rule<T: PropertyType + FromStr>() -> Rule<dyn ValueParser> {
    Rule::<dyn ValueParser>::for_type::<T>(Arc::new(FromStrParser::<T>::new()))
}

/// Type-bound [`FromStrParser`] rules for `bool`, `char`, the integer and
/// float primitives, and `String`.
#[must_use]
pub fn standard_rules() -> Vec<Rule<dyn ValueParser>> {
    vec![
        from_str_rule::<bool>(),
        from_str_rule::<char>(),
        from_str_rule::<i8>(),
        from_str_rule::<i16>(),
        from_str_rule::<i32>(),
        from_str_rule::<i64>(),
        from_str_rule::<i128>(),
        from_str_rule::<isize>(),
        from_str_rule::<u8>(),
        from_str_rule::<u16>(),
        from_str_rule::<u32>(),
        from_str_rule::<u64>(),
        from_str_rule::<u128>(),
        from_str_rule::<usize>(),
        from_str_rule::<f32>(),
        from_str_rule::<f64>(),
        from_str_rule::<String>(),
    ]
}

impl ParserProvider {
    /// A provider with [`standard_rules`] and parser synthesis.
    ///
    /// ```rust
    /// use understory_rules::{ParserProvider, RuleResolver};
    /// use understory_schema::PropertyType;
    ///
    /// let parsers = ParserProvider::standard();
    /// let parser = parsers.rule_for_type(Vec::<i32>::value_type()).unwrap();
    /// let value = parser.parse(Some("[1, 2, 3]")).unwrap();
    /// assert_eq!(value.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
    /// ```
    #[must_use]
    pub fn standard() -> Self {
        RuleProvider::<dyn ValueParser>::builder()
            .rules(standard_rules())
            .fallbacks(ParserFallbacks)
            .build()
    }
}

/// Parses `input` for `property` with the handler `rules` resolve for it.
///
/// Returns `Ok(None)` when no handler applies; the caller decides whether to
/// keep the raw text or ignore the field. The produced value always has the
/// property's declared type.
///
/// # Errors
///
/// Returns the handler's [`ParseError`], or [`ParseError::TypeMismatch`] when
/// the resolved handler produces values of a type other than the property's.
pub fn parse_property<R>(
    rules: &R,
    property: &UntypedProperty,
    input: Option<&str>,
) -> Result<Option<PropertyValue>, ParseError>
where
    R: RuleResolver<dyn ValueParser> + ?Sized,
{
    let Some(parser) = rules.rule_for_property(property) else {
        trace!(property = property.name(), "no parser rule");
        return Ok(None);
    };
    let expected = property.value_type();
    let mismatch = |found: &str| ParseError::TypeMismatch {
        property: property.name().to_owned(),
        expected: expected.short_name(),
        found: found.to_owned(),
    };
    if parser.value_type() != expected {
        return Err(mismatch(&parser.value_type().short_name()));
    }
    let value = parser.parse(input)?;
    if value.type_id() != expected.type_id() {
        return Err(mismatch(value.type_name()));
    }
    Ok(Some(PropertyValue::new(
        property.clone(),
        value,
        Provenance::Defined,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_schema::{EnumType, Property};

    #[derive(Copy, Clone, Debug, Default, PartialEq)]
    enum Level {
        #[default]
        Low,
        High,
    }

    impl EnumType for Level {
        fn variants() -> &'static [Self] {
            &[Self::Low, Self::High]
        }

        fn name(&self) -> &'static str {
            match self {
                Self::Low => "Low",
                Self::High => "High",
            }
        }
    }

    impl PropertyType for Level {
        fn value_type() -> ValueType {
            ValueType::enumeration::<Self>()
        }
    }

    #[test]
    fn from_str_rejects_null_and_garbage() {
        let parser = FromStrParser::<i32>::new();
        assert_eq!(
            parser.parse(Some("42")).unwrap().downcast_ref::<i32>(),
            Some(&42)
        );
        assert_eq!(
            parser.parse(None).unwrap_err(),
            ParseError::Null {
                type_name: "i32".into()
            }
        );
        assert_eq!(
            parser.parse(Some("x")).unwrap_err(),
            ParseError::Invalid {
                input: "x".into(),
                type_name: "i32".into()
            }
        );
    }

    #[test]
    fn enum_parser_ignores_case() {
        let parser = EnumParser::for_type(Level::value_type()).unwrap();
        let value = parser.parse(Some("HIGH")).unwrap();
        assert_eq!(value.downcast_ref::<Level>(), Some(&Level::High));
        assert!(matches!(
            parser.parse(Some("medium")),
            Err(ParseError::UnknownVariant { .. })
        ));
        assert!(matches!(parser.parse(None), Err(ParseError::Null { .. })));
    }

    #[test]
    fn nullable_enum_accepts_null() {
        let parser = EnumParser::for_type(Option::<Level>::value_type()).unwrap();
        for input in [None, Some(""), Some("  "), Some("NULL")] {
            let value = parser.parse(input).unwrap();
            assert_eq!(value.downcast_ref::<Option<Level>>(), Some(&None));
        }
        let value = parser.parse(Some("low")).unwrap();
        assert_eq!(value.downcast_ref::<Option<Level>>(), Some(&Some(Level::Low)));
    }

    #[test]
    fn enum_parser_rejects_other_types() {
        assert!(EnumParser::for_type(i32::value_type()).is_none());
        assert!(EnumParser::for_type(Option::<i32>::value_type()).is_none());
    }

    #[test]
    fn collection_stops_at_first_bad_element() {
        let parser = CollectionParser::for_type(
            Vec::<i32>::value_type(),
            Arc::new(FromStrParser::<i32>::new()),
            CollectionFormat::default(),
        )
        .unwrap();
        let ok = parser.parse(Some("[1, 2, 3]")).unwrap();
        assert_eq!(ok.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));

        let err = parser.parse(Some("[1, x, y]")).unwrap_err();
        assert_eq!(
            err,
            ParseError::Invalid {
                input: "x".into(),
                type_name: "i32".into()
            }
        );
        let empty = parser.parse(Some("[]")).unwrap();
        assert_eq!(empty.downcast_ref::<Vec<i32>>(), Some(&vec![]));
    }

    #[test]
    fn parse_property_without_rule_is_none() {
        let provider = RuleProvider::<dyn ValueParser>::builder().build();
        let age = Property::<i32>::new("Age");
        assert!(parse_property(&provider, age.untyped(), Some("3")).unwrap().is_none());
    }

    /// Claims to parse `i32` but yields text.
    #[derive(Debug)]
    struct Mislabeled;

    impl ValueParser for Mislabeled {
        fn value_type(&self) -> ValueType {
            i32::value_type()
        }

        fn parse(&self, input: Option<&str>) -> Result<ErasedValue, ParseError> {
            Ok(ErasedValue::new(input.unwrap_or_default().to_owned()))
        }
    }

    /// Hands out one parser for every query.
    #[derive(Debug)]
    struct Always(Arc<dyn ValueParser>);

    impl RuleResolver<dyn ValueParser> for Always {
        fn rule_for_type(&self, _: ValueType) -> Option<Arc<dyn ValueParser>> {
            Some(Arc::clone(&self.0))
        }

        fn rule_for_property(&self, _: &UntypedProperty) -> Option<Arc<dyn ValueParser>> {
            Some(Arc::clone(&self.0))
        }

        fn property_comparer(&self) -> understory_schema::PropertyComparer {
            understory_schema::PropertyComparer::ByReference
        }
    }

    #[test]
    fn parse_property_rejects_parser_of_other_type() {
        let name = Property::<String>::new("Name");
        let ints = Always(Arc::new(FromStrParser::<i32>::new()));
        assert_eq!(
            parse_property(&ints, name.untyped(), Some("5")).unwrap_err(),
            ParseError::TypeMismatch {
                property: "Name".into(),
                expected: "String".into(),
                found: "i32".into(),
            }
        );

        let age = Property::<i32>::new("Age");
        let lying = Always(Arc::new(Mislabeled));
        assert!(matches!(
            parse_property(&lying, age.untyped(), Some("5")),
            Err(ParseError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn parse_property_marks_defined() {
        let provider = ParserProvider::standard();
        let age = Property::<i32>::new("Age");
        let value = parse_property(&provider, age.untyped(), Some("3"))
            .unwrap()
            .unwrap();
        assert_eq!(value.provenance(), Provenance::Defined);
        assert_eq!(value.downcast_ref::<i32>(), Some(&3));
    }
}
