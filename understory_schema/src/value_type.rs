// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime value type descriptors.
//!
//! A [`ValueType`] is a small `Copy` descriptor built once per Rust type through
//! [`PropertyType::value_type`]. It carries the type identity plus a handful of
//! monomorphized function pointers (zero value, equality, formatting, and a
//! [`ValueKind`] with kind-specific projections). Rule resolution and
//! validation use these pointers to operate on [`ErasedValue`]s without knowing
//! the concrete type at compile time.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::value::ErasedValue;

/// A Rust type that can be the declared type of a property.
///
/// The [`Default`] value is the type's zero value: it is what a container
/// reports for a property with [`Provenance::NotDefined`](crate::Provenance::NotDefined).
///
/// Implementations are provided for `bool`, `char`, the integer and float
/// primitives, [`String`], [`Option<T>`], and the collections [`Vec<T>`],
/// [`VecDeque<T>`], [`LinkedList<T>`], [`BTreeSet<T>`] and [`HashSet<T>`].
/// Other collections describe themselves with [`ValueType::collection`].
/// Enums opt in through [`EnumType`] and [`ValueType::enumeration`]:
///
/// ```rust
/// use understory_schema::{EnumType, PropertyType, ValueType};
///
/// #[derive(Copy, Clone, Debug, Default, PartialEq)]
/// enum Sex {
///     #[default]
///     Male,
///     Female,
/// }
///
/// impl EnumType for Sex {
///     fn variants() -> &'static [Self] {
///         &[Self::Male, Self::Female]
///     }
///
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Male => "Male",
///             Self::Female => "Female",
///         }
///     }
/// }
///
/// impl PropertyType for Sex {
///     fn value_type() -> ValueType {
///         ValueType::enumeration::<Self>()
///     }
/// }
///
/// let ty = Sex::value_type();
/// assert!(ty.is_enum());
/// assert_eq!(ty.short_name(), "Sex");
/// ```
pub trait PropertyType: Clone + PartialEq + fmt::Debug + Default + Send + Sync + 'static {
    /// Returns the descriptor for this type.
    fn value_type() -> ValueType;
}

/// A fieldless enum usable as a property type.
pub trait EnumType: PropertyType {
    /// All variants, in declaration order.
    fn variants() -> &'static [Self];

    /// The variant name used for parsing and formatting.
    fn name(&self) -> &'static str;
}

/// Numeric projection used by interval checks.
#[derive(Copy, Clone)]
pub struct NumberKind {
    integral: bool,
    to_f64: fn(&dyn Any) -> Option<f64>,
}

impl NumberKind {
    /// Creates a numeric kind projecting values to `f64` with `to_f64`.
    #[must_use]
    pub const fn new(integral: bool, to_f64: fn(&dyn Any) -> Option<f64>) -> Self {
        Self { integral, to_f64 }
    }

    /// Returns `true` for integer types.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        self.integral
    }
}

/// Text projection used by length checks.
#[derive(Copy, Clone)]
pub struct TextKind {
    char_len: fn(&dyn Any) -> Option<usize>,
}

impl TextKind {
    /// Creates a text kind measuring values in chars with `char_len`.
    #[must_use]
    pub const fn new(char_len: fn(&dyn Any) -> Option<usize>) -> Self {
        Self { char_len }
    }
}

/// Enum parsing support.
#[derive(Copy, Clone)]
pub struct EnumKind {
    names: fn() -> Vec<&'static str>,
    parse: fn(&str) -> Option<ErasedValue>,
}

impl EnumKind {
    /// Describes the enum `E`.
    #[must_use]
    pub fn of<E: EnumType>() -> Self {
        Self {
            names: enum_names::<E>,
            parse: parse_enum::<E>,
        }
    }

    /// Returns all variant names, in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        (self.names)()
    }

    /// Parses a variant by case-insensitive name.
    #[must_use]
    pub fn parse(&self, name: &str) -> Option<ErasedValue> {
        (self.parse)(name)
    }
}

/// `Option<T>` support.
#[derive(Copy, Clone)]
pub struct NullableKind {
    inner: fn() -> ValueType,
    inner_ref: fn(&dyn Any) -> Option<&dyn Any>,
    wrap: fn(Option<ErasedValue>) -> Option<ErasedValue>,
}

impl NullableKind {
    /// Describes `Option<T>`.
    #[must_use]
    pub fn of<T: PropertyType>() -> Self {
        Self {
            inner: T::value_type,
            inner_ref: option_inner_ref::<T>,
            wrap: wrap_option::<T>,
        }
    }

    /// Returns the descriptor of the wrapped type.
    #[must_use]
    pub fn inner(&self) -> ValueType {
        (self.inner)()
    }

    /// Wraps an inner value (or `None` for null) into the nullable type.
    ///
    /// Returns `None` if `value` is not of the inner type.
    #[must_use]
    pub fn wrap(&self, value: Option<ErasedValue>) -> Option<ErasedValue> {
        (self.wrap)(value)
    }
}

/// Collection support: an element type and a way to assemble elements.
#[derive(Copy, Clone)]
pub struct CollectionKind {
    element: fn() -> ValueType,
    collect: fn(Vec<ErasedValue>) -> Option<ErasedValue>,
}

impl CollectionKind {
    /// Describes a collection `C` of `T`, assembled through [`FromIterator`].
    #[must_use]
    pub fn of<C, T>() -> Self
    where
        C: FromIterator<T> + Clone + Send + Sync + 'static,
        T: PropertyType,
    {
        Self {
            element: T::value_type,
            collect: collect_into::<C, T>,
        }
    }

    /// Returns the descriptor of the element type.
    #[must_use]
    pub fn element(&self) -> ValueType {
        (self.element)()
    }

    /// Assembles a collection value from erased elements.
    ///
    /// Returns `None` if any element is not of the element type.
    #[must_use]
    pub fn collect(&self, items: Vec<ErasedValue>) -> Option<ErasedValue> {
        (self.collect)(items)
    }
}

/// The shape of a [`ValueType`].
#[derive(Copy, Clone)]
pub enum ValueKind {
    /// `bool`.
    Bool,
    /// `char`.
    Char,
    /// Integer and float primitives.
    Number(NumberKind),
    /// `String`.
    Text(TextKind),
    /// A fieldless enum implementing [`EnumType`].
    Enum(EnumKind),
    /// `Option<T>`.
    Nullable(NullableKind),
    /// A collection of elements of one type, such as `Vec<T>` or `BTreeSet<T>`.
    Collection(CollectionKind),
    /// Any other type.
    Other,
}

impl ValueKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Char => "Char",
            Self::Number(_) => "Number",
            Self::Text(_) => "Text",
            Self::Enum(_) => "Enum",
            Self::Nullable(_) => "Nullable",
            Self::Collection(_) => "Collection",
            Self::Other => "Other",
        }
    }
}

impl fmt::Debug for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberKind")
            .field("integral", &self.integral)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for TextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextKind").finish_non_exhaustive()
    }
}

impl fmt::Debug for EnumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumKind")
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for NullableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NullableKind")
            .field("inner", &self.inner().name())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionKind")
            .field("element", &self.element().name())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A runtime descriptor of a property's declared type.
///
/// Two descriptors are equal when they describe the same Rust type.
#[derive(Copy, Clone)]
pub struct ValueType {
    type_id: TypeId,
    name: &'static str,
    kind: ValueKind,
    zero: fn() -> ErasedValue,
    eq: fn(&dyn Any, &dyn Any) -> bool,
    format: fn(&dyn Any) -> String,
}

impl ValueType {
    /// Creates a descriptor of the given kind that formats with `Debug`.
    #[must_use]
    pub fn with_kind<T: PropertyType>(kind: ValueKind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
            kind,
            zero: zero_of::<T>,
            eq: eq_of::<T>,
            format: debug_of::<T>,
        }
    }

    /// Creates a descriptor for a type with no special handling.
    #[must_use]
    pub fn opaque<T: PropertyType>() -> Self {
        Self::with_kind::<T>(ValueKind::Other)
    }

    /// Creates a descriptor for a fieldless enum.
    #[must_use]
    pub fn enumeration<E: EnumType>() -> Self {
        Self {
            format: format_enum::<E>,
            ..Self::with_kind::<E>(ValueKind::Enum(EnumKind::of::<E>()))
        }
    }

    /// Creates the descriptor of `Option<T>`, formatting `None` as `null`.
    #[must_use]
    pub fn nullable<T: PropertyType>() -> Self {
        Self {
            format: format_option::<T>,
            ..Self::with_kind::<Option<T>>(ValueKind::Nullable(NullableKind::of::<T>()))
        }
    }

    /// Creates a descriptor for a collection `C` of `T`, formatted as `[a, b]`.
    ///
    /// ```rust
    /// use std::collections::BTreeSet;
    /// use understory_schema::{PropertyType, ValueKind, ValueType};
    ///
    /// let ty = ValueType::collection::<BTreeSet<u8>, u8>();
    /// assert_eq!(ty, BTreeSet::<u8>::value_type());
    /// let ValueKind::Collection(kind) = ty.kind() else { unreachable!() };
    /// assert!(kind.element().is::<u8>());
    /// ```
    #[must_use]
    pub fn collection<C, T>() -> Self
    where
        C: PropertyType + FromIterator<T>,
        for<'a> &'a C: IntoIterator<Item = &'a T>,
        T: PropertyType,
    {
        Self {
            format: format_collection::<C, T>,
            ..Self::with_kind::<C>(ValueKind::Collection(CollectionKind::of::<C, T>()))
        }
    }

    /// Returns the [`TypeId`] of the described type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the full Rust type name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the type name with module paths removed (`Option<i32>`, `Vec<String>`).
    #[must_use]
    pub fn short_name(&self) -> String {
        shorten_type_name(self.name)
    }

    /// Returns the kind of the described type.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns `true` if the type is `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns `true` for enum types.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        matches!(self.kind, ValueKind::Enum(_))
    }

    /// Returns `true` for `Option<T>` types.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(self.kind, ValueKind::Nullable(_))
    }

    /// Returns `true` for `String`.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ValueKind::Text(_))
    }

    /// Returns `true` for `String` and `Option<String>`.
    #[must_use]
    pub fn is_textual(&self) -> bool {
        match self.kind {
            ValueKind::Text(_) => true,
            ValueKind::Nullable(nullable) => nullable.inner().is_text(),
            _ => false,
        }
    }

    /// Returns `true` for numeric types and nullable numeric types.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        match self.kind {
            ValueKind::Number(_) => true,
            ValueKind::Nullable(nullable) => nullable.inner().is_numeric(),
            _ => false,
        }
    }

    /// Returns the zero value of the type.
    #[must_use]
    pub fn zero(&self) -> ErasedValue {
        (self.zero)()
    }

    /// Compares two erased values of this type.
    ///
    /// Values of a different type never compare equal.
    #[must_use]
    pub fn values_equal(&self, a: &ErasedValue, b: &ErasedValue) -> bool {
        (self.eq)(a.as_any(), b.as_any())
    }

    /// Returns `true` if `value` equals the zero value of the type.
    #[must_use]
    pub fn is_zero(&self, value: &ErasedValue) -> bool {
        self.values_equal(value, &self.zero())
    }

    /// Formats an erased value of this type.
    ///
    /// Text is rendered verbatim, enums by variant name, `None` as `null`,
    /// collections as `[a, b]`, everything else with `Debug`.
    #[must_use]
    pub fn format(&self, value: &ErasedValue) -> String {
        (self.format)(value.as_any())
    }

    /// Returns `true` if `value` is the `None` of a nullable type.
    #[must_use]
    pub fn is_null(&self, value: &ErasedValue) -> bool {
        match self.kind {
            ValueKind::Nullable(nullable) => (nullable.inner_ref)(value.as_any()).is_none(),
            _ => false,
        }
    }

    /// Projects a numeric value (or a present nullable numeric value) to `f64`.
    #[must_use]
    pub fn to_f64(&self, value: &ErasedValue) -> Option<f64> {
        project_f64(self.kind, value.as_any())
    }

    /// Returns the length in chars of a text value (or a present nullable text value).
    #[must_use]
    pub fn text_len(&self, value: &ErasedValue) -> Option<usize> {
        project_len(self.kind, value.as_any())
    }
}

fn project_f64(kind: ValueKind, value: &dyn Any) -> Option<f64> {
    match kind {
        ValueKind::Number(number) => (number.to_f64)(value),
        ValueKind::Nullable(nullable) => {
            project_f64(nullable.inner().kind, (nullable.inner_ref)(value)?)
        }
        _ => None,
    }
}

fn project_len(kind: ValueKind, value: &dyn Any) -> Option<usize> {
    match kind {
        ValueKind::Text(text) => (text.char_len)(value),
        ValueKind::Nullable(nullable) => {
            project_len(nullable.inner().kind, (nullable.inner_ref)(value)?)
        }
        _ => None,
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

fn zero_of<T: PropertyType>() -> ErasedValue {
    ErasedValue::new(T::default())
}

fn eq_of<T: PropertyType>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn debug_of<T: PropertyType>(value: &dyn Any) -> String {
    value
        .downcast_ref::<T>()
        .map(|v| format!("{v:?}"))
        .unwrap_or_default()
}

fn format_text(value: &dyn Any) -> String {
    value.downcast_ref::<String>().cloned().unwrap_or_default()
}

fn text_char_len(value: &dyn Any) -> Option<usize> {
    value.downcast_ref::<String>().map(|s| s.chars().count())
}

fn format_enum<E: EnumType>(value: &dyn Any) -> String {
    value
        .downcast_ref::<E>()
        .map(|v| v.name().to_owned())
        .unwrap_or_default()
}

fn enum_names<E: EnumType>() -> Vec<&'static str> {
    E::variants().iter().map(EnumType::name).collect()
}

fn parse_enum<E: EnumType>(name: &str) -> Option<ErasedValue> {
    let name = name.trim();
    E::variants()
        .iter()
        .find(|variant| eq_ignore_case(variant.name(), name))
        .map(|variant| ErasedValue::new(variant.clone()))
}

fn option_inner_ref<T: PropertyType>(value: &dyn Any) -> Option<&dyn Any> {
    value
        .downcast_ref::<Option<T>>()?
        .as_ref()
        .map(|inner| inner as &dyn Any)
}

fn wrap_option<T: PropertyType>(value: Option<ErasedValue>) -> Option<ErasedValue> {
    match value {
        None => Some(ErasedValue::new(None::<T>)),
        Some(value) => value.take::<T>().map(|inner| ErasedValue::new(Some(inner))),
    }
}

fn format_option<T: PropertyType>(value: &dyn Any) -> String {
    match value.downcast_ref::<Option<T>>() {
        Some(Some(inner)) => (T::value_type().format)(inner),
        Some(None) => String::from("null"),
        None => String::new(),
    }
}

fn collect_into<C, T>(items: Vec<ErasedValue>) -> Option<ErasedValue>
where
    C: FromIterator<T> + Clone + Send + Sync + 'static,
    T: PropertyType,
{
    let items = items
        .into_iter()
        .map(ErasedValue::take::<T>)
        .collect::<Option<C>>()?;
    Some(ErasedValue::new(items))
}

fn format_collection<C, T>(value: &dyn Any) -> String
where
    C: PropertyType,
    for<'a> &'a C: IntoIterator<Item = &'a T>,
    T: PropertyType,
{
    let Some(items) = value.downcast_ref::<C>() else {
        return String::new();
    };
    let element = T::value_type();
    let parts: Vec<String> = items.into_iter().map(|item| (element.format)(item)).collect();
    format!("[{}]", parts.join(", "))
}

/// Case-insensitive string comparison (Unicode lowercase folding).
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn shorten_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut segment = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or_default());
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or_default());
    out
}

macro_rules! impl_number {
    ($integral:expr => $($ty:ty),*) => {$(
        impl PropertyType for $ty {
            fn value_type() -> ValueType {
                #[allow(trivial_numeric_casts, reason = "shared macro body for f64 too")]
                #[allow(clippy::cast_precision_loss, reason = "intervals are f64-based")]
                fn to_f64(value: &dyn Any) -> Option<f64> {
                    value.downcast_ref::<$ty>().map(|v| *v as f64)
                }
                ValueType::with_kind::<$ty>(ValueKind::Number(NumberKind {
                    integral: $integral,
                    to_f64,
                }))
            }
        }
    )*};
}

impl_number!(true => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_number!(false => f32, f64);

impl PropertyType for bool {
    fn value_type() -> ValueType {
        ValueType::with_kind::<Self>(ValueKind::Bool)
    }
}

impl PropertyType for char {
    fn value_type() -> ValueType {
        ValueType::with_kind::<Self>(ValueKind::Char)
    }
}

impl PropertyType for String {
    fn value_type() -> ValueType {
        ValueType {
            format: format_text,
            ..ValueType::with_kind::<Self>(ValueKind::Text(TextKind {
                char_len: text_char_len,
            }))
        }
    }
}

impl<T: PropertyType> PropertyType for Option<T> {
    fn value_type() -> ValueType {
        ValueType::nullable::<T>()
    }
}

impl<T: PropertyType> PropertyType for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::collection::<Self, T>()
    }
}

impl<T: PropertyType> PropertyType for VecDeque<T> {
    fn value_type() -> ValueType {
        ValueType::collection::<Self, T>()
    }
}

impl<T: PropertyType> PropertyType for LinkedList<T> {
    fn value_type() -> ValueType {
        ValueType::collection::<Self, T>()
    }
}

impl<T: PropertyType + Ord> PropertyType for BTreeSet<T> {
    fn value_type() -> ValueType {
        ValueType::collection::<Self, T>()
    }
}

// Iteration order of a `HashSet` is unspecified, and so is its formatting.
impl<T: PropertyType + Eq + Hash> PropertyType for HashSet<T> {
    fn value_type() -> ValueType {
        ValueType::collection::<Self, T>()
    }
}
