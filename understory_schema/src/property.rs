// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property declarations.
//!
//! A property is an immutable identity: a name, an optional alias, a declared
//! [`ValueType`], and a [`MetadataStore`]. [`UntypedProperty`] is the shared,
//! type-erased handle; [`Property<T>`] is the typed view used at call sites.
//!
//! Metadata is attached while building ([`PropertyBuilder`]) or afterwards
//! through copy-on-write ([`Property::with_metadata`]), which returns a new
//! handle with the same [`PropertyId`]. Metadata is never mutated on a handle
//! that may already be shared.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::constraint::{AllowedValues, Nullability, NumericInterval, StringLength};
use crate::error::{ResolveError, SchemaError};
use crate::id::PropertyId;
use crate::metadata::{
    Calculator, DefaultValue, Description, HasMetadata, Metadata, MetadataStore, SchemaRef,
};
use crate::resolve::Resolver;
use crate::schema::Schema;
use crate::value::ErasedValue;
use crate::value_type::{PropertyType, ValueType};

#[derive(Clone)]
struct PropertyData {
    id: PropertyId,
    name: String,
    alias: Option<String>,
    value_type: ValueType,
    metadata: MetadataStore,
}

/// A type-erased property handle.
///
/// Cloning is cheap. Two handles are `==` when they share a [`PropertyId`];
/// other notions of sameness are provided by
/// [`PropertyComparer`](crate::PropertyComparer).
#[derive(Clone)]
pub struct UntypedProperty(Arc<PropertyData>);

impl UntypedProperty {
    /// Declares a property of the given runtime type with no metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self(Arc::new(PropertyData {
            id: PropertyId::next(),
            name: name.into(),
            alias: None,
            value_type,
            metadata: MetadataStore::new(),
        }))
    }

    /// Returns the property id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> PropertyId {
        self.0.id
    }

    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the alternate name, if any.
    #[must_use]
    #[inline]
    pub fn alias(&self) -> Option<&str> {
        self.0.alias.as_deref()
    }

    /// Returns the name followed by the alias, if any.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        core::iter::once(self.name()).chain(self.alias())
    }

    /// Returns the declared type.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.0.value_type
    }

    /// Returns a typed view if the declared type is `T`.
    #[must_use]
    pub fn typed<T: PropertyType>(&self) -> Option<Property<T>> {
        self.0.value_type.is::<T>().then(|| Property {
            inner: self.clone(),
            _marker: PhantomData,
        })
    }

    /// Returns a new handle with `value` attached, keeping the same id.
    ///
    /// # Errors
    ///
    /// Returns the error reported by [`Metadata::check`].
    pub fn with_metadata<M: Metadata>(&self, value: M) -> Result<Self, SchemaError> {
        self.rebuild(|data| attach(data, None, value))
    }

    /// Returns a new handle with `value` attached under `name`, keeping the same id.
    ///
    /// # Errors
    ///
    /// Returns the error reported by [`Metadata::check`].
    pub fn with_named_metadata<M: Metadata>(
        &self,
        name: impl Into<String>,
        value: M,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        self.rebuild(|data| attach(data, Some(name), value))
    }

    /// Returns a new handle after a read-modify-write of metadata `M`, keeping the same id.
    ///
    /// # Errors
    ///
    /// Returns the error reported by [`Metadata::check`] for the updated value.
    pub fn configure<M: Metadata + Default>(
        &self,
        f: impl FnOnce(&mut M),
    ) -> Result<Self, SchemaError> {
        let mut value = self.0.metadata.get::<M>().cloned().unwrap_or_default();
        f(&mut value);
        self.with_metadata(value)
    }

    fn rebuild(
        &self,
        f: impl FnOnce(&mut PropertyData) -> Result<(), SchemaError>,
    ) -> Result<Self, SchemaError> {
        let mut data = (*self.0).clone();
        f(&mut data)?;
        Ok(Self(Arc::new(data)))
    }
}

fn attach<M: Metadata>(
    data: &mut PropertyData,
    name: Option<String>,
    value: M,
) -> Result<(), SchemaError> {
    value.check(&data.name, &data.value_type)?;
    match name {
        Some(name) => data.metadata.set_named(name, value),
        None => data.metadata.set(value),
    };
    Ok(())
}

impl HasMetadata for UntypedProperty {
    fn metadata(&self) -> &MetadataStore {
        &self.0.metadata
    }
}

impl PartialEq for UntypedProperty {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for UntypedProperty {}

impl Hash for UntypedProperty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl AsRef<Self> for UntypedProperty {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl fmt::Debug for UntypedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.0.id.index())
            .field("name", &self.0.name)
            .field("type", &self.0.value_type.short_name())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for UntypedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// A typed property handle.
///
/// `Property<T>` carries no data beyond the shared [`UntypedProperty`]; the
/// type parameter only constrains the values that can be stored and read
/// through it.
///
/// # Example
///
/// ```rust
/// use understory_schema::{HasMetadata, NumericInterval, Property};
///
/// let age = Property::<i32>::builder("Age")
///     .description("age in years")
///     .default_value(18)
///     .interval(NumericInterval::new().min(0.0))
///     .build()
///     .unwrap();
///
/// assert_eq!(age.name(), "Age");
/// assert!(age.metadata().contains::<NumericInterval>());
///
/// // Intervals are only legal on numeric properties.
/// let name = Property::<String>::builder("Name")
///     .interval(NumericInterval::new().max(3.0))
///     .build();
/// assert!(name.is_err());
/// ```
pub struct Property<T> {
    inner: UntypedProperty,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PropertyType> Property<T> {
    /// Declares a property with no metadata.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: UntypedProperty::new(name, T::value_type()),
            _marker: PhantomData,
        }
    }

    /// Starts building a property declaration.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PropertyBuilder<T> {
        PropertyBuilder::new(name)
    }

    /// Returns the type-erased handle.
    #[must_use]
    #[inline]
    pub fn untyped(&self) -> &UntypedProperty {
        &self.inner
    }

    /// Returns the property id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> PropertyId {
        self.inner.id()
    }

    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the alternate name, if any.
    #[must_use]
    #[inline]
    pub fn alias(&self) -> Option<&str> {
        self.inner.alias()
    }

    /// Returns the declared type.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.inner.value_type()
    }

    /// Returns a new handle with `value` attached, keeping the same id.
    ///
    /// # Errors
    ///
    /// Returns the error reported by [`Metadata::check`].
    pub fn with_metadata<M: Metadata>(&self, value: M) -> Result<Self, SchemaError> {
        Ok(Self {
            inner: self.inner.with_metadata(value)?,
            _marker: PhantomData,
        })
    }

    /// Returns a new handle after a read-modify-write of metadata `M`, keeping the same id.
    ///
    /// # Errors
    ///
    /// Returns the error reported by [`Metadata::check`] for the updated value.
    pub fn configure<M: Metadata + Default>(
        &self,
        f: impl FnOnce(&mut M),
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            inner: self.inner.configure(f)?,
            _marker: PhantomData,
        })
    }

    /// Returns the declared default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&T> {
        self.metadata()
            .get::<DefaultValue>()
            .and_then(|default| default.value().downcast_ref())
    }
}

impl<T: 'static> HasMetadata for Property<T> {
    fn metadata(&self) -> &MetadataStore {
        self.inner.metadata()
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Property<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Eq for Property<T> {}

impl<T> Hash for Property<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<T> AsRef<UntypedProperty> for Property<T> {
    fn as_ref(&self) -> &UntypedProperty {
        &self.inner
    }
}

impl<T> From<Property<T>> for UntypedProperty {
    fn from(property: Property<T>) -> Self {
        property.inner
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl<T> fmt::Display for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

/// Builder for a [`Property<T>`].
///
/// Each metadata call is checked immediately; the first configuration error is
/// kept and returned by [`build`](Self::build).
#[must_use = "call `build` to declare the property"]
pub struct PropertyBuilder<T> {
    name: String,
    alias: Option<String>,
    metadata: MetadataStore,
    error: Option<SchemaError>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PropertyType> PropertyBuilder<T> {
    /// Starts a declaration named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            metadata: MetadataStore::new(),
            error: None,
            _marker: PhantomData,
        }
    }

    /// Sets the alternate name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Attaches a [`Description`].
    pub fn description(self, text: impl Into<String>) -> Self {
        self.metadata(Description::new(text))
    }

    /// Attaches a [`DefaultValue`].
    pub fn default_value(self, value: T) -> Self {
        self.metadata(DefaultValue::new(value))
    }

    /// Attaches a [`Calculator`] producing `T` from the container being queried.
    pub fn calculated<F>(self, f: F) -> Self
    where
        F: Fn(&Resolver<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.metadata(Calculator::new(move |resolver| {
            f(resolver).map(ErasedValue::new)
        }))
    }

    /// Attaches a [`Nullability`].
    pub fn nullable(self, allow_null: bool) -> Self {
        self.metadata(Nullability { allow_null })
    }

    /// Attaches a [`StringLength`]; only valid on text properties.
    pub fn length(self, length: StringLength) -> Self {
        self.metadata(length)
    }

    /// Attaches [`AllowedValues`].
    pub fn allowed_values(self, values: impl IntoIterator<Item = T>) -> Self {
        self.metadata(AllowedValues::new(values))
    }

    /// Attaches a [`NumericInterval`]; only valid on numeric properties.
    pub fn interval(self, interval: NumericInterval) -> Self {
        self.metadata(interval)
    }

    /// Attaches a [`SchemaRef`] to a nested schema.
    pub fn schema(self, schema: Schema) -> Self {
        self.metadata(SchemaRef::new(schema))
    }

    /// Attaches arbitrary metadata.
    pub fn metadata<M: Metadata>(self, value: M) -> Self {
        self.attach(None, value)
    }

    /// Attaches arbitrary metadata under `name`.
    pub fn named_metadata<M: Metadata>(self, name: impl Into<String>, value: M) -> Self {
        self.attach(Some(name.into()), value)
    }

    fn attach<M: Metadata>(mut self, name: Option<String>, value: M) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(err) = value.check(&self.name, &T::value_type()) {
            self.error = Some(err);
            return self;
        }
        match name {
            Some(name) => self.metadata.set_named(name, value),
            None => self.metadata.set(value),
        };
        self
    }

    /// Declares the property.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error recorded while building.
    pub fn build(self) -> Result<Property<T>, SchemaError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Property {
            inner: UntypedProperty(Arc::new(PropertyData {
                id: PropertyId::next(),
                name: self.name,
                alias: self.alias,
                value_type: T::value_type(),
                metadata: self.metadata,
            })),
            _marker: PhantomData,
        })
    }
}

impl<T> fmt::Debug for PropertyBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBuilder")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("metadata", &self.metadata)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_properties_have_distinct_ids() {
        let a = Property::<i32>::new("A");
        let b = Property::<i32>::new("A");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn with_metadata_keeps_identity() {
        let age = Property::<i32>::new("Age");
        let described = age.with_metadata(Description::new("years")).unwrap();

        assert_eq!(age, described);
        assert!(age.metadata().is_empty());
        assert_eq!(
            described.metadata().get::<Description>().map(Description::text),
            Some("years")
        );
    }

    #[test]
    fn configure_reads_then_writes() {
        let name = Property::<String>::builder("Name")
            .length(StringLength::new().with_min(1))
            .build()
            .unwrap();
        let name = name
            .configure::<StringLength>(|len| *len = len.with_max(10))
            .unwrap();
        let length = name.metadata().get::<StringLength>().copied().unwrap();
        assert_eq!(length, StringLength::between(1, 10));
    }

    #[test]
    fn builder_keeps_first_error() {
        let result = Property::<bool>::builder("Flag")
            .length(StringLength::between(1, 2))
            .interval(NumericInterval::new().min(0.0))
            .build();
        assert!(matches!(result, Err(SchemaError::NonTextLength { .. })));
    }

    #[test]
    fn late_interval_on_text_is_rejected() {
        let name = Property::<String>::new("Name");
        let err = name
            .with_metadata(NumericInterval::new().max(1.0))
            .unwrap_err();
        assert!(err.to_string().contains("'Name'"));
    }

    #[test]
    fn typed_view_checks_type() {
        let age = Property::<i32>::new("Age");
        let untyped: UntypedProperty = age.clone().into();
        assert_eq!(untyped.typed::<i32>(), Some(age));
        assert!(untyped.typed::<i64>().is_none());
    }

    #[test]
    fn default_value_is_typed() {
        let age = Property::<i32>::builder("Age")
            .default_value(21)
            .build()
            .unwrap();
        assert_eq!(age.default_value(), Some(&21));
    }

    #[test]
    fn names_include_alias() {
        let p = Property::<i32>::builder("Age").alias("years").build().unwrap();
        let names: Vec<_> = p.untyped().names().collect();
        assert_eq!(names, vec!["Age", "years"]);
    }
}
