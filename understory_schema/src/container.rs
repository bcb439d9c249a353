// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property containers.
//!
//! A [`PropertyContainer`] is an immutable, ordered set of [`PropertyValue`]s,
//! at most one per property (by reference identity), optionally chained to a
//! parent container. All mutation goes through [`ContainerBuilder`], which
//! produces a new container on [`build`](ContainerBuilder::build).
//!
//! # Storage
//!
//! Values live in a `SmallVec` in insertion order. Containers are typically
//! small and created per record, so a linear scan over inline storage beats a
//! hash map, and insertion order is observable anyway.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::comparer::PropertyComparer;
use crate::error::ResolveError;
use crate::metadata::{HasMetadata, Metadata, MetadataStore};
use crate::property::{Property, UntypedProperty};
use crate::resolve::{Resolver, SearchOptions, resolve};
use crate::value::ErasedValue;
use crate::value_type::PropertyType;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inline capacity for container values.
///
/// Most records carry only a handful of properties, so this avoids heap
/// allocation in the common case.
const INLINE_CAPACITY: usize = 8;

/// Where a [`PropertyValue`] came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Provenance {
    /// Explicitly set on a container.
    Defined,
    /// Produced by a [`Calculator`](crate::Calculator).
    Calculated,
    /// Taken from the property's [`DefaultValue`](crate::DefaultValue).
    DefaultValue,
    /// No value exists; the value is the type's zero value and must be
    /// treated as absent.
    NotDefined,
}

/// A value of a property together with its [`Provenance`].
#[derive(Clone)]
pub struct PropertyValue {
    property: UntypedProperty,
    value: ErasedValue,
    provenance: Provenance,
}

impl PropertyValue {
    /// Creates a value with an explicit provenance.
    #[must_use]
    pub fn new(property: UntypedProperty, value: ErasedValue, provenance: Provenance) -> Self {
        Self {
            property,
            value,
            provenance,
        }
    }

    /// Creates an explicitly set value.
    #[must_use]
    pub fn defined<T: PropertyType>(property: &Property<T>, value: T) -> Self {
        Self::new(
            property.untyped().clone(),
            ErasedValue::new(value),
            Provenance::Defined,
        )
    }

    /// Creates a [`Provenance::NotDefined`] value holding the zero value of the property type.
    #[must_use]
    pub fn not_defined(property: UntypedProperty) -> Self {
        let value = property.value_type().zero();
        Self::new(property, value, Provenance::NotDefined)
    }

    /// Returns the property.
    #[must_use]
    #[inline]
    pub fn property(&self) -> &UntypedProperty {
        &self.property
    }

    /// Returns the erased value.
    #[must_use]
    #[inline]
    pub fn value(&self) -> &ErasedValue {
        &self.value
    }

    /// Returns the provenance.
    #[must_use]
    #[inline]
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Returns `false` for [`Provenance::NotDefined`].
    #[must_use]
    #[inline]
    pub fn has_value(&self) -> bool {
        self.provenance != Provenance::NotDefined
    }

    /// Returns the value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// Formats the value with its property's type.
    #[must_use]
    pub fn format(&self) -> String {
        self.property.value_type().format(&self.value)
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValue")
            .field("property", &self.property.name())
            .field("value", &self.format())
            .field("provenance", &self.provenance)
            .finish()
    }
}

/// An immutable, ordered store of property values.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use understory_schema::{Property, PropertyComparer, PropertyContainer};
///
/// let name = Property::<String>::new("Name");
/// let age = Property::<i32>::new("Age");
///
/// let parent = Arc::new(PropertyContainer::builder().set(&name, "Ann".into()).build());
/// let child = PropertyContainer::builder()
///     .set(&age, 9)
///     .with_parent(parent)
///     .build();
///
/// assert_eq!(child.get_local(&age), Some(&9));
/// assert_eq!(child.get_local(&name), None);
/// let parent = child.parent().unwrap();
/// assert!(parent.find(name.untyped(), PropertyComparer::ByReference).is_some());
/// ```
#[derive(Clone, Default)]
pub struct PropertyContainer {
    values: SmallVec<[PropertyValue; INLINE_CAPACITY]>,
    parent: Option<Arc<Self>>,
    metadata: MetadataStore,
}

impl PropertyContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container from a sequence of values.
    ///
    /// For repeated properties the last value wins and keeps the position of
    /// the first occurrence.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = PropertyValue>) -> Self {
        ContainerBuilder::new().extend(values).build()
    }

    /// Starts building a container.
    #[must_use]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Returns a builder pre-filled with this container's values, parent and metadata.
    #[must_use]
    pub fn to_builder(&self) -> ContainerBuilder {
        ContainerBuilder {
            inner: self.clone(),
        }
    }

    /// Returns the number of local values.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no local values are set.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the local values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> + '_ {
        self.values.iter()
    }

    /// Returns the properties that have local values, in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = &UntypedProperty> + '_ {
        self.values.iter().map(PropertyValue::property)
    }

    /// Returns the parent container.
    #[must_use]
    #[inline]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Returns this container followed by its ancestors, nearest first.
    pub fn ancestry(&self) -> impl Iterator<Item = &Self> + '_ {
        core::iter::successors(Some(self), |container| container.parent.as_deref())
    }

    /// Finds the first local value whose property matches under `comparer`.
    #[must_use]
    pub fn find(
        &self,
        property: &UntypedProperty,
        comparer: PropertyComparer,
    ) -> Option<&PropertyValue> {
        self.values
            .iter()
            .find(|value| comparer.eq(&value.property, property))
    }

    /// Returns `true` if `property` has a local value (by reference).
    #[must_use]
    pub fn contains(&self, property: &UntypedProperty) -> bool {
        self.find(property, PropertyComparer::ByReference).is_some()
    }

    /// Returns the local value of a typed property (by reference).
    #[must_use]
    pub fn get_local<T: PropertyType>(&self, property: &Property<T>) -> Option<&T> {
        self.find(property.untyped(), PropertyComparer::ByReference)
            .and_then(PropertyValue::downcast_ref)
    }

    /// Resolves `property` in this container with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Cycle`] if a calculated property depends on itself.
    pub fn resolve(
        &self,
        property: &UntypedProperty,
        options: SearchOptions,
    ) -> Result<Option<PropertyValue>, ResolveError> {
        resolve(self, property, options)
    }

    /// Returns the effective value of a typed property under [`SearchOptions::DEFAULT`].
    ///
    /// `None` means no value exists: nothing is set, inherited, calculated or
    /// declared as default.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Cycle`] if a calculated property depends on itself.
    pub fn get<T: PropertyType>(&self, property: &Property<T>) -> Result<Option<T>, ResolveError> {
        Resolver::new(self, SearchOptions::DEFAULT).get(property)
    }

    fn position(&self, property: &UntypedProperty) -> Option<usize> {
        self.values
            .iter()
            .position(|value| value.property == *property)
    }
}

impl HasMetadata for PropertyContainer {
    fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }
}

impl FromIterator<PropertyValue> for PropertyContainer {
    fn from_iter<I: IntoIterator<Item = PropertyValue>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}

impl<'a> IntoIterator for &'a PropertyContainer {
    type Item = &'a PropertyValue;
    type IntoIter = core::slice::Iter<'a, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Debug for PropertyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyContainer")
            .field("values", &self.values)
            .field("has_parent", &self.parent.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// The mutable side of a [`PropertyContainer`].
///
/// Properties are unique by reference identity: setting a property that is
/// already present replaces its value in place.
#[derive(Clone, Debug, Default)]
#[must_use = "call `build` to produce a container"]
pub struct ContainerBuilder {
    inner: PropertyContainer,
}

impl ContainerBuilder {
    /// Starts an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a typed value with [`Provenance::Defined`].
    pub fn set<T: PropertyType>(self, property: &Property<T>, value: T) -> Self {
        self.set_value(PropertyValue::defined(property, value))
    }

    /// Sets a value, replacing any existing value of the same property.
    pub fn set_value(mut self, value: PropertyValue) -> Self {
        match self.inner.position(&value.property) {
            Some(index) => self.inner.values[index] = value,
            None => self.inner.values.push(value),
        }
        self
    }

    /// Removes the local value of `property`.
    pub fn remove(mut self, property: &UntypedProperty) -> Self {
        if let Some(index) = self.inner.position(property) {
            self.inner.values.remove(index);
        }
        self
    }

    /// Sets every value in order.
    pub fn extend(self, values: impl IntoIterator<Item = PropertyValue>) -> Self {
        values.into_iter().fold(self, Self::set_value)
    }

    /// Chains the container to a parent.
    pub fn with_parent(mut self, parent: Arc<PropertyContainer>) -> Self {
        self.inner.parent = Some(parent);
        self
    }

    /// Detaches the parent.
    pub fn without_parent(mut self) -> Self {
        self.inner.parent = None;
        self
    }

    /// Attaches metadata to the container.
    pub fn metadata<M: Metadata>(mut self, value: M) -> Self {
        self.inner.metadata.set(value);
        self
    }

    /// Produces the container.
    #[must_use]
    pub fn build(self) -> PropertyContainer {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Description;

    #[test]
    fn from_values_last_write_wins_first_position() {
        let a = Property::<i32>::new("A");
        let b = Property::<i32>::new("B");
        let container = PropertyContainer::from_values([
            PropertyValue::defined(&a, 1),
            PropertyValue::defined(&b, 2),
            PropertyValue::defined(&a, 3),
        ]);

        assert_eq!(container.len(), 2);
        let names: Vec<_> = container.properties().map(UntypedProperty::name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(container.get_local(&a), Some(&3));
    }

    #[test]
    fn builder_round_trip_does_not_touch_original() {
        let a = Property::<i32>::new("A");
        let original = PropertyContainer::builder().set(&a, 1).build();
        let changed = original.to_builder().set(&a, 2).build();

        assert_eq!(original.get_local(&a), Some(&1));
        assert_eq!(changed.get_local(&a), Some(&2));
    }

    #[test]
    fn remove_and_contains() {
        let a = Property::<i32>::new("A");
        let container = PropertyContainer::builder()
            .set(&a, 1)
            .remove(a.untyped())
            .build();
        assert!(!container.contains(a.untyped()));
        assert!(container.is_empty());
    }

    #[test]
    fn find_uses_comparer() {
        let stored = Property::<i32>::new("Age");
        let query = Property::<i32>::new("AGE");
        let container = PropertyContainer::builder().set(&stored, 4).build();

        assert!(container.find(query.untyped(), PropertyComparer::ByReference).is_none());
        let found = container
            .find(query.untyped(), PropertyComparer::ByNameOrAliasIgnoreCase)
            .unwrap();
        assert_eq!(found.downcast_ref::<i32>(), Some(&4));
        assert_eq!(found.provenance(), Provenance::Defined);
    }

    #[test]
    fn ancestry_walks_parents() {
        let root = Arc::new(PropertyContainer::new());
        let mid = Arc::new(PropertyContainer::builder().with_parent(root).build());
        let leaf = PropertyContainer::builder().with_parent(mid).build();
        assert_eq!(leaf.ancestry().count(), 3);
    }

    #[test]
    fn not_defined_holds_zero() {
        let name = Property::<String>::new("Name");
        let value = PropertyValue::not_defined(name.untyped().clone());
        assert!(!value.has_value());
        assert_eq!(value.downcast_ref::<String>(), Some(&String::new()));
    }

    #[test]
    fn typed_get_uses_defaults() {
        let a = Property::<i32>::builder("A").default_value(3).build().unwrap();
        let b = Property::<i32>::new("B");
        let container = PropertyContainer::new();
        assert_eq!(container.get(&a).unwrap(), Some(3));
        assert_eq!(container.get(&b).unwrap(), None);
    }

    #[test]
    fn container_metadata() {
        let container = PropertyContainer::builder()
            .metadata(Description::new("request"))
            .build();
        assert!(container.metadata().contains::<Description>());
    }
}
