// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-keyed metadata side-tables.
//!
//! Every property, container, and schema owns a [`MetadataStore`]: a small
//! ordered map from a metadata type (and an optional name) to one value of that
//! type. Metadata is read through typed accessors that downcast once at the
//! boundary; the raw entries are only exposed read-only, in attachment order,
//! for consumers such as the validation synthesizer.
//!
//! [`HasMetadata::component`] adds component retrieval on top: the object
//! itself, then its own metadata, then the metadata of a referenced
//! sub-schema ([`SchemaRef`]).

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::{ResolveError, SchemaError};
use crate::resolve::Resolver;
use crate::schema::Schema;
use crate::value::ErasedValue;
use crate::value_type::ValueType;

/// A value that can be attached to a [`MetadataStore`].
///
/// `check` runs when the metadata is attached to a property and lets a
/// metadata kind reject property types it cannot describe. The default
/// accepts every type.
pub trait Metadata: Clone + Send + Sync + 'static {
    /// Verifies that this metadata may be attached to `property` of type `value_type`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the property and type when the
    /// combination is invalid.
    fn check(&self, property: &str, value_type: &ValueType) -> Result<(), SchemaError> {
        let _ = (property, value_type);
        Ok(())
    }
}

/// One metadata value inside a [`MetadataStore`].
#[derive(Clone)]
pub struct MetadataEntry {
    type_id: TypeId,
    name: Option<String>,
    value: ErasedValue,
}

impl MetadataEntry {
    /// Returns the [`TypeId`] of the metadata type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the Rust type name of the metadata type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    /// Returns the entry name, if the metadata was attached by name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` if the entry holds an `M`.
    #[must_use]
    #[inline]
    pub fn is<M: Metadata>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// Returns the entry value if it is an `M`.
    #[must_use]
    pub fn downcast_ref<M: Metadata>(&self) -> Option<&M> {
        self.value.downcast_ref()
    }

    fn matches(&self, type_id: TypeId, name: Option<&str>) -> bool {
        self.type_id == type_id && self.name.as_deref() == name
    }
}

impl fmt::Debug for MetadataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataEntry")
            .field("type", &self.type_name())
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An ordered, type-keyed side-table of metadata values.
///
/// At most one value is stored per `(type, name)` key. Setting an existing key
/// replaces the value in place and keeps its position; use
/// [`configure`](Self::configure) for read-modify-write.
///
/// # Example
///
/// ```rust
/// use understory_schema::{Description, MetadataStore};
///
/// let mut store = MetadataStore::new();
/// store.set(Description::new("first"));
/// store.set(Description::new("second"));
/// store.set_named("short", Description::new("2nd"));
///
/// assert_eq!(store.len(), 2);
/// assert_eq!(store.get::<Description>().map(Description::text), Some("second"));
/// assert_eq!(
///     store.get_named::<Description>("short").map(Description::text),
///     Some("2nd")
/// );
/// ```
#[derive(Clone, Default)]
pub struct MetadataStore {
    entries: Vec<MetadataEntry>,
}

impl MetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no metadata is attached.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attaches unnamed metadata, returning the value it replaced.
    pub fn set<M: Metadata>(&mut self, value: M) -> Option<M> {
        self.insert(None, value)
    }

    /// Attaches metadata under `name`, returning the value it replaced.
    pub fn set_named<M: Metadata>(&mut self, name: impl Into<String>, value: M) -> Option<M> {
        self.insert(Some(name.into()), value)
    }

    fn insert<M: Metadata>(&mut self, name: Option<String>, value: M) -> Option<M> {
        let type_id = TypeId::of::<M>();
        let value = ErasedValue::new(value);
        match self.position(type_id, name.as_deref()) {
            Some(index) => {
                let old = core::mem::replace(&mut self.entries[index].value, value);
                old.take()
            }
            None => {
                self.entries.push(MetadataEntry {
                    type_id,
                    name,
                    value,
                });
                None
            }
        }
    }

    /// Returns the unnamed metadata of type `M`.
    #[must_use]
    pub fn get<M: Metadata>(&self) -> Option<&M> {
        self.lookup(None)
    }

    /// Returns the metadata of type `M` attached under `name`.
    #[must_use]
    pub fn get_named<M: Metadata>(&self, name: &str) -> Option<&M> {
        self.lookup(Some(name))
    }

    fn lookup<M: Metadata>(&self, name: Option<&str>) -> Option<&M> {
        self.position(TypeId::of::<M>(), name)
            .and_then(|index| self.entries[index].downcast_ref())
    }

    /// Returns `true` if unnamed metadata of type `M` is attached.
    #[must_use]
    pub fn contains<M: Metadata>(&self) -> bool {
        self.position(TypeId::of::<M>(), None).is_some()
    }

    /// Detaches the unnamed metadata of type `M`.
    pub fn remove<M: Metadata>(&mut self) -> Option<M> {
        let index = self.position(TypeId::of::<M>(), None)?;
        self.entries.remove(index).value.take()
    }

    /// Read-modify-write on the unnamed metadata of type `M`.
    ///
    /// Starts from [`Default`] when nothing is attached yet.
    pub fn configure<M: Metadata + Default>(&mut self, f: impl FnOnce(&mut M)) {
        let mut value = self.get::<M>().cloned().unwrap_or_default();
        f(&mut value);
        self.set(value);
    }

    /// Returns all entries in attachment order.
    pub fn entries(&self) -> impl Iterator<Item = &MetadataEntry> + '_ {
        self.entries.iter()
    }

    /// Returns all values of type `M`, named or not, in attachment order.
    pub fn all<M: Metadata>(&self) -> impl Iterator<Item = &M> + '_ {
        self.entries.iter().filter_map(MetadataEntry::downcast_ref)
    }

    fn position(&self, type_id: TypeId, name: Option<&str>) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.matches(type_id, name))
    }
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

/// An object that owns a [`MetadataStore`].
pub trait HasMetadata: Any {
    /// Returns the metadata attached to this object.
    fn metadata(&self) -> &MetadataStore;

    /// Retrieves a component of type `M`.
    ///
    /// Looks at the object itself first, then its own metadata, then the
    /// components of the sub-schema referenced by a [`SchemaRef`] entry.
    fn component<M: Metadata>(&self) -> Option<&M>
    where
        Self: Sized,
    {
        if let Some(this) = (self as &dyn Any).downcast_ref::<M>() {
            return Some(this);
        }
        if let Some(found) = self.metadata().get::<M>() {
            return Some(found);
        }
        self.metadata()
            .get::<SchemaRef>()
            .and_then(|reference| reference.schema().component::<M>())
    }
}

/// A human-readable description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Description(String);

impl Description {
    /// Creates a description.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the description text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }
}

impl Metadata for Description {}

/// The declared default value of a property.
///
/// Used by the resolver when no value is set, inherited, or calculated.
#[derive(Clone, Debug)]
pub struct DefaultValue(ErasedValue);

impl DefaultValue {
    /// Creates a default value.
    #[must_use]
    pub fn new<T: Clone + Send + Sync + 'static>(value: T) -> Self {
        Self(ErasedValue::new(value))
    }

    /// Creates a default value from an already erased value.
    #[must_use]
    pub fn from_erased(value: ErasedValue) -> Self {
        Self(value)
    }

    /// Returns the erased value.
    #[must_use]
    pub fn value(&self) -> &ErasedValue {
        &self.0
    }
}

impl Metadata for DefaultValue {
    fn check(&self, property: &str, value_type: &ValueType) -> Result<(), SchemaError> {
        if self.0.type_id() == value_type.type_id() {
            Ok(())
        } else {
            Err(SchemaError::DefaultValueType {
                property: property.to_owned(),
                type_name: value_type.short_name(),
                found: self.0.type_name().to_owned(),
            })
        }
    }
}

type CalculateFn = dyn Fn(&Resolver<'_>) -> Result<ErasedValue, ResolveError> + Send + Sync;

/// A computed-value function.
///
/// The function receives a [`Resolver`] over the container being queried, so
/// it can read any other property of that container. Results are not
/// memoized.
#[derive(Clone)]
pub struct Calculator(Arc<CalculateFn>);

impl Calculator {
    /// Wraps a function returning an erased value.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Resolver<'_>) -> Result<ErasedValue, ResolveError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the calculation.
    ///
    /// # Errors
    ///
    /// Propagates errors from nested resolution, such as dependency cycles.
    pub fn calculate(&self, resolver: &Resolver<'_>) -> Result<ErasedValue, ResolveError> {
        (self.0)(resolver)
    }
}

impl fmt::Debug for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculator").finish_non_exhaustive()
    }
}

impl Metadata for Calculator {}

/// A reference to a nested schema describing the property's value.
///
/// Components missing on the property are looked up on the referenced schema.
#[derive(Clone, Debug)]
pub struct SchemaRef(Schema);

impl SchemaRef {
    /// Creates a reference to `schema`.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self(schema)
    }

    /// Returns the referenced schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.0
    }
}

impl Metadata for SchemaRef {}
