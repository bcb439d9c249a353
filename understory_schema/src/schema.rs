// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named property sets.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::SchemaError;
use crate::metadata::{HasMetadata, Metadata, MetadataStore};
use crate::property::UntypedProperty;

struct SchemaData {
    name: String,
    properties: Vec<UntypedProperty>,
    /// Lowercased names and aliases to property index.
    by_name: HashMap<String, usize>,
    metadata: MetadataStore,
}

/// An ordered, immutable set of properties with its own metadata.
///
/// Property names and aliases are unique within a schema, ignoring case.
/// Cloning is cheap.
///
/// # Example
///
/// ```rust
/// use understory_schema::{Property, Schema};
///
/// let name = Property::<String>::new("Name");
/// let age = Property::<i32>::builder("Age").alias("years").build().unwrap();
///
/// let person = Schema::builder("Person")
///     .property(&name)
///     .property(&age)
///     .build()
///     .unwrap();
///
/// assert_eq!(person.len(), 2);
/// assert_eq!(person.find("YEARS"), Some(age.untyped()));
/// assert!(person.find("Height").is_none());
/// ```
#[derive(Clone)]
pub struct Schema(Arc<SchemaData>);

impl Schema {
    /// Starts building a schema.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Returns the schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.properties.len()
    }

    /// Returns `true` if the schema declares no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.properties.is_empty()
    }

    /// Returns the properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &UntypedProperty> + '_ {
        self.0.properties.iter()
    }

    /// Finds a property by name or alias, ignoring case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&UntypedProperty> {
        self.0
            .by_name
            .get(&name.to_lowercase())
            .map(|&index| &self.0.properties[index])
    }

    /// Returns `true` if the schema declares `property` (by reference).
    #[must_use]
    pub fn contains(&self, property: &UntypedProperty) -> bool {
        self.0.properties.contains(property)
    }
}

impl HasMetadata for Schema {
    fn metadata(&self) -> &MetadataStore {
        &self.0.metadata
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.0.name)
            .field(
                "properties",
                &self.0.properties.iter().map(UntypedProperty::name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Schema`].
///
/// Properties keep the order in which they are added.
#[must_use = "call `build` to produce a schema"]
pub struct SchemaBuilder {
    name: String,
    properties: Vec<UntypedProperty>,
    metadata: MetadataStore,
}

impl SchemaBuilder {
    /// Starts a schema named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            metadata: MetadataStore::new(),
        }
    }

    /// Adds a property.
    pub fn property(mut self, property: impl AsRef<UntypedProperty>) -> Self {
        self.properties.push(property.as_ref().clone());
        self
    }

    /// Adds several properties.
    pub fn properties<P: AsRef<UntypedProperty>>(
        mut self,
        properties: impl IntoIterator<Item = P>,
    ) -> Self {
        self.properties
            .extend(properties.into_iter().map(|p| p.as_ref().clone()));
        self
    }

    /// Attaches metadata to the schema itself.
    pub fn metadata<M: Metadata>(mut self, value: M) -> Self {
        self.metadata.set(value);
        self
    }

    /// Produces the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateProperty`] if two properties share a
    /// name or alias, ignoring case.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut by_name = HashMap::with_capacity(self.properties.len());
        for (index, property) in self.properties.iter().enumerate() {
            for name in property.names() {
                if by_name
                    .insert(name.to_lowercase(), index)
                    .is_some_and(|previous| previous != index)
                {
                    return Err(SchemaError::DuplicateProperty {
                        schema: self.name,
                        property: name.to_owned(),
                    });
                }
            }
        }
        Ok(Schema(Arc::new(SchemaData {
            name: self.name,
            properties: self.properties,
            by_name,
            metadata: self.metadata,
        })))
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("name", &self.name)
            .field("len", &self.properties.len())
            .finish_non_exhaustive()
    }
}
