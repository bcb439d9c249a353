// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Schema: typed properties, metadata, and value resolution.
//!
//! This crate is the data model that rule resolution (`understory_rules`) and
//! validation (`understory_validation`) are built on.
//!
//! ## Core Concepts
//!
//! ### Properties
//!
//! A [`Property<T>`] is an immutable identity: a name, an optional alias, a
//! declared type `T`, and a [`MetadataStore`]. Properties are compared by
//! reference identity by default; [`PropertyComparer`] offers name-and-type
//! and name-or-alias (case-insensitive) policies for the places that need
//! them.
//!
//! ### Metadata
//!
//! Metadata is any `Clone + Send + Sync` type implementing [`Metadata`],
//! stored at most once per `(type, name)` key. The built-in vocabulary covers
//! descriptions, defaults, calculated values, nested schemas, and declarative
//! constraints ([`Nullability`], [`StringLength`], [`AllowedValues`],
//! [`NumericInterval`]). Constraints check the property type when they are
//! attached, so misconfiguration fails at declaration time.
//!
//! ### Containers and Resolution
//!
//! A [`PropertyContainer`] holds [`PropertyValue`]s in insertion order, each
//! tagged with a [`Provenance`]. [`resolve`] finds the effective value of a
//! property given [`SearchOptions`]: local, then parent, then calculated, then
//! default, then a `NotDefined` zero value.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_schema::{
//!     NumericInterval, Property, PropertyContainer, Provenance, Resolver, SearchOptions,
//! };
//!
//! let age = Property::<i32>::builder("Age")
//!     .default_value(18)
//!     .interval(NumericInterval::new().min(0.0))
//!     .build()
//!     .unwrap();
//! let age2 = age.clone();
//! let next_year = Property::<i32>::builder("NextYear")
//!     .calculated(move |r| Ok(r.value(&age2)? + 1))
//!     .build()
//!     .unwrap();
//!
//! let record = PropertyContainer::builder().set(&age, 9).build();
//! let resolver = Resolver::new(&record, SearchOptions::DEFAULT);
//!
//! assert_eq!(resolver.value(&age).unwrap(), 9);
//! assert_eq!(resolver.value(&next_year).unwrap(), 10);
//!
//! let empty = PropertyContainer::new();
//! let value = Resolver::new(&empty, SearchOptions::DEFAULT)
//!     .resolve(&age)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(value.provenance(), Provenance::DefaultValue);
//! ```
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`Provenance`], [`SearchOptions`],
//!   [`PropertyComparer`], and the plain constraint types.

mod comparer;
mod constraint;
mod container;
mod error;
mod format;
mod id;
mod metadata;
mod property;
mod resolve;
mod schema;
mod value;
mod value_type;

pub use comparer::PropertyComparer;
pub use constraint::{AllowedValues, Nullability, NumericInterval, StringLength};
pub use container::{ContainerBuilder, PropertyContainer, PropertyValue, Provenance};
pub use error::{ParseError, ResolveError, SchemaError};
pub use format::{DefaultFormatter, ValueFormatter};
pub use id::PropertyId;
pub use metadata::{
    Calculator, DefaultValue, Description, HasMetadata, Metadata, MetadataEntry, MetadataStore,
    SchemaRef,
};
pub use property::{Property, PropertyBuilder, UntypedProperty};
pub use resolve::{Resolver, SearchOptions, resolve};
pub use schema::{Schema, SchemaBuilder};
pub use value::ErasedValue;
pub use value_type::{
    CollectionKind, EnumKind, EnumType, NullableKind, NumberKind, PropertyType, TextKind,
    ValueKind, ValueType, eq_ignore_case,
};
