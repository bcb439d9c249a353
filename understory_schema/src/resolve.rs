// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effective value resolution.
//!
//! Resolution follows a fixed priority, first match wins:
//!
//! 1. a local value matching under the configured [`PropertyComparer`]
//! 2. a local value on an ancestor (`search_in_parent`)
//! 3. the property's [`Calculator`], run against the queried container (`calculate_value`)
//! 4. the property's [`DefaultValue`] (`use_default_value`)
//! 5. the zero value with [`Provenance::NotDefined`] (`return_not_defined`)
//!
//! Otherwise the result is `Ok(None)`. Calculators may resolve other
//! properties through the [`Resolver`] they receive; a calculation that
//! re-enters itself fails with [`ResolveError::Cycle`] instead of recursing.

use core::cell::RefCell;

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::comparer::PropertyComparer;
use crate::container::{PropertyContainer, PropertyValue, Provenance};
use crate::error::ResolveError;
use crate::metadata::{Calculator, DefaultValue, HasMetadata};
use crate::property::{Property, UntypedProperty};
use crate::value::ErasedValue;
use crate::value_type::PropertyType;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lookup behaviors for [`resolve`].
///
/// ```rust
/// use understory_schema::{PropertyComparer, SearchOptions};
///
/// let options = SearchOptions::EXISTING_ONLY
///     .with_search_in_parent(true)
///     .with_property_comparer(PropertyComparer::ByNameAndType);
/// assert!(options.search_in_parent);
/// assert!(!options.use_default_value);
/// assert_eq!(SearchOptions::default(), SearchOptions::DEFAULT);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SearchOptions {
    /// Walk the parent chain when the property is not set locally.
    pub search_in_parent: bool,
    /// Run the property's calculator when no value is set.
    pub calculate_value: bool,
    /// Fall back to the property's declared default.
    pub use_default_value: bool,
    /// Return a [`Provenance::NotDefined`] value instead of `None`.
    pub return_not_defined: bool,
    /// How the queried property is matched against stored ones.
    pub property_comparer: PropertyComparer,
}

impl SearchOptions {
    /// Every behavior enabled, matching by reference.
    pub const DEFAULT: Self = Self {
        search_in_parent: true,
        calculate_value: true,
        use_default_value: true,
        return_not_defined: true,
        property_comparer: PropertyComparer::ByReference,
    };

    /// Only local values, matching by reference.
    pub const EXISTING_ONLY: Self = Self {
        search_in_parent: false,
        calculate_value: false,
        use_default_value: false,
        return_not_defined: false,
        property_comparer: PropertyComparer::ByReference,
    };

    /// Sets [`search_in_parent`](Self::search_in_parent).
    #[must_use]
    pub const fn with_search_in_parent(mut self, value: bool) -> Self {
        self.search_in_parent = value;
        self
    }

    /// Sets [`calculate_value`](Self::calculate_value).
    #[must_use]
    pub const fn with_calculate_value(mut self, value: bool) -> Self {
        self.calculate_value = value;
        self
    }

    /// Sets [`use_default_value`](Self::use_default_value).
    #[must_use]
    pub const fn with_use_default_value(mut self, value: bool) -> Self {
        self.use_default_value = value;
        self
    }

    /// Sets [`return_not_defined`](Self::return_not_defined).
    #[must_use]
    pub const fn with_return_not_defined(mut self, value: bool) -> Self {
        self.return_not_defined = value;
        self
    }

    /// Sets [`property_comparer`](Self::property_comparer).
    #[must_use]
    pub const fn with_property_comparer(mut self, comparer: PropertyComparer) -> Self {
        self.property_comparer = comparer;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Resolves `property` in `container`.
///
/// # Errors
///
/// Returns [`ResolveError::Cycle`] if a calculated property depends on itself.
///
/// # Example
///
/// ```rust
/// use understory_schema::{resolve, Property, PropertyContainer, Provenance, SearchOptions};
///
/// let age = Property::<i32>::builder("Age").default_value(18).build().unwrap();
/// let empty = PropertyContainer::new();
///
/// let value = resolve(&empty, age.untyped(), SearchOptions::DEFAULT).unwrap().unwrap();
/// assert_eq!(value.provenance(), Provenance::DefaultValue);
/// assert_eq!(value.downcast_ref::<i32>(), Some(&18));
///
/// let options = SearchOptions::DEFAULT.with_use_default_value(false);
/// let value = resolve(&empty, age.untyped(), options).unwrap().unwrap();
/// assert_eq!(value.provenance(), Provenance::NotDefined);
/// assert_eq!(value.downcast_ref::<i32>(), Some(&0));
///
/// assert!(resolve(&empty, age.untyped(), SearchOptions::EXISTING_ONLY).unwrap().is_none());
/// ```
pub fn resolve(
    container: &PropertyContainer,
    property: &UntypedProperty,
    options: SearchOptions,
) -> Result<Option<PropertyValue>, ResolveError> {
    Resolver::new(container, options).resolve(property)
}

/// A resolution session over one container.
///
/// Calculators receive the resolver of the query that triggered them, which
/// lets them read sibling properties while the resolver tracks the chain of
/// calculations in progress.
pub struct Resolver<'a> {
    container: &'a PropertyContainer,
    options: SearchOptions,
    calculating: RefCell<SmallVec<[UntypedProperty; 4]>>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `container`.
    #[must_use]
    pub fn new(container: &'a PropertyContainer, options: SearchOptions) -> Self {
        Self {
            container,
            options,
            calculating: RefCell::new(SmallVec::new()),
        }
    }

    /// Returns the queried container.
    #[must_use]
    #[inline]
    pub fn container(&self) -> &'a PropertyContainer {
        self.container
    }

    /// Returns the active options.
    #[must_use]
    #[inline]
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Resolves a property.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Cycle`] if a calculated property depends on itself.
    pub fn resolve(
        &self,
        property: impl AsRef<UntypedProperty>,
    ) -> Result<Option<PropertyValue>, ResolveError> {
        let property = property.as_ref();
        let options = self.options;

        if let Some(found) = self.container.find(property, options.property_comparer) {
            return Ok(Some(found.clone()));
        }

        if options.search_in_parent {
            let inherited = self
                .container
                .ancestry()
                .skip(1)
                .find_map(|ancestor| ancestor.find(property, options.property_comparer));
            if let Some(found) = inherited {
                trace!(property = property.name(), "resolved from parent");
                return Ok(Some(found.clone()));
            }
        }

        if options.calculate_value
            && let Some(calculator) = property.metadata().get::<Calculator>()
        {
            let value = self.calculate(property, calculator)?;
            return Ok(Some(PropertyValue::new(
                property.clone(),
                value,
                Provenance::Calculated,
            )));
        }

        if options.use_default_value
            && let Some(default) = property.metadata().get::<DefaultValue>()
        {
            return Ok(Some(PropertyValue::new(
                property.clone(),
                default.value().clone(),
                Provenance::DefaultValue,
            )));
        }

        if options.return_not_defined {
            return Ok(Some(PropertyValue::not_defined(property.clone())));
        }

        Ok(None)
    }

    /// Resolves a typed property, returning `None` when no value exists.
    ///
    /// A [`Provenance::NotDefined`] result is reported as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Cycle`] if a calculated property depends on itself.
    pub fn get<T: PropertyType>(&self, property: &Property<T>) -> Result<Option<T>, ResolveError> {
        Ok(self
            .resolve(property)?
            .filter(PropertyValue::has_value)
            .and_then(|value| value.downcast_ref::<T>().cloned()))
    }

    /// Resolves a typed property, returning the zero value when no value exists.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Cycle`] if a calculated property depends on itself.
    pub fn value<T: PropertyType>(&self, property: &Property<T>) -> Result<T, ResolveError> {
        Ok(self.get(property)?.unwrap_or_default())
    }

    fn calculate(
        &self,
        property: &UntypedProperty,
        calculator: &Calculator,
    ) -> Result<ErasedValue, ResolveError> {
        {
            let mut calculating = self.calculating.borrow_mut();
            if calculating.iter().any(|active| active.id() == property.id()) {
                let path: Vec<String> = calculating
                    .iter()
                    .chain(core::iter::once(property))
                    .map(|p| p.name().to_owned())
                    .collect();
                warn!(
                    property = property.name(),
                    path = %path.join(" -> "),
                    "calculated property depends on itself"
                );
                return Err(ResolveError::Cycle {
                    property: property.name().to_owned(),
                    path,
                });
            }
            calculating.push(property.clone());
        }
        trace!(property = property.name(), "calculating value");
        let result = calculator.calculate(self);
        self.calculating.borrow_mut().pop();
        result
    }
}

impl core::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resolver")
            .field("options", &self.options)
            .field("container_len", &self.container.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn local_value_wins() {
        let age = Property::<i32>::builder("Age")
            .default_value(1)
            .build()
            .unwrap();
        let container = PropertyContainer::builder().set(&age, 5).build();
        let value = resolve(&container, age.untyped(), SearchOptions::DEFAULT)
            .unwrap()
            .unwrap();
        assert_eq!(value.provenance(), Provenance::Defined);
        assert_eq!(value.downcast_ref::<i32>(), Some(&5));
    }

    #[test]
    fn parent_lookup_is_optional() {
        let age = Property::<i32>::new("Age");
        let parent = Arc::new(PropertyContainer::builder().set(&age, 40).build());
        let child = PropertyContainer::builder().with_parent(parent).build();

        let found = Resolver::new(&child, SearchOptions::DEFAULT).get(&age).unwrap();
        assert_eq!(found, Some(40));

        let local_only = Resolver::new(&child, SearchOptions::EXISTING_ONLY)
            .get(&age)
            .unwrap();
        assert_eq!(local_only, None);
    }

    #[test]
    fn grandparent_lookup() {
        let age = Property::<i32>::new("Age");
        let root = Arc::new(PropertyContainer::builder().set(&age, 70).build());
        let mid = Arc::new(PropertyContainer::builder().with_parent(root).build());
        let leaf = PropertyContainer::builder().with_parent(mid).build();
        let options = SearchOptions::EXISTING_ONLY.with_search_in_parent(true);
        let resolver = Resolver::new(&leaf, options);
        assert_eq!(resolver.get(&age).unwrap(), Some(70));
    }

    #[test]
    fn calculated_reads_siblings() {
        let first = Property::<String>::new("First");
        let last = Property::<String>::new("Last");
        let (f, l) = (first.clone(), last.clone());
        let full = Property::<String>::builder("Full")
            .calculated(move |r| Ok(format!("{} {}", r.value(&f)?, r.value(&l)?)))
            .build()
            .unwrap();
        let container = PropertyContainer::builder()
            .set(&first, "Ada".into())
            .set(&last, "Lovelace".into())
            .build();

        let value = resolve(&container, full.untyped(), SearchOptions::DEFAULT)
            .unwrap()
            .unwrap();
        assert_eq!(value.provenance(), Provenance::Calculated);
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("Ada Lovelace"));
    }

    #[test]
    fn calculation_is_skipped_when_disabled() {
        let n = Property::<i32>::builder("N")
            .calculated(|_| Ok(3))
            .default_value(7)
            .build()
            .unwrap();
        let container = PropertyContainer::new();
        let options = SearchOptions::DEFAULT.with_calculate_value(false);
        let resolver = Resolver::new(&container, options);
        assert_eq!(resolver.get(&n).unwrap(), Some(7));
    }

    #[test]
    fn self_referencing_calculation_fails_fast() {
        let slot: Arc<std::sync::OnceLock<Property<i32>>> = Arc::default();
        let inner = Arc::clone(&slot);
        let looped = Property::<i32>::builder("Loop")
            .calculated(move |r| match inner.get() {
                Some(me) => Ok(r.value(me)? + 1),
                None => Ok(0),
            })
            .build()
            .unwrap();
        slot.set(looped.clone()).unwrap();

        let container = PropertyContainer::new();
        let err = resolve(&container, looped.untyped(), SearchOptions::DEFAULT).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Cycle {
                property: "Loop".into(),
                path: vec!["Loop".into(), "Loop".into()],
            }
        );
    }

    #[test]
    fn resolver_is_reusable_after_cycle() {
        let slot: Arc<std::sync::OnceLock<Property<i32>>> = Arc::default();
        let inner = Arc::clone(&slot);
        let looped = Property::<i32>::builder("Loop")
            .calculated(move |r| match inner.get() {
                Some(me) => r.value(me),
                None => Ok(0),
            })
            .build()
            .unwrap();
        slot.set(looped.clone()).unwrap();
        let plain = Property::<i32>::builder("Plain")
            .calculated(|_| Ok(2))
            .build()
            .unwrap();

        let container = PropertyContainer::new();
        let resolver = Resolver::new(&container, SearchOptions::DEFAULT);
        assert!(resolver.get(&looped).is_err());
        assert_eq!(resolver.get(&plain).unwrap(), Some(2));
    }

    #[test]
    fn not_defined_versus_absent() {
        let name = Property::<String>::new("Name");
        let container = PropertyContainer::new();

        let not_defined = resolve(&container, name.untyped(), SearchOptions::DEFAULT)
            .unwrap()
            .unwrap();
        assert!(!not_defined.has_value());
        let resolver = Resolver::new(&container, SearchOptions::DEFAULT);
        assert_eq!(resolver.get(&name).unwrap(), None);
        assert_eq!(resolver.value(&name).unwrap(), String::new());
    }
}
