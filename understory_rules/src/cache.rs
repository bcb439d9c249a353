// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Memoized rule lookup.

use core::any::TypeId;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::hash_map::Entry;
use hashbrown::hash_table::Entry as TableEntry;
use hashbrown::{DefaultHashBuilder, HashMap, HashTable};
use tracing::debug;
use understory_schema::{PropertyComparer, UntypedProperty, ValueType};

use crate::provider::RuleResolver;

/// Caches the answers of another [`RuleResolver`].
///
/// Type lookups are keyed by type; property lookups are keyed by the inner
/// resolver's [`PropertyComparer`] together with the declared value type, so
/// two distinct property handles of one type that the comparer considers
/// equal share one cached answer. Misses are cached too.
///
/// The cache is safe to share between threads. Lookups compute outside the
/// lock; when two threads race on the same key the first stored answer is kept
/// and returned to both, so repeated lookups always yield the same `Arc`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use understory_rules::{Rule, RuleCache, RuleProvider, RuleResolver};
/// use understory_schema::PropertyType;
///
/// let provider = RuleProvider::<str>::builder()
///     .rule(Rule::for_type::<i32>(Arc::from("int")))
///     .build();
/// let cache = RuleCache::new(provider);
///
/// let first = cache.rule_for_type(i32::value_type()).unwrap();
/// let again = cache.rule_for_type(i32::value_type()).unwrap();
/// assert!(Arc::ptr_eq(&first, &again));
/// ```
pub struct RuleCache<R, H: ?Sized> {
    inner: R,
    comparer: PropertyComparer,
    build_hasher: DefaultHashBuilder,
    by_type: RwLock<HashMap<TypeId, Option<Arc<H>>>>,
    by_property: RwLock<HashTable<(UntypedProperty, Option<Arc<H>>)>>,
}

impl<R: RuleResolver<H>, H: ?Sized> RuleCache<R, H> {
    /// Wraps `inner`, adopting its property comparer.
    pub fn new(inner: R) -> Self {
        let comparer = inner.property_comparer();
        Self {
            inner,
            comparer,
            build_hasher: DefaultHashBuilder::default(),
            by_type: RwLock::new(HashMap::new()),
            by_property: RwLock::new(HashTable::new()),
        }
    }

    /// Returns the wrapped resolver.
    #[must_use]
    #[inline]
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Returns the number of cached answers, misses included.
    #[must_use]
    pub fn len(&self) -> usize {
        let types = self.by_type.read().unwrap_or_else(PoisonError::into_inner).len();
        let properties = self
            .by_property
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        types + properties
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached answer.
    ///
    /// Handlers already handed out stay valid; later lookups may return new
    /// `Arc`s if the inner resolver synthesizes them.
    pub fn clear(&self) {
        self.by_type
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.by_property
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn hash_property(&self, property: &UntypedProperty) -> u64 {
        let mut state = self.build_hasher.build_hasher();
        self.comparer.hash(property, &mut state);
        property.value_type().hash(&mut state);
        state.finish()
    }

    fn same_key(&self, key: &UntypedProperty, property: &UntypedProperty) -> bool {
        key.value_type() == property.value_type() && self.comparer.eq(key, property)
    }
}

impl<R: RuleResolver<H>, H: ?Sized> RuleResolver<H> for RuleCache<R, H> {
    fn rule_for_type(&self, value_type: ValueType) -> Option<Arc<H>> {
        let key = value_type.type_id();
        if let Some(hit) = self
            .by_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
        {
            return hit;
        }

        let computed = self.inner.rule_for_type(value_type);
        let mut by_type = self.by_type.write().unwrap_or_else(PoisonError::into_inner);
        match by_type.entry(key) {
            Entry::Occupied(stored) => {
                debug!(value_type = value_type.name(), "kept earlier cached rule");
                stored.get().clone()
            }
            Entry::Vacant(slot) => slot.insert(computed).clone(),
        }
    }

    fn rule_for_property(&self, property: &UntypedProperty) -> Option<Arc<H>> {
        let hash = self.hash_property(property);
        if let Some(hit) = self
            .by_property
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .find(hash, |(key, _)| self.same_key(key, property))
            .map(|(_, rule)| rule.clone())
        {
            return hit;
        }

        let computed = self.inner.rule_for_property(property);
        let mut by_property = self
            .by_property
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match by_property.entry(
            hash,
            |(key, _)| self.same_key(key, property),
            |(key, _)| self.hash_property(key),
        ) {
            TableEntry::Occupied(stored) => {
                debug!(property = property.name(), "kept earlier cached rule");
                stored.get().1.clone()
            }
            TableEntry::Vacant(slot) => {
                slot.insert((property.clone(), computed)).get().1.clone()
            }
        }
    }

    fn property_comparer(&self) -> PropertyComparer {
        self.comparer
    }
}

impl<R: fmt::Debug, H: ?Sized> fmt::Debug for RuleCache<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self.by_type.read().unwrap_or_else(PoisonError::into_inner).len();
        let properties = self
            .by_property
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("RuleCache")
            .field("inner", &self.inner)
            .field("comparer", &self.comparer)
            .field("cached_types", &types)
            .field("cached_properties", &properties)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rule, RuleProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use understory_schema::{Property, PropertyType};

    /// Counts how often the wrapped provider is consulted.
    #[derive(Debug)]
    struct Counting {
        provider: RuleProvider<str>,
        calls: AtomicUsize,
    }

    impl RuleResolver<str> for Counting {
        fn rule_for_type(&self, value_type: ValueType) -> Option<Arc<str>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.provider.rule_for_type(value_type)
        }

        fn rule_for_property(&self, property: &UntypedProperty) -> Option<Arc<str>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.provider.rule_for_property(property)
        }

        fn property_comparer(&self) -> PropertyComparer {
            self.provider.property_comparer()
        }
    }

    fn counting(comparer: PropertyComparer) -> RuleCache<Counting, str> {
        let provider = RuleProvider::builder()
            .rule(Rule::for_type::<i32>(Arc::<str>::from("int")))
            .property_comparer(comparer)
            .build();
        RuleCache::new(Counting {
            provider,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn hits_do_not_consult_inner() {
        let cache = counting(PropertyComparer::ByReference);
        let age = Property::<i32>::new("Age");
        for _ in 0..3 {
            assert_eq!(cache.rule_for_property(age.untyped()).as_deref(), Some("int"));
            assert!(cache.rule_for_type(bool::value_type()).is_none());
        }
        assert_eq!(cache.inner().calls.load(Ordering::Relaxed), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn equal_properties_share_an_entry() {
        let cache = counting(PropertyComparer::ByNameAndType);
        let a = Property::<i32>::new("Age");
        let b = Property::<i32>::new("Age");
        let first = cache.rule_for_property(a.untyped()).unwrap();
        let second = cache.rule_for_property(b.untyped()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.inner().calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn same_name_of_another_type_is_a_separate_entry() {
        let cache = counting(PropertyComparer::ByNameOrAliasIgnoreCase);
        let number = Property::<i32>::new("Age");
        let text = Property::<String>::new("age");
        assert_eq!(cache.rule_for_property(number.untyped()).as_deref(), Some("int"));
        assert!(cache.rule_for_property(text.untyped()).is_none());
        assert_eq!(cache.inner().calls.load(Ordering::Relaxed), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn by_reference_keeps_instances_apart() {
        let cache = counting(PropertyComparer::ByReference);
        let a = Property::<i32>::new("Age");
        let b = Property::<i32>::new("Age");
        cache.rule_for_property(a.untyped());
        cache.rule_for_property(b.untyped());
        assert_eq!(cache.inner().calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn clear_forgets_answers() {
        let cache = counting(PropertyComparer::ByReference);
        cache.rule_for_type(i32::value_type());
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        cache.rule_for_type(i32::value_type());
        assert_eq!(cache.inner().calls.load(Ordering::Relaxed), 2);
    }
}
