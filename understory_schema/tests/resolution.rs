// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for value resolution in `understory_schema`.
//!
//! These exercise the resolution priority (local, parent, calculated,
//! default, not-defined) and how each [`SearchOptions`] flag gates a step.

use std::sync::Arc;

use proptest::prelude::*;
use understory_schema::{
    Property, PropertyComparer, PropertyContainer, PropertyValue, Provenance, Resolver,
    SearchOptions, resolve,
};

fn options_strategy() -> impl Strategy<Value = SearchOptions> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(parent, calculate, default, not_defined)| {
            SearchOptions::EXISTING_ONLY
                .with_search_in_parent(parent)
                .with_calculate_value(calculate)
                .with_use_default_value(default)
                .with_return_not_defined(not_defined)
        },
    )
}

#[test]
fn default_and_not_defined_are_never_confused() {
    let age = Property::<i32>::builder("Age")
        .default_value(0)
        .build()
        .unwrap();
    let empty = PropertyContainer::new();

    let with_default = resolve(&empty, age.untyped(), SearchOptions::DEFAULT)
        .unwrap()
        .unwrap();
    let without_default = resolve(
        &empty,
        age.untyped(),
        SearchOptions::DEFAULT.with_use_default_value(false),
    )
    .unwrap()
    .unwrap();

    // Same payload, different meaning.
    assert_eq!(with_default.downcast_ref::<i32>(), Some(&0));
    assert_eq!(without_default.downcast_ref::<i32>(), Some(&0));
    assert_eq!(with_default.provenance(), Provenance::DefaultValue);
    assert_eq!(without_default.provenance(), Provenance::NotDefined);
    assert!(with_default.has_value());
    assert!(!without_default.has_value());
}

#[test]
fn parent_value_beats_calculation_and_default() {
    let n = Property::<i32>::builder("N")
        .calculated(|_| Ok(2))
        .default_value(3)
        .build()
        .unwrap();
    let parent = Arc::new(PropertyContainer::builder().set(&n, 1).build());
    let child = PropertyContainer::builder().with_parent(parent).build();

    let resolver = Resolver::new(&child, SearchOptions::DEFAULT);
    assert_eq!(resolver.value(&n).unwrap(), 1);

    let resolver = Resolver::new(&child, SearchOptions::DEFAULT.with_search_in_parent(false));
    assert_eq!(resolver.value(&n).unwrap(), 2);
}

#[test]
fn calculation_reads_the_queried_container() {
    let base = Property::<i32>::new("Base");
    let b = base.clone();
    let doubled = Property::<i32>::builder("Doubled")
        .calculated(move |r| Ok(r.value(&b)? * 2))
        .build()
        .unwrap();

    // `Doubled` is not set anywhere; `Base` is set on the child only.
    let parent = Arc::new(PropertyContainer::builder().set(&base, 100).build());
    let child = PropertyContainer::builder()
        .set(&base, 4)
        .with_parent(parent)
        .build();

    let value = resolve(&child, doubled.untyped(), SearchOptions::DEFAULT)
        .unwrap()
        .unwrap();
    assert_eq!(value.provenance(), Provenance::Calculated);
    assert_eq!(value.downcast_ref::<i32>(), Some(&8));
}

#[test]
fn comparer_controls_matching() {
    let stored = Property::<String>::builder("Email")
        .alias("mail")
        .build()
        .unwrap();
    let query = Property::<String>::new("MAIL");
    let container = PropertyContainer::builder()
        .set(&stored, "a@b.c".into())
        .build();

    let by_reference = SearchOptions::EXISTING_ONLY;
    assert!(resolve(&container, query.untyped(), by_reference).unwrap().is_none());

    let by_alias = by_reference.with_property_comparer(PropertyComparer::ByNameOrAliasIgnoreCase);
    let found = resolve(&container, query.untyped(), by_alias)
        .unwrap()
        .unwrap();
    assert_eq!(found.property(), stored.untyped());
}

#[test]
fn two_step_cycle_reports_path() {
    let slot: Arc<std::sync::OnceLock<Property<i32>>> = Arc::default();
    let to_b = Arc::clone(&slot);
    let a = Property::<i32>::builder("A")
        .calculated(move |r| match to_b.get() {
            Some(b) => r.value(b),
            None => Ok(0),
        })
        .build()
        .unwrap();
    let to_a = a.clone();
    let b = Property::<i32>::builder("B")
        .calculated(move |r| r.value(&to_a))
        .build()
        .unwrap();
    slot.set(b).unwrap();

    let err = resolve(&PropertyContainer::new(), a.untyped(), SearchOptions::DEFAULT).unwrap_err();
    assert_eq!(
        err.to_string(),
        "calculated property 'A' depends on itself (A -> B -> A)"
    );
}

proptest! {
    /// All options off: the local value if present, otherwise nothing.
    #[test]
    fn existing_only_sees_only_locals(
        local in proptest::option::of(any::<i32>()),
        inherited in any::<i32>(),
        default in any::<i32>(),
    ) {
        let p = Property::<i32>::builder("P").default_value(default).build().unwrap();
        let parent = Arc::new(PropertyContainer::builder().set(&p, inherited).build());
        let mut builder = PropertyContainer::builder().with_parent(parent);
        if let Some(local) = local {
            builder = builder.set(&p, local);
        }
        let container = builder.build();

        let resolved = resolve(&container, p.untyped(), SearchOptions::EXISTING_ONLY).unwrap();
        let found = resolved.as_ref().and_then(PropertyValue::downcast_ref::<i32>).copied();
        prop_assert_eq!(found, local);
    }

    /// A local value always wins, whatever the options.
    #[test]
    fn local_value_always_wins(value in any::<i32>(), options in options_strategy()) {
        let p = Property::<i32>::builder("P")
            .default_value(value.wrapping_add(1))
            .calculated(|_| Ok(-1))
            .build()
            .unwrap();
        let container = PropertyContainer::builder().set(&p, value).build();
        let resolved = resolve(&container, p.untyped(), options).unwrap().unwrap();
        prop_assert_eq!(resolved.provenance(), Provenance::Defined);
        prop_assert_eq!(resolved.downcast_ref::<i32>(), Some(&value));
    }

    /// With nothing set anywhere, the provenance follows the first enabled fallback.
    #[test]
    fn fallback_provenance_follows_options(options in options_strategy()) {
        let p = Property::<i32>::builder("P")
            .default_value(5)
            .build()
            .unwrap();
        let resolved = resolve(&PropertyContainer::new(), p.untyped(), options).unwrap();
        let expected = if options.use_default_value {
            Some(Provenance::DefaultValue)
        } else if options.return_not_defined {
            Some(Provenance::NotDefined)
        } else {
            None
        };
        prop_assert_eq!(resolved.map(|v| v.provenance()), expected);
    }

    /// Containers keep first-insertion order and last-written values.
    #[test]
    fn container_order_and_last_write(
        writes in proptest::collection::vec((0_usize..4, any::<i32>()), 0..20),
    ) {
        let props: Vec<_> = (0..4).map(|i| Property::<i32>::new(format!("P{i}"))).collect();
        let container = PropertyContainer::from_values(
            writes.iter().map(|&(i, v)| PropertyValue::defined(&props[i], v)),
        );

        let mut expected_order: Vec<usize> = Vec::new();
        for &(i, _) in &writes {
            if !expected_order.contains(&i) {
                expected_order.push(i);
            }
        }
        let order: Vec<_> = container.properties().map(|p| p.name().to_owned()).collect();
        let expected_names: Vec<_> = expected_order.iter().map(|i| format!("P{i}")).collect();
        prop_assert_eq!(order, expected_names);

        for (i, prop) in props.iter().enumerate() {
            let last = writes.iter().rev().find(|&&(j, _)| j == i).map(|&(_, v)| v);
            prop_assert_eq!(container.get_local(prop).copied(), last);
        }
    }
}
