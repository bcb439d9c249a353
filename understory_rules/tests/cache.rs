// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for `RuleCache` reference stability across properties and threads.

use std::sync::Arc;
use std::thread;

use understory_rules::{
    ParserProvider, Rule, RuleCache, RuleProvider, RuleResolver, ValueParser, parse_property,
};
use understory_schema::{Property, PropertyComparer, PropertyType};

fn by_name_cache() -> RuleCache<ParserProvider, dyn ValueParser> {
    let provider = RuleProvider::<dyn ValueParser>::builder()
        .rules(understory_rules::standard_rules())
        .fallbacks(understory_rules::ParserFallbacks)
        .property_comparer(PropertyComparer::ByNameAndType)
        .build();
    RuleCache::new(provider)
}

#[test]
fn synthesized_rules_are_reference_stable() {
    let cache = RuleCache::new(ParserProvider::standard());
    let first = cache.rule_for_type(Vec::<i32>::value_type()).unwrap();
    let second = cache.rule_for_type(Vec::<i32>::value_type()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // The uncached provider synthesizes a fresh parser each time.
    let provider = cache.inner();
    let a = provider.rule_for_type(Vec::<i32>::value_type()).unwrap();
    let b = provider.rule_for_type(Vec::<i32>::value_type()).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn distinct_equal_properties_share_the_cached_rule() {
    let cache = by_name_cache();
    let tags = Property::<Vec<String>>::new("Tags");
    let tags_again = Property::<Vec<String>>::new("Tags");
    let other = Property::<Vec<u8>>::new("Tags");

    let first = cache.rule_for_property(tags.untyped()).unwrap();
    let second = cache.rule_for_property(tags_again.untyped()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let different_type = cache.rule_for_property(other.untyped()).unwrap();
    assert!(!Arc::ptr_eq(&first, &different_type));
    assert_eq!(cache.len(), 2);
}

#[test]
fn cached_property_rules_keep_their_type() {
    let code = Property::<u16>::new("Code");
    let code_text = Property::<String>::new("code");
    let provider = RuleProvider::<dyn ValueParser>::builder()
        .rules(understory_rules::standard_rules())
        .rule(Rule::<dyn ValueParser>::for_property(
            &code,
            Arc::new(understory_rules::FromStrParser::<u16>::new()),
        ))
        .fallbacks(understory_rules::ParserFallbacks)
        .property_comparer(PropertyComparer::ByNameOrAliasIgnoreCase)
        .build();
    let cache = RuleCache::new(provider);

    let number = parse_property(&cache, code.untyped(), Some("7")).unwrap().unwrap();
    assert_eq!(number.downcast_ref::<u16>(), Some(&7));
    let text = parse_property(&cache, code_text.untyped(), Some("A7")).unwrap().unwrap();
    assert_eq!(text.downcast_ref::<String>().map(String::as_str), Some("A7"));
    assert_eq!(cache.len(), 2);
}

#[test]
fn concurrent_lookups_agree_on_one_rule() {
    let cache = by_name_cache();
    let property = Property::<Vec<Option<i32>>>::new("Readings");

    let results: Vec<Arc<dyn ValueParser>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = &cache;
                let property = Property::<Vec<Option<i32>>>::new("Readings");
                scope.spawn(move || cache.rule_for_property(property.untyped()).unwrap())
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let expected = cache.rule_for_property(property.untyped()).unwrap();
    for found in &results {
        assert!(Arc::ptr_eq(found, &expected));
    }
}
