// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for rule lookup and parsing in `understory_rules`.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use understory_rules::{ParserProvider, RuleCache, RuleResolver, parse_property};
use understory_schema::{Property, PropertyType};

fn bench_rules(c: &mut Criterion) {
    let provider = ParserProvider::standard();
    let cache = RuleCache::new(ParserProvider::standard());
    let scores = Property::<Vec<i32>>::new("Scores");

    let mut group = c.benchmark_group("rules/lookup");

    group.bench_function("exact_type/provider", |b| {
        b.iter(|| black_box(provider.rule_for_type(f64::value_type())));
    });

    group.bench_function("collection/provider", |b| {
        b.iter(|| black_box(provider.rule_for_type(Vec::<Option<i32>>::value_type())));
    });

    group.bench_function("collection/cache", |b| {
        b.iter(|| black_box(cache.rule_for_type(Vec::<Option<i32>>::value_type())));
    });

    group.bench_function("property/cache", |b| {
        b.iter(|| black_box(cache.rule_for_property(scores.untyped())));
    });

    group.finish();

    let mut group = c.benchmark_group("rules/parse");

    group.bench_function("int_list", |b| {
        b.iter(|| {
            black_box(parse_property(
                &cache,
                scores.untyped(),
                Some("[1, 2, 3, 4, 5, 6, 7, 8]"),
            ))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rules);
criterion_main!(benches);
