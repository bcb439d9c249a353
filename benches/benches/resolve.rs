// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for value resolution in `understory_schema`.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use understory_schema::{Property, PropertyComparer, PropertyContainer, Resolver, SearchOptions};

fn bench_resolve(c: &mut Criterion) {
    let width = Property::<f64>::builder("Width")
        .default_value(10.0)
        .build()
        .unwrap();
    let width2 = width.clone();
    let area = Property::<f64>::builder("Area")
        .calculated(move |r| Ok(r.value(&width2)? * r.value(&width2)?))
        .build()
        .unwrap();
    let fillers: Vec<Property<i32>> = (0..16)
        .map(|i| Property::new(format!("Filler{i}")))
        .collect();

    let mut group = c.benchmark_group("schema/resolve");

    group.bench_function("local", |b| {
        let record = PropertyContainer::builder().set(&width, 3.0).build();
        let resolver = Resolver::new(&record, SearchOptions::DEFAULT);
        b.iter(|| black_box(resolver.get(&width)));
    });

    group.bench_function("default", |b| {
        let record = PropertyContainer::new();
        let resolver = Resolver::new(&record, SearchOptions::DEFAULT);
        b.iter(|| black_box(resolver.get(&width)));
    });

    group.bench_function("calculated", |b| {
        let record = PropertyContainer::builder().set(&width, 3.0).build();
        let resolver = Resolver::new(&record, SearchOptions::DEFAULT);
        b.iter(|| black_box(resolver.get(&area)));
    });

    for depth in [1_usize, 4, 16] {
        group.bench_function(BenchmarkId::new("parent_chain", depth), |b| {
            let mut record = Arc::new(PropertyContainer::builder().set(&width, 3.0).build());
            for _ in 0..depth {
                record = Arc::new(PropertyContainer::builder().with_parent(record).build());
            }
            let resolver = Resolver::new(&record, SearchOptions::DEFAULT);
            b.iter(|| black_box(resolver.get(&width)));
        });
    }

    for (label, comparer) in [
        ("by_reference", PropertyComparer::ByReference),
        ("by_name_and_type", PropertyComparer::ByNameAndType),
        ("ignore_case", PropertyComparer::ByNameOrAliasIgnoreCase),
    ] {
        group.bench_function(BenchmarkId::new("last_of_17", label), |b| {
            let record = PropertyContainer::builder()
                .extend(
                    fillers
                        .iter()
                        .map(|p| understory_schema::PropertyValue::defined(p, 1)),
                )
                .set(&width, 3.0)
                .build();
            let options = SearchOptions::EXISTING_ONLY.with_property_comparer(comparer);
            let resolver = Resolver::new(&record, options);
            b.iter(|| black_box(resolver.get(&width)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
