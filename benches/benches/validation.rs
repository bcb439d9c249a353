// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_validation`.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use understory_schema::{NumericInterval, Property, PropertyContainer, Schema, StringLength};
use understory_validation::{PropertyRules, RuleExt, ValidationSynthesizer, Validator};

fn bench_validation(c: &mut Criterion) {
    let name = Property::<String>::builder("Name")
        .nullable(false)
        .length(StringLength::between(1, 64))
        .build()
        .unwrap();
    let age = Property::<i32>::builder("Age")
        .interval(NumericInterval::new().min(0.0).max_exclusive(150.0))
        .build()
        .unwrap();
    let person = Schema::builder("Person")
        .property(&name)
        .property(&age)
        .build()
        .unwrap();
    let record = PropertyContainer::builder()
        .set(&name, "Ada".to_owned())
        .set(&age, 36)
        .build();

    let validator = Validator::new();
    let synthesizer = ValidationSynthesizer::new();
    let rules = synthesizer.rules_for_schema(&person);

    let mut group = c.benchmark_group("validation");

    group.bench_function("synthesize_schema", |b| {
        b.iter(|| black_box(synthesizer.rules_for_schema(&person)));
    });

    group.bench_function("validate_prebuilt", |b| {
        b.iter(|| black_box(validator.validate(&record, &rules)));
    });

    group.bench_function("validate_schema", |b| {
        b.iter(|| black_box(validator.validate_schema(&record, &person, &synthesizer)));
    });

    let composite = age
        .not_default()
        .and(age.should_be(|a| *a > 18))
        .unwrap()
        .or(name.should_be(|n| n.starts_with('A')));
    group.bench_function("composite", |b| {
        b.iter(|| black_box(validator.validate_rule(&record, &composite)));
    });

    group.finish();
}

criterion_group!(benches, bench_validation);
criterion_main!(benches);
