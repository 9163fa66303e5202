//! Evaluation benchmark
//!
//! Target: <10μs against 1000 rules

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fence_common::{DecisionStats, Direction, ZoneType};
use fence_policy::{PolicyEngine, Rule, RuleStore, ZoneRegistry};
use std::sync::Arc;

fn engine_with_rules(count: u32) -> PolicyEngine {
    let zones = Arc::new(ZoneRegistry::new());
    let rules = Arc::new(RuleStore::new());
    zones.create("llm", ZoneType::Llm).unwrap();
    zones.set_acl("llm", Direction::Input, 0xFFFF_FFFF).unwrap();
    for number in 1..=count {
        rules
            .add(
                Rule::block(0x01, number, Direction::Input, ZoneType::Llm)
                    .with_pattern(format!("attack-vector-{}", number)),
            )
            .unwrap();
    }
    PolicyEngine::new(zones, rules, Arc::new(DecisionStats::new()))
}

fn evaluation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");

    let engine = engine_with_rules(100);

    // First rule fires immediately
    group.bench_function("hit_first", |b| {
        let hit = engine_with_rules(100);
        b.iter(|| {
            black_box(hit.check(
                black_box("llm"),
                Direction::Input,
                black_box("attack-vector-1 in the payload"),
            ))
        })
    });

    // Every pattern misses, full bucket walk plus default verdict
    group.bench_function("miss_all", |b| {
        b.iter(|| {
            black_box(engine.check(
                black_box("llm"),
                Direction::Input,
                black_box("a perfectly ordinary prompt"),
            ))
        })
    });

    // Unknown zone short-circuits before any rule work
    group.bench_function("unknown_zone", |b| {
        b.iter(|| {
            black_box(engine.check(
                black_box("ghost"),
                Direction::Input,
                black_box("a perfectly ordinary prompt"),
            ))
        })
    });

    group.finish();
}

fn scaling_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_scaling");

    for size in [10u32, 100, 1000].iter() {
        let engine = engine_with_rules(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(engine.evaluate(
                    black_box("llm"),
                    Direction::Input,
                    black_box("a perfectly ordinary prompt"),
                ))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, evaluation_benchmark, scaling_benchmark);
criterion_main!(benches);
