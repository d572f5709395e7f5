//! Statement Planning Performance Benchmarks
//!
//! Benchmarks for the hot path the GUI hits while an operator types:
//! - Identifier grammar validation
//! - Identifier quoting
//! - Strategy selection
//! - Full statement plan construction, single role and batch-sized

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rolesweep::{build_plan, quote_identifier, select_strategy, validate_identifier};
use rolesweep::{DeletionStrategy, RoleAnalysis};

fn bench_validate_identifier(c: &mut Criterion) {
    c.bench_function("validate_plain_name", |b| {
        b.iter(|| validate_identifier(black_box("app_user_42")));
    });

    c.bench_function("validate_dotted_name", |b| {
        b.iter(|| validate_identifier(black_box("ana.silva.backup")));
    });

    c.bench_function("validate_rejected_name", |b| {
        b.iter(|| validate_identifier(black_box("bad;name -- drop")));
    });
}

fn bench_quote_identifier(c: &mut Criterion) {
    c.bench_function("quote_plain_name", |b| {
        b.iter(|| quote_identifier(black_box("ana.silva")));
    });
}

fn bench_select_strategy(c: &mut Criterion) {
    let analysis = RoleAnalysis {
        role_name: "ana.silva".to_string(),
        owns_objects: true,
        has_active_connections: false,
        object_count: 12,
        session_count: 0,
    };

    c.bench_function("select_strategy", |b| {
        b.iter(|| select_strategy(black_box(&analysis)));
    });
}

fn bench_build_plan(c: &mut Criterion) {
    c.bench_function("build_reassign_plan", |b| {
        b.iter(|| {
            let plan = build_plan(
                black_box("ana.silva"),
                black_box(DeletionStrategy::ReassignAndDrop),
                black_box("postgres"),
            );
            assert!(plan.is_ok());
            plan
        });
    });

    let roles: Vec<String> = (0..100).map(|i| format!("app_user_{i}")).collect();
    c.bench_function("build_100_drop_plans", |b| {
        b.iter(|| {
            for role in &roles {
                let plan = build_plan(
                    black_box(role),
                    black_box(DeletionStrategy::DropPermissionsOnly),
                    black_box("postgres"),
                );
                assert!(plan.is_ok());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_validate_identifier,
    bench_quote_identifier,
    bench_select_strategy,
    bench_build_plan
);

criterion_main!(benches);
