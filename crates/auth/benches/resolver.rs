use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use grantflow_auth::{
    Action, DependencyResolver, GrantSet, GrantSnapshot, Module, PrincipalId, authorize,
    all_capabilities,
};

fn snapshot(grants: GrantSet) -> GrantSnapshot {
    GrantSnapshot {
        principal_id: PrincipalId::new(),
        grants,
        version: 1,
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let resolver = DependencyResolver::new();
    let mut group = c.benchmark_group("resolver_evaluate");

    for (name, grants) in [("empty", GrantSet::provisioned()), ("full", GrantSet::full())] {
        let snap = snapshot(grants);
        group.bench_with_input(BenchmarkId::new("stock_create", name), &snap, |b, snap| {
            b.iter(|| {
                resolver
                    .evaluate(black_box(snap), Module::Stock, Action::Create, true)
                    .ok()
            })
        });
        group.bench_with_input(BenchmarkId::new("purchases_toggle", name), &snap, |b, snap| {
            b.iter(|| {
                resolver
                    .evaluate_module(black_box(snap), Module::Purchases, true)
                    .ok()
            })
        });
    }

    group.finish();
}

fn bench_authorize(c: &mut Criterion) {
    let grants = GrantSet::full();
    let caps: Vec<_> = all_capabilities().collect();
    c.bench_function("authorize_all_capabilities", |b| {
        b.iter(|| {
            caps.iter()
                .filter(|cap| authorize(black_box(&grants), **cap))
                .count()
        })
    });
}

criterion_group!(benches, bench_evaluate, bench_authorize);
criterion_main!(benches);
