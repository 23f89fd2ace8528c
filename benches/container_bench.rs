//! Benchmarks for the DI container

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use injectgraph::Container;
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct SmallService {
    value: i32,
}

#[allow(dead_code)]
struct MediumService {
    name: String,
    values: Vec<i32>,
    db: Arc<SmallService>,
}

#[allow(dead_code)]
struct LargeService {
    data: Vec<u8>,
    config: std::collections::HashMap<String, String>,
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("provide_small", |b| {
        b.iter(|| {
            let container = Container::new();
            container.provide(|| SmallService { value: 42 }).unwrap();
            black_box(container)
        })
    });

    group.bench_function("provide_medium_with_dependency", |b| {
        b.iter(|| {
            let container = Container::new();
            container.provide(|| SmallService { value: 42 }).unwrap();
            container
                .provide(|db: Arc<SmallService>| MediumService {
                    name: "test".to_string(),
                    values: vec![1, 2, 3, 4, 5],
                    db,
                })
                .unwrap();
            black_box(container)
        })
    });

    group.bench_function("provide_10_independent_services", |b| {
        b.iter(|| {
            let container = Container::new();
            container.provide(|| 0u8).unwrap();
            container.provide(|| 0u16).unwrap();
            container.provide(|| 0u32).unwrap();
            container.provide(|| 0u64).unwrap();
            container.provide(|| 0i8).unwrap();
            container.provide(|| 0i16).unwrap();
            container.provide(|| 0i32).unwrap();
            container.provide(|| 0i64).unwrap();
            container.provide(|| 0f32).unwrap();
            container.provide(|| 0f64).unwrap();
            black_box(container)
        })
    });

    group.finish();
}

fn bench_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke");
    group.throughput(Throughput::Elements(1));

    let container = Container::new();
    container.provide(|| SmallService { value: 42 }).unwrap();
    container
        .provide(|db: Arc<SmallService>| MediumService {
            name: "test".to_string(),
            values: vec![1, 2, 3, 4, 5],
            db,
        })
        .unwrap();

    group.bench_function("invoke_memoized_single", |b| {
        b.iter(|| {
            let service = container.resolve::<SmallService>().unwrap();
            black_box(service)
        })
    });

    group.bench_function("invoke_memoized_with_dependency", |b| {
        b.iter(|| {
            let service = container.resolve::<MediumService>().unwrap();
            black_box(service)
        })
    });

    group.bench_function("invoke_missing", |b| {
        b.iter(|| {
            let result = container.resolve::<LargeService>();
            black_box(result)
        })
    });

    group.finish();
}

fn bench_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("groups");

    group.bench_function("provide_group_10", |b| {
        b.iter(|| {
            let container = Container::new();
            for i in 0..10u32 {
                container.provide_group::<u32, _, _>("g", move || i).unwrap();
            }
            black_box(container)
        })
    });

    let container = Container::new();
    for i in 0..10u32 {
        container.provide_group::<u32, _, _>("g", move || i).unwrap();
    }

    group.bench_function("resolve_group_10_shuffled", |b| {
        b.iter(|| {
            let values = container.resolve_group::<u32>("g").unwrap();
            black_box(values)
        })
    });

    group.finish();
}

fn bench_first_invoke_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_invoke");

    group.bench_function("acyclic_check_plus_build_chain_of_5", |b| {
        b.iter(|| {
            let container = Container::new();
            container.provide(|| 0u8).unwrap();
            container.provide(|a: Arc<u8>| *a as u16).unwrap();
            container.provide(|a: Arc<u16>| *a as u32).unwrap();
            container.provide(|a: Arc<u32>| *a as u64).unwrap();
            container.provide(|a: Arc<u64>| *a as i64).unwrap();
            let value = container.resolve::<i64>().unwrap();
            black_box(value)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_invoke,
    bench_groups,
    bench_first_invoke_cost,
);

criterion_main!(benches);
