//! # State Store Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | `store` with no waiters | < 1µs |
//! | `store` fanned out to waiters | linear in waiter count |
//! | topic filter matching | < 100ns |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use smarthome_bus::topic_matches;
use state_store::StateStore;

fn bench_store_without_waiters(c: &mut Criterion) {
    let mut group = c.benchmark_group("state-store");
    let store = StateStore::new();
    let values = ["on", "off"];
    let mut i = 0usize;

    group.bench_function("store_no_waiters", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            black_box(store.store("light", values[i % 2]))
        })
    });

    group.bench_function("get", |b| b.iter(|| black_box(store.get("light"))));
    group.finish();
}

fn bench_store_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("state-store-fan-out");

    for waiters in [1usize, 10, 100] {
        let registry = state_store::WaiterRegistry::new();
        // Handles keep the registrations alive for the duration of the bench
        let _handles: Vec<_> = (0..waiters).map(|_| registry.register("light")).collect();
        let broadcaster = state_store::Broadcaster::new(std::sync::Arc::new(registry));
        let mut sequence = 0u64;

        group.throughput(Throughput::Elements(waiters as u64));
        group.bench_with_input(BenchmarkId::new("deliver", waiters), &waiters, |b, _| {
            b.iter(|| {
                sequence += 1;
                black_box(broadcaster.deliver("light", sequence, "on"))
            })
        });
    }
    group.finish();
}

fn bench_topic_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("topics");
    group.bench_function("exact", |b| {
        b.iter(|| black_box(topic_matches("home/set/light", "home/set/light")))
    });
    group.bench_function("multi_level", |b| {
        b.iter(|| black_box(topic_matches("home/set/#", "home/set/kitchen/light")))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_store_without_waiters,
    bench_store_fan_out,
    bench_topic_matching
);
criterion_main!(benches);
