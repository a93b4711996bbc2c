use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dashmap::DashSet;
use rand::prelude::*;
use std::collections::HashSet;
use std::num::NonZeroUsize;

use buildgraph_rs::PointerSet;

// Random non-zero handles, the shape record ids and addresses take in practice.
fn generate_handles(size: usize) -> Vec<NonZeroUsize> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..size)
        .map(|_| NonZeroUsize::new(rng.gen_range(1..usize::MAX)).unwrap())
        .collect()
}

fn benchmark_insert(c: &mut Criterion) {
    let handles = generate_handles(10000);

    c.bench_function("pointer_set_insert", |b| {
        b.iter(|| {
            let mut set = PointerSet::new();
            for h in &handles {
                black_box(set.add(*h));
            }
        })
    });

    c.bench_function("hashset_insert", |b| {
        b.iter(|| {
            let mut set = HashSet::new();
            for h in &handles {
                black_box(set.insert(*h));
            }
        })
    });

    c.bench_function("dashset_insert", |b| {
        b.iter(|| {
            let set = DashSet::new();
            for h in &handles {
                black_box(set.insert(*h));
            }
        })
    });
}

fn benchmark_contains(c: &mut Criterion) {
    let handles = generate_handles(10000);
    let pointer_set: PointerSet<NonZeroUsize> = handles.iter().copied().collect();
    let hash_set: HashSet<NonZeroUsize> = handles.iter().copied().collect();
    let dash_set: DashSet<NonZeroUsize> = handles.iter().copied().collect();

    c.bench_function("pointer_set_contains", |b| {
        b.iter(|| {
            for h in &handles {
                black_box(pointer_set.contains(*h));
            }
        })
    });

    c.bench_function("hashset_contains", |b| {
        b.iter(|| {
            for h in &handles {
                black_box(hash_set.contains(h));
            }
        })
    });

    c.bench_function("dashset_contains", |b| {
        b.iter(|| {
            for h in &handles {
                black_box(dash_set.contains(h));
            }
        })
    });
}

fn benchmark_insert_erase(c: &mut Criterion) {
    let handles = generate_handles(10000);

    c.bench_function("pointer_set_insert_erase", |b| {
        b.iter(|| {
            let mut set = PointerSet::with_capacity(handles.len());
            for h in &handles {
                set.add(*h);
            }
            for h in &handles {
                black_box(set.erase(*h));
            }
            black_box(set.len())
        })
    });

    c.bench_function("hashset_insert_erase", |b| {
        b.iter(|| {
            let mut set = HashSet::with_capacity(handles.len());
            for h in &handles {
                set.insert(*h);
            }
            for h in &handles {
                black_box(set.remove(h));
            }
            black_box(set.len())
        })
    });
}

criterion_group!(
    benches,
    benchmark_insert,
    benchmark_contains,
    benchmark_insert_erase
);
criterion_main!(benches);
