use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dashmap::DashMap;
use rand::prelude::*;
use std::sync::Arc;
use std::thread;

use buildgraph_rs::{Interner, LocalInterner};

const THREADS: usize = 4;

// Label-like words with plenty of repeats, as in a tree of build files.
fn generate_words(size: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..size)
        .map(|_| format!("//src/dir{}:target{}", rng.gen_range(0..64), rng.gen_range(0..256)))
        .collect()
}

fn benchmark_single_thread(c: &mut Criterion) {
    let words = generate_words(10000);

    c.bench_function("interner_shared_only", |b| {
        b.iter(|| {
            let interner = Interner::new();
            for w in &words {
                black_box(interner.intern(w));
            }
        })
    });

    c.bench_function("interner_with_local_cache", |b| {
        b.iter(|| {
            let interner = Interner::new();
            let mut local = LocalInterner::new(&interner);
            for w in &words {
                black_box(local.intern(w));
            }
        })
    });

    c.bench_function("dashmap_intern", |b| {
        b.iter(|| {
            let map: DashMap<Arc<str>, ()> = DashMap::new();
            for w in &words {
                if !map.contains_key(w.as_str()) {
                    map.insert(Arc::from(w.as_str()), ());
                }
            }
            black_box(map.len())
        })
    });
}

fn benchmark_parallel(c: &mut Criterion) {
    let words = generate_words(10000);

    c.bench_function("interner_parallel_local_caches", |b| {
        b.iter(|| {
            let interner = Interner::new();
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        let mut local = LocalInterner::new(&interner);
                        for w in &words {
                            black_box(local.intern(w));
                        }
                    });
                }
            });
            black_box(interner.len())
        })
    });

    c.bench_function("dashmap_parallel", |b| {
        b.iter(|| {
            let map: DashMap<Arc<str>, ()> = DashMap::new();
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        for w in &words {
                            map.entry(Arc::from(w.as_str())).or_insert(());
                        }
                    });
                }
            });
            black_box(map.len())
        })
    });
}

criterion_group!(benches, benchmark_single_thread, benchmark_parallel);
criterion_main!(benches);
