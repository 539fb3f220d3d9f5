use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;
use std::sync::LazyLock;
use tierpool::{FastPool, Pool, PoolConfig};

static VEC_POOL: LazyLock<FastPool<Vec<u64>>> =
    LazyLock::new(|| FastPool::new_default(PoolConfig::default()).unwrap());

static HASHMAP_POOL: LazyLock<FastPool<HashMap<u64, u64>>> =
    LazyLock::new(|| FastPool::new_default(PoolConfig::default()).unwrap());

static STRING_POOL: LazyLock<FastPool<String>> =
    LazyLock::new(|| FastPool::new_default(PoolConfig::default()).unwrap());

const SIZES: [u64; 12] = [1, 5, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100];

fn bench_vec(c: &mut Criterion) {
    let mut group = c.benchmark_group("vec");
    for size in SIZES.iter() {
        group.throughput(Throughput::Elements(*size));

        group.bench_with_input(BenchmarkId::new("standard", size), size, |b, &size| {
            b.iter(|| {
                let mut v = Vec::new();
                for i in 0..size {
                    v.push(black_box(i));
                }
                black_box(v);
            });
        });

        group.bench_with_input(BenchmarkId::new("pooled", size), size, |b, &size| {
            b.iter(|| {
                let mut v = VEC_POOL.rent();
                for i in 0..size {
                    v.push(black_box(i));
                }
                black_box(&v);
            });
        });
    }
    group.finish();
}

fn bench_hashmap(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashmap");
    for size in SIZES.iter() {
        group.throughput(Throughput::Elements(*size));

        group.bench_with_input(BenchmarkId::new("standard", size), size, |b, &size| {
            b.iter(|| {
                let mut map = HashMap::new();
                for i in 0..size {
                    map.insert(black_box(i), black_box(i * 2));
                }
                black_box(map);
            });
        });

        group.bench_with_input(BenchmarkId::new("pooled", size), size, |b, &size| {
            b.iter(|| {
                let mut map = HASHMAP_POOL.rent();
                for i in 0..size {
                    map.insert(black_box(i), black_box(i * 2));
                }
                black_box(&map);
            });
        });
    }
    group.finish();
}

fn bench_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("string");
    for size in SIZES.iter() {
        group.throughput(Throughput::Elements(*size));

        group.bench_with_input(BenchmarkId::new("standard", size), size, |b, &size| {
            b.iter(|| {
                let mut s = String::new();
                for _ in 0..size {
                    s.push_str(black_box("x"));
                }
                black_box(s);
            });
        });

        group.bench_with_input(BenchmarkId::new("pooled", size), size, |b, &size| {
            b.iter(|| {
                let mut s = STRING_POOL.rent();
                for _ in 0..size {
                    s.push_str(black_box("x"));
                }
                black_box(&s);
            });
        });
    }
    group.finish();
}

// Contended rent/return across several threads hitting the same pool, to
// show the per-core tier doing its job once the thread-local slot alone
// isn't enough.
fn bench_contended(c: &mut Criterion) {
    let pool: Pool<Vec<u8>> = Pool::new(PoolConfig::default(), Vec::new).unwrap();
    let mut group = c.benchmark_group("contended");
    group.bench_function("rent_return_4_threads", |b| {
        b.iter(|| {
            std::thread::scope(|scope| {
                for _ in 0..4 {
                    let pool = &pool;
                    scope.spawn(move || {
                        for _ in 0..1000 {
                            let mut v = pool.rent();
                            v.push(black_box(1u8));
                            black_box(&v);
                        }
                    });
                }
            });
        });
    });
    group.finish();
}

criterion_group!(benches, bench_vec, bench_hashmap, bench_string, bench_contended);
criterion_main!(benches);
