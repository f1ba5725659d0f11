use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::thread;

use cls_mempool::{MempoolAttr, Pool, PoolType};

fn percpu_pool(max_cpus: usize, slots_per_cpu: usize) -> Arc<Pool> {
    Arc::new(
        Pool::create(
            MempoolAttr::builder()
                .item_size(std::mem::size_of::<u64>())
                .stride((slots_per_cpu * std::mem::size_of::<u64>()).next_power_of_two())
                .pool_type(PoolType::PerCpu { max_cpus })
                .build()
                .unwrap(),
        )
        .unwrap(),
    )
}

fn bench_percpu_concurrent_malloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("percpu_concurrent_malloc");

    for &threads in &[1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            let pool = percpu_pool(threads.max(1), 2_000);

            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|cpu| {
                        let pool = Arc::clone(&pool);
                        thread::spawn(move || {
                            for _ in 0..500 {
                                if let Ok(h) = pool.malloc() {
                                    black_box(pool.replica(h, cpu).unwrap());
                                    pool.free(h).unwrap();
                                }
                            }
                        })
                    })
                    .collect();

                for h in handles {
                    h.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_shared_global_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_global_contention");

    group.bench_function("high_contention", |b| {
        let pool = Arc::new(
            Pool::create(
                MempoolAttr::builder()
                    .item_size(std::mem::size_of::<u64>())
                    .stride(4096)
                    .pool_type(PoolType::Global)
                    .build()
                    .unwrap(),
            )
            .unwrap(),
        );

        b.iter(|| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let pool = Arc::clone(&pool);
                    thread::spawn(move || {
                        for _ in 0..50 {
                            if let Ok(h) = pool.malloc() {
                                black_box(h);
                                let _ = pool.free(h);
                            }
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_percpu_concurrent_malloc, bench_shared_global_contention);
criterion_main!(benches);
