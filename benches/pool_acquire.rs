//! Pool Acquisition Benchmarks
//!
//! Measures the pool's own overhead against the in-memory driver, so the
//! numbers exclude any network round trip:
//! - acquire/release of an idle connection
//! - a full scoped use through `with_connection`
//! - contended acquisition from several tasks
//! - opening a standalone connection per query, as a baseline
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench --bench pool_acquire
//! cargo bench --bench pool_acquire -- contended
//! ```

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use sqlpool::testing::MockDriver;
use sqlpool::{AcquireOptions, Pool, PoolConfig, PooledConnection};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => panic!("failed to build runtime: {}", e),
    }
}

fn pool_config(size: usize) -> PoolConfig {
    PoolConfig::new()
        .normal_size(size)
        .max_size(size)
        .pre_create(size)
        .no_lifetime()
        .acquire(AcquireOptions::new().timeout(Duration::from_secs(1)))
}

fn bench_acquire_release(c: &mut Criterion) {
    let rt = runtime();
    let pool = rt
        .block_on(Pool::new(MockDriver::new(), pool_config(4)))
        .unwrap();

    let mut group = c.benchmark_group("acquire_release");

    group.bench_function("idle", |b| {
        b.to_async(&rt).iter(|| async {
            let mut conn = pool.get().await.unwrap();
            conn.release().await.unwrap();
        });
    });

    group.bench_function("idle_pre_ping", |b| {
        let options = AcquireOptions::new().pre_ping(true);
        b.to_async(&rt).iter(|| async {
            let mut conn = pool.acquire(options).await.unwrap();
            conn.release().await.unwrap();
        });
    });

    group.bench_function("with_connection", |b| {
        b.to_async(&rt).iter(|| async {
            let rows = pool
                .with_connection(AcquireOptions::default(), |conn| {
                    Box::pin(async move { conn.fetch_all("SELECT 1+1", &[]).await })
                })
                .await
                .unwrap();
            black_box(rows)
        });
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("contended");

    for tasks in [2usize, 8, 32] {
        let pool = rt
            .block_on(Pool::new(MockDriver::new(), pool_config(4)))
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.to_async(&rt).iter(|| {
                let pool = pool.clone();
                async move {
                    let mut handles = Vec::with_capacity(tasks);
                    for _ in 0..tasks {
                        let pool = pool.clone();
                        handles.push(tokio::spawn(async move {
                            let mut conn = pool.get().await.unwrap();
                            conn.fetch_all("SELECT 1+1", &[]).await.unwrap();
                            conn.release().await.unwrap();
                        }));
                    }
                    for handle in handles {
                        handle.await.unwrap();
                    }
                }
            });
        });
    }

    group.finish();
}

fn bench_standalone(c: &mut Criterion) {
    let rt = runtime();
    let driver = Arc::new(MockDriver::new());

    c.bench_function("standalone_connect_per_query", |b| {
        b.to_async(&rt).iter(|| {
            let driver = Arc::clone(&driver);
            async move {
                let mut conn = PooledConnection::connect(driver).await.unwrap();
                black_box(conn.fetch_all("SELECT 1+1", &[]).await.unwrap());
                conn.close().await.unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_acquire_release, bench_contended, bench_standalone);
criterion_main!(benches);
