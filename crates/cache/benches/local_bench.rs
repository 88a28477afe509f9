use criterion::{Criterion, black_box, criterion_group, criterion_main};

use stormcache::{Cache, LocalConfig, LockOptions, NamespaceConfig};

fn bench_set_get(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("local_set_get_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cache = Cache::local(LocalConfig::default());
                for i in 0..10_000 {
                    let key = format!("key:{i}");
                    cache.set(&key, &i, None).await.unwrap();
                    black_box(cache.get::<i32>(&key).await.unwrap());
                }
            });
        })
    });
}

fn bench_eviction(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut config = LocalConfig::default();
    config.values = NamespaceConfig {
        capacity: 1_000,
        ..config.values
    };

    // Capacidade 10x menor que o número de chaves: quase todo set despeja
    c.bench_function("local_set_with_eviction_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cache = Cache::local(config.clone());
                for i in 0..10_000 {
                    cache.set(&format!("key:{i}"), &i, None).await.unwrap();
                }
                black_box(cache.keys("key:*").await.unwrap().len());
            });
        })
    });
}

fn bench_lock_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("local_acquire_release_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cache = Cache::local(LocalConfig::default());
                let opts = LockOptions::default().retries(1);
                for _ in 0..10_000 {
                    cache.acquire_lock("lock", opts.clone()).await.unwrap();
                    cache.release_lock("lock").await.unwrap();
                }
            });
        })
    });
}

fn bench_hash(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("local_set_in_hash_get_all_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cache = Cache::local(LocalConfig::default());
                for i in 0..1_000 {
                    cache
                        .set_in_hash("h", &format!("f{i}"), &i, None)
                        .await
                        .unwrap();
                }
                black_box(cache.get_all_hash_fields::<i32>("h").await.unwrap());
            });
        })
    });
}

criterion_group!(
    benches,
    bench_set_get,
    bench_eviction,
    bench_lock_cycle,
    bench_hash
);
criterion_main!(benches);
