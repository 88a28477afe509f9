use bytes::Bytes;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use stormcache_protocol::{SetCondition, SetOptions};
use stormcache_storage::Db;

fn bench_set_get_sequential(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_get_sequential_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                let opts = SetOptions::default();
                for i in 0..10_000 {
                    let key = format!("key:{i}");
                    let value = Bytes::from(format!("value:{i}"));
                    db.set(key.clone(), value, &opts);
                    black_box(db.get(&key).unwrap());
                }
            });
        })
    });
}

fn bench_lock_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_nx_del_if_eq_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                let opts = SetOptions {
                    expire_ms: Some(10_000),
                    condition: Some(SetCondition::Nx),
                };
                for _ in 0..10_000 {
                    black_box(db.set("lock".into(), Bytes::from_static(b"token"), &opts));
                    black_box(db.del_if_eq("lock", b"token").unwrap());
                }
            });
        })
    });
}

fn bench_hash_operations(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("hset_hgetall_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                for i in 0..1_000 {
                    db.hset("hash", &[(format!("field:{i}"), Bytes::from("v"))])
                        .unwrap();
                }
                black_box(db.hgetall("hash").unwrap());
            });
        })
    });
}

fn bench_scan(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("scan_match_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                for i in 0..10_000 {
                    let prefix = if i % 2 == 0 { "user" } else { "session" };
                    db.set(format!("{prefix}:{i}"), Bytes::from("x"), &SetOptions::default());
                }
                let mut cursor = 0;
                loop {
                    let (next, keys) = db.scan(cursor, Some("user:*"), 1_000);
                    black_box(keys);
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
            });
        })
    });
}

criterion_group!(
    benches,
    bench_set_get_sequential,
    bench_lock_cycle,
    bench_hash_operations,
    bench_scan,
);
criterion_main!(benches);
