//! Propriedades que valem para qualquer backend. Cada teste roda duas vezes:
//! contra o `LocalBackend` e contra um `SharedBackend` ligado a um servidor
//! subido no próprio processo.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use stormcache::{Cache, CacheError, LocalConfig, LockOptions, SharedConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    items: Vec<String>,
    paid: bool,
}

fn order() -> Order {
    Order {
        id: 7,
        items: vec!["café".into(), "pão".into()],
        paid: false,
    }
}

fn quick_lock() -> LockOptions {
    LockOptions::default()
        .retries(2)
        .retry_delay(Duration::from_millis(10))
}

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let db = stormcache_storage::Db::new();
        stormcache_server::serve(listener, db, 16, std::future::pending()).await;
    });
    addr
}

async fn local_cache() -> Cache {
    let cache = Cache::local(LocalConfig::default());
    cache.start().await.unwrap();
    cache
}

async fn shared_cache() -> Cache {
    let addr = start_server().await;
    let cache = Cache::shared(SharedConfig::new(addr.ip().to_string(), addr.port()));
    cache.start().await.unwrap();
    cache
}

macro_rules! backend_contract {
    ($name:ident, $make:ident) => {
        mod $name {
            use super::*;

            #[tokio::test]
            async fn set_then_get_round_trips() {
                let cache = $make().await;
                cache.set("order:7", &order(), None).await.unwrap();
                assert_eq!(cache.get::<Order>("order:7").await.unwrap(), Some(order()));
            }

            #[tokio::test]
            async fn missing_key_is_none() {
                let cache = $make().await;
                assert_eq!(cache.get::<Order>("nope").await.unwrap(), None);
                assert!(cache.get_all_hash_fields::<i32>("nope").await.unwrap().is_empty());
                assert_eq!(cache.get_from_hash::<i32>("nope", "f").await.unwrap(), None);
            }

            #[tokio::test]
            async fn set_overwrites_value() {
                let cache = $make().await;
                cache.set("k", &1, None).await.unwrap();
                cache.set("K", &2, None).await.unwrap();
                assert_eq!(cache.get::<i32>("k").await.unwrap(), Some(2));
            }

            #[tokio::test]
            async fn remove_is_idempotent() {
                let cache = $make().await;
                cache.set("k", &1, None).await.unwrap();
                cache.remove("k").await.unwrap();
                cache.remove("k").await.unwrap();
                assert_eq!(cache.get::<i32>("k").await.unwrap(), None);
            }

            #[tokio::test]
            async fn value_expires_after_ttl() {
                let cache = $make().await;
                cache
                    .set("short", &"x", Some(Duration::from_millis(50)))
                    .await
                    .unwrap();
                assert!(cache.get::<String>("short").await.unwrap().is_some());

                tokio::time::sleep(Duration::from_millis(120)).await;
                assert_eq!(cache.get::<String>("short").await.unwrap(), None);
                assert!(cache.keys("short").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn keys_match_glob_case_insensitively() {
                let cache = $make().await;
                for key in ["User:1", "user:2", "order:1"] {
                    cache.set(key, &0, None).await.unwrap();
                }

                let mut users = cache.keys("USER:*").await.unwrap();
                users.sort();
                assert_eq!(users, vec!["user:1", "user:2"]);
                assert_eq!(cache.keys("*:1").await.unwrap().len(), 2);
                assert!(cache.keys("user").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn hash_fields_round_trip() {
                let cache = $make().await;
                cache.set_in_hash("cart", "a", &order(), None).await.unwrap();
                cache.set_in_hash("CART", "b", &order(), None).await.unwrap();

                assert_eq!(
                    cache.get_from_hash::<Order>("cart", "a").await.unwrap(),
                    Some(order())
                );
                let all: HashMap<String, Order> = cache.get_all_hash_fields("cart").await.unwrap();
                assert_eq!(all.len(), 2);
            }

            #[tokio::test]
            async fn last_field_removal_deletes_hash() {
                let cache = $make().await;
                cache.set_in_hash("h", "a", &1, None).await.unwrap();
                cache.set_in_hash("h", "b", &2, None).await.unwrap();

                cache.remove_from_hash("h", "a").await.unwrap();
                assert_eq!(cache.keys("h").await.unwrap(), vec!["h"]);

                cache.remove_from_hash("h", "b").await.unwrap();
                cache.remove_from_hash("h", "b").await.unwrap();
                assert!(cache.keys("h").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn hash_expires_as_a_whole() {
                let cache = $make().await;
                let ttl = Some(Duration::from_millis(50));
                cache.set_in_hash("h", "a", &1, ttl).await.unwrap();
                cache.set_in_hash("h", "b", &2, ttl).await.unwrap();

                tokio::time::sleep(Duration::from_millis(120)).await;
                assert!(cache.get_all_hash_fields::<i32>("h").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn lock_acquire_release_cycle() {
                let cache = $make().await;
                cache.acquire_lock("lock:job", quick_lock()).await.unwrap();
                assert!(!cache.try_acquire_lock("lock:job", quick_lock()).await.unwrap());

                cache.release_lock("lock:job").await.unwrap();
                assert!(matches!(
                    cache.release_lock("lock:job").await,
                    Err(CacheError::LockNotReleased { .. })
                ));
                assert!(cache.try_acquire_lock("LOCK:JOB", quick_lock()).await.unwrap());
            }

            #[tokio::test]
            async fn lock_expires_without_release() {
                let cache = $make().await;
                let opts = quick_lock().ttl(Duration::from_millis(50));
                cache.acquire_lock("lock:job", opts.clone()).await.unwrap();

                tokio::time::sleep(Duration::from_millis(120)).await;
                cache.acquire_lock("lock:job", opts).await.unwrap();
            }

            #[tokio::test]
            async fn renew_keeps_lock_alive() {
                let cache = $make().await;
                let opts = quick_lock().ttl(Duration::from_millis(100));
                cache.acquire_lock("lock:job", opts.clone()).await.unwrap();
                cache
                    .renew_lock("lock:job", Duration::from_secs(5))
                    .await
                    .unwrap();

                tokio::time::sleep(Duration::from_millis(200)).await;
                assert!(!cache.try_acquire_lock("lock:job", opts).await.unwrap());
                cache.release_lock("lock:job").await.unwrap();

                assert!(matches!(
                    cache.renew_lock("lock:job", Duration::from_secs(1)).await,
                    Err(CacheError::LockNotRenewed { .. })
                ));
            }
        }
    };
}

backend_contract!(local, local_cache);
backend_contract!(shared, shared_cache);
