mod lru;

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use stormcache_common::{CacheResult, glob_match};

use crate::backend::{CacheBackend, new_owner_token, normalize_key};
use crate::config::LocalConfig;

use lru::LruArena;

/// Backend em memória, privado ao processo.
///
/// Três namespaces independentes (valores, hashes, locks), cada um com seu
/// LRU de capacidade fixa. Cada namespace tem o próprio mutex, então o
/// backend pode ser compartilhado entre tasks em threads diferentes.
pub struct LocalBackend {
    values: Mutex<LruArena<String>>,
    hashes: Mutex<LruArena<HashMap<String, String>>>,
    locks: Mutex<LruArena<String>>,
    token: String,
}

impl LocalBackend {
    pub fn new(config: LocalConfig) -> Self {
        Self {
            values: Mutex::new(LruArena::new(
                config.values.capacity,
                config.values.default_ttl,
            )),
            hashes: Mutex::new(LruArena::new(
                config.hashes.capacity,
                config.hashes.default_ttl,
            )),
            locks: Mutex::new(LruArena::new(
                config.locks.capacity,
                config.locks.default_ttl,
            )),
            token: new_owner_token(),
        }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(LocalConfig::default())
    }
}

fn log_eviction(namespace: &str, evicted: Option<String>) {
    if let Some(key) = evicted {
        debug!("{namespace}: chave despejada por LRU: {key}");
    }
}

#[async_trait]
impl CacheBackend for LocalBackend {
    fn owner_token(&self) -> &str {
        &self.token
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let key = normalize_key(key);
        Ok(self.values.lock().get(&key).cloned())
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let evicted = self.values.lock().insert(normalize_key(key), value, ttl);
        log_eviction("values", evicted);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.values.lock().remove(&normalize_key(key));
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let pattern = normalize_key(pattern);
        let mut found = BTreeSet::new();
        for keys in [
            self.values.lock().live_keys(),
            self.hashes.lock().live_keys(),
            self.locks.lock().live_keys(),
        ] {
            found.extend(keys.into_iter().filter(|k| glob_match(&pattern, k)));
        }
        Ok(found.into_iter().collect())
    }

    async fn set_in_hash(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let mut hashes = self.hashes.lock();
        let (fields, evicted) = hashes.upsert(&normalize_key(key), ttl, HashMap::new);
        fields.insert(field.to_string(), value);
        log_eviction("hashes", evicted);
        Ok(())
    }

    async fn get_from_hash(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        let mut hashes = self.hashes.lock();
        Ok(hashes
            .get(&normalize_key(key))
            .and_then(|fields| fields.get(field).cloned()))
    }

    async fn remove_from_hash(&self, key: &str, field: &str) -> CacheResult<()> {
        let key = normalize_key(key);
        let mut hashes = self.hashes.lock();
        let now_empty = match hashes.get_mut(&key) {
            Some(fields) => {
                fields.remove(field);
                fields.is_empty()
            }
            None => false,
        };
        // Hash vazio não persiste
        if now_empty {
            hashes.remove(&key);
        }
        Ok(())
    }

    async fn get_all_hash_fields(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut hashes = self.hashes.lock();
        Ok(hashes.get(&normalize_key(key)).cloned().unwrap_or_default())
    }

    async fn try_claim(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool> {
        let key = normalize_key(key);
        let mut locks = self.locks.lock();
        if locks.contains(&key) {
            return Ok(false);
        }
        if let Some(evicted) = locks.insert(key, token.to_string(), Some(ttl)) {
            debug!("locks: {evicted} despejado por LRU; aumente locks.capacity");
        }
        Ok(true)
    }

    async fn release_if_owner(&self, key: &str, token: &str) -> CacheResult<bool> {
        let key = normalize_key(key);
        let mut locks = self.locks.lock();
        if locks.get(&key).is_some_and(|current| current == token) {
            locks.remove(&key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn extend_if_owner(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool> {
        let key = normalize_key(key);
        let mut locks = self.locks.lock();
        if locks.get(&key).is_some_and(|current| current == token) {
            return Ok(locks.refresh_ttl(&key, Some(ttl)));
        }
        Ok(false)
    }
}
