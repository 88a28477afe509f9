use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as Slot;
use tokio::sync::{Mutex, Notify};
use tokio::time::{Duration, Instant};
use tracing::debug;

use stormcache_common::{StorageError, glob_match};
use stormcache_protocol::{SetCondition, SetOptions};

use crate::entry::{Entry, Value};

/// Item no BTreeSet de expiração: (instante, chave).
/// Ordenado por instante para purga eficiente.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
struct ExpiryEntry(Instant, String);

/// Estado compartilhado entre todas as conexões.
struct SharedState {
    data: DashMap<String, Entry>,
    expiry: Mutex<BTreeSet<ExpiryEntry>>,
    notify_expiry: Notify,
}

/// Handle para o banco de dados in-memory.
///
/// Cada operação é atômica por chave: as operações condicionais usadas pelo
/// lock (`SET NX`, compare-and-delete, compare-and-expire) rodam com a
/// entrada travada no shard do DashMap.
#[derive(Clone)]
pub struct Db {
    shared: Arc<SharedState>,
}

impl Db {
    pub fn new() -> Self {
        let db = Db {
            shared: Arc::new(SharedState {
                data: DashMap::new(),
                expiry: Mutex::new(BTreeSet::new()),
                notify_expiry: Notify::new(),
            }),
        };

        // Spawn background task para purgar keys expiradas
        let shared = db.shared.clone();
        tokio::spawn(async move {
            purge_expired_keys(shared).await;
        });

        db
    }

    // --- String operations ---

    pub fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let Some(entry) = self.shared.data.get(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            drop(entry);
            self.remove_if_expired(key);
            return Ok(None);
        }
        match &entry.value {
            Value::String(data) => Ok(Some(data.clone())),
            Value::Hash(_) => Err(StorageError::WrongType),
        }
    }

    /// SET com NX/XX. Retorna false quando a condição não foi satisfeita.
    /// Entradas expiradas contam como ausentes.
    pub fn set(&self, key: String, value: Bytes, options: &SetOptions) -> bool {
        let expires_at = options
            .expire_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        let entry = Entry::new(Value::String(value), expires_at);

        match self.shared.data.entry(key.clone()) {
            Slot::Occupied(mut slot) => {
                let live = !slot.get().is_expired();
                match options.condition {
                    Some(SetCondition::Nx) if live => return false,
                    Some(SetCondition::Xx) if !live => return false,
                    _ => {}
                }
                slot.insert(entry);
            }
            Slot::Vacant(slot) => {
                if options.condition == Some(SetCondition::Xx) {
                    return false;
                }
                slot.insert(entry);
            }
        }

        if let Some(at) = expires_at {
            self.schedule_expiry(key, at);
        }
        true
    }

    pub fn del(&self, keys: &[String]) -> usize {
        keys.iter()
            .filter_map(|key| self.shared.data.remove(key))
            .filter(|(_, entry)| !entry.is_expired())
            .count()
    }

    /// Remove `key` somente se o valor atual for `expected`.
    pub fn del_if_eq(&self, key: &str, expected: &[u8]) -> Result<bool, StorageError> {
        let removed = self.shared.data.remove_if(key, |_, entry| {
            entry.live_string().is_some_and(|v| v.as_ref() == expected)
        });
        if removed.is_some() {
            return Ok(true);
        }
        self.check_string_type(key)?;
        Ok(false)
    }

    /// Aplica TTL de `ms` a `key` somente se o valor atual for `expected`.
    pub fn pexpire_if_eq(&self, key: &str, expected: &[u8], ms: u64) -> Result<bool, StorageError> {
        let at = expire_instant(ms)?;
        let Some(mut entry) = self.shared.data.get_mut(key) else {
            return Ok(false);
        };
        if entry.is_expired() {
            return Ok(false);
        }
        let owned = match &entry.value {
            Value::String(v) => v.as_ref() == expected,
            Value::Hash(_) => return Err(StorageError::WrongType),
        };
        if !owned {
            return Ok(false);
        }
        entry.expires_at = Some(at);
        drop(entry);

        self.schedule_expiry(key.to_string(), at);
        Ok(true)
    }

    // --- Hash operations ---

    /// HSET: retorna quantos campos foram criados (não atualizados).
    pub fn hset(&self, key: &str, fields: &[(String, Bytes)]) -> Result<usize, StorageError> {
        let mut entry = self
            .shared
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Hash(HashMap::new()), None));

        if entry.is_expired() {
            entry.value = Value::Hash(HashMap::new());
            entry.expires_at = None;
        }

        match &mut entry.value {
            Value::Hash(hash) => {
                let mut created = 0;
                for (field, value) in fields {
                    if hash.insert(field.clone(), value.clone()).is_none() {
                        created += 1;
                    }
                }
                Ok(created)
            }
            Value::String(_) => Err(StorageError::WrongType),
        }
    }

    pub fn hget(&self, key: &str, field: &str) -> Result<Option<Bytes>, StorageError> {
        self.with_hash(key, |hash| hash.get(field).cloned())
            .map(Option::flatten)
    }

    pub fn hdel(&self, key: &str, fields: &[String]) -> Result<usize, StorageError> {
        let mut entry = match self.shared.data.get_mut(key) {
            Some(e) => e,
            None => return Ok(0),
        };

        if entry.is_expired() {
            drop(entry);
            self.remove_if_expired(key);
            return Ok(0);
        }

        match &mut entry.value {
            Value::Hash(hash) => {
                let mut removed = 0;
                for field in fields {
                    if hash.remove(field).is_some() {
                        removed += 1;
                    }
                }
                // Hash vazio não persiste
                if hash.is_empty() {
                    drop(entry);
                    self.shared
                        .data
                        .remove_if(key, |_, e| matches!(&e.value, Value::Hash(h) if h.is_empty()));
                }
                Ok(removed)
            }
            Value::String(_) => Err(StorageError::WrongType),
        }
    }

    /// HGETALL: pares ordenados por campo.
    pub fn hgetall(&self, key: &str) -> Result<Vec<(String, Bytes)>, StorageError> {
        let pairs = self.with_hash(key, |hash| {
            let mut pairs: Vec<_> = hash
                .iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            pairs
        })?;
        Ok(pairs.unwrap_or_default())
    }

    // --- Keyspace ---

    /// PEXPIRE: retorna false se a chave não existe.
    pub fn pexpire(&self, key: &str, ms: u64) -> Result<bool, StorageError> {
        let at = expire_instant(ms)?;
        let updated = match self.shared.data.get_mut(key) {
            Some(mut entry) if !entry.is_expired() => {
                entry.expires_at = Some(at);
                true
            }
            _ => false,
        };
        if updated {
            self.schedule_expiry(key.to_string(), at);
        }
        Ok(updated)
    }

    /// SCAN sobre as chaves vivas em ordem lexicográfica.
    ///
    /// O cursor é a posição na ordenação; `count` limita quantas chaves são
    /// examinadas (não quantas casam), como no Redis. Cursor 0 no retorno
    /// indica o fim da iteração.
    pub fn scan(&self, cursor: u64, pattern: Option<&str>, count: usize) -> (u64, Vec<String>) {
        let mut keys: Vec<String> = self
            .shared
            .data
            .iter()
            .filter(|e| !e.value().is_expired())
            .map(|e| e.key().clone())
            .collect();
        keys.sort_unstable();

        let start = (cursor as usize).min(keys.len());
        let end = start.saturating_add(count.max(1)).min(keys.len());
        let page = keys[start..end]
            .iter()
            .filter(|k| pattern.is_none_or(|p| glob_match(p, k)))
            .cloned()
            .collect();

        let next = if end >= keys.len() { 0 } else { end as u64 };
        (next, page)
    }

    pub fn len(&self) -> usize {
        self.shared.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.data.is_empty()
    }

    fn with_hash<T>(
        &self,
        key: &str,
        f: impl FnOnce(&HashMap<String, Bytes>) -> T,
    ) -> Result<Option<T>, StorageError> {
        let Some(entry) = self.shared.data.get(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            drop(entry);
            self.remove_if_expired(key);
            return Ok(None);
        }
        match &entry.value {
            Value::Hash(hash) => Ok(Some(f(hash))),
            Value::String(_) => Err(StorageError::WrongType),
        }
    }

    fn check_string_type(&self, key: &str) -> Result<(), StorageError> {
        match self.shared.data.get(key) {
            Some(entry) if !entry.is_expired() && matches!(entry.value, Value::Hash(_)) => {
                Err(StorageError::WrongType)
            }
            _ => Ok(()),
        }
    }

    fn remove_if_expired(&self, key: &str) {
        self.shared.data.remove_if(key, |_, e| e.is_expired());
    }

    fn schedule_expiry(&self, key: String, at: Instant) {
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let mut expiry = shared.expiry.lock().await;
            expiry.insert(ExpiryEntry(at, key));
            drop(expiry);
            shared.notify_expiry.notify_one();
        });
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

fn expire_instant(ms: u64) -> Result<Instant, StorageError> {
    Instant::now()
        .checked_add(Duration::from_millis(ms))
        .ok_or(StorageError::InvalidExpire)
}

/// Background task que purga chaves expiradas.
async fn purge_expired_keys(shared: Arc<SharedState>) {
    loop {
        let next_expiry = {
            let expiry = shared.expiry.lock().await;
            expiry.iter().next().map(|e| e.0)
        };

        match next_expiry {
            Some(when) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(when) => {}
                    _ = shared.notify_expiry.notified() => { continue; }
                }
            }
            None => {
                shared.notify_expiry.notified().await;
                continue;
            }
        }

        let now = Instant::now();
        let mut expiry = shared.expiry.lock().await;
        let mut due = Vec::new();
        while let Some(first) = expiry.first() {
            if first.0 > now {
                break; // BTreeSet é ordenado, os próximos são todos futuros
            }
            if let Some(entry) = expiry.pop_first() {
                due.push(entry);
            }
        }
        drop(expiry);

        for ExpiryEntry(_, key) in due {
            // Só remove se realmente expirou (pode ter sido re-setado)
            if shared.data.remove_if(&key, |_, e| e.is_expired()).is_some() {
                debug!("key expirada removida: {key}");
            }
        }
    }
}
