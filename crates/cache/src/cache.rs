use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use stormcache_common::CacheResult;

use crate::backend::CacheBackend;
use crate::config::{LocalConfig, SharedConfig};
use crate::local::LocalBackend;
use crate::shared::SharedBackend;

/// Fachada tipada sobre um [`CacheBackend`].
///
/// Valores passam por `serde_json` na ida e na volta. Clonar é barato: os
/// clones compartilham o mesmo backend, e portanto o mesmo token de posse
/// de lock.
#[derive(Clone)]
pub struct Cache {
    pub(crate) backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Cache em memória do processo.
    pub fn local(config: LocalConfig) -> Self {
        Self::new(LocalBackend::new(config))
    }

    /// Cache sobre o store remoto. Precisa de [`Cache::start`] antes do uso.
    pub fn shared(config: SharedConfig) -> Self {
        Self::new(SharedBackend::new(config))
    }

    pub fn backend(&self) -> &dyn CacheBackend {
        self.backend.as_ref()
    }

    pub async fn start(&self) -> CacheResult<()> {
        self.backend.start().await
    }

    pub async fn stop(&self) -> CacheResult<()> {
        self.backend.stop().await
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.backend.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, raw, ttl).await
    }

    pub async fn remove(&self, key: &str) -> CacheResult<()> {
        self.backend.remove(key).await
    }

    pub async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.backend.keys(pattern).await
    }

    pub async fn set_in_hash<T: Serialize + ?Sized>(
        &self,
        key: &str,
        field: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set_in_hash(key, field, raw, ttl).await
    }

    pub async fn get_from_hash<T: DeserializeOwned>(
        &self,
        key: &str,
        field: &str,
    ) -> CacheResult<Option<T>> {
        match self.backend.get_from_hash(key, field).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn remove_from_hash(&self, key: &str, field: &str) -> CacheResult<()> {
        self.backend.remove_from_hash(key, field).await
    }

    pub async fn get_all_hash_fields<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> CacheResult<HashMap<String, T>> {
        self.backend
            .get_all_hash_fields(key)
            .await?
            .into_iter()
            .map(|(field, raw)| -> CacheResult<(String, T)> {
                Ok((field, serde_json::from_str(&raw)?))
            })
            .collect()
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("owner_token", &self.backend.owner_token())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use stormcache_common::CacheError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        visits: u32,
    }

    fn session() -> Session {
        Session {
            user: "ana".into(),
            visits: 3,
        }
    }

    #[tokio::test]
    async fn typed_values_round_trip() {
        let cache = Cache::local(LocalConfig::default());
        cache.set("session:1", &session(), None).await.unwrap();

        let got: Option<Session> = cache.get("SESSION:1").await.unwrap();
        assert_eq!(got, Some(session()));

        cache.remove("session:1").await.unwrap();
        assert_eq!(cache.get::<Session>("session:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unsized_values_are_accepted() {
        let cache = Cache::local(LocalConfig::default());
        cache.set("greeting", "olá", None).await.unwrap();
        cache.set("list", &[1, 2, 3][..], None).await.unwrap();

        assert_eq!(cache.get::<String>("greeting").await.unwrap().as_deref(), Some("olá"));
        assert_eq!(cache.get::<Vec<i32>>("list").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn wrong_type_is_a_serialization_error() {
        let cache = Cache::local(LocalConfig::default());
        cache.set("n", &42, None).await.unwrap();
        assert!(matches!(
            cache.get::<Session>("n").await,
            Err(CacheError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn hash_fields_are_typed() {
        let cache = Cache::local(LocalConfig::default());
        cache.set_in_hash("scores", "ana", &10, None).await.unwrap();
        cache.set_in_hash("scores", "Bia", &7, None).await.unwrap();

        assert_eq!(cache.get_from_hash::<u32>("scores", "Bia").await.unwrap(), Some(7));
        assert_eq!(cache.get_from_hash::<u32>("scores", "bia").await.unwrap(), None);

        let all: HashMap<String, u32> = cache.get_all_hash_fields("SCORES").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["ana"], 10);

        cache.remove_from_hash("scores", "ana").await.unwrap();
        cache.remove_from_hash("scores", "Bia").await.unwrap();
        assert!(cache.keys("scores").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_backend() {
        let cache = Cache::local(LocalConfig::default());
        let other = cache.clone();
        other.set("k", &1, None).await.unwrap();

        assert_eq!(cache.get::<i32>("k").await.unwrap(), Some(1));
        assert_eq!(cache.backend().owner_token(), other.backend().owner_token());
    }
}
