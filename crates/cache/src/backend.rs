use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use stormcache_common::CacheResult;

/// Contrato comum dos backends, em nível de string.
///
/// Valores chegam já serializados; a fachada [`crate::Cache`] cuida do JSON.
/// Chaves são normalizadas para minúsculas por todas as implementações;
/// campos de hash não.
///
/// Leituras nunca falham por ausência: `None`/mapa vazio. Escritas só falham
/// em erro real do backend.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Abre recursos do backend. Idempotente.
    async fn start(&self) -> CacheResult<()> {
        Ok(())
    }

    /// Libera recursos do backend. Operações posteriores podem falhar.
    async fn stop(&self) -> CacheResult<()> {
        Ok(())
    }

    /// Token de posse desta instância, gerado uma vez na construção.
    fn owner_token(&self) -> &str;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Sobrescreve valor e expiração. `None` usa o TTL padrão do backend.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()>;

    async fn remove(&self, key: &str) -> CacheResult<()>;

    /// Chaves vivas que casam com o glob (`*` = zero ou mais caracteres).
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Seta um campo e renova o TTL do hash inteiro.
    async fn set_in_hash(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> CacheResult<()>;

    async fn get_from_hash(&self, key: &str, field: &str) -> CacheResult<Option<String>>;

    /// Remove um campo; o hash some quando fica vazio.
    async fn remove_from_hash(&self, key: &str, field: &str) -> CacheResult<()>;

    async fn get_all_hash_fields(&self, key: &str) -> CacheResult<HashMap<String, String>>;

    // --- Primitivas do lock ---

    /// Grava `token` em `key` se não houver entrada viva. Atômico.
    async fn try_claim(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool>;

    /// Remove `key` se o valor atual for `token`. Atômico.
    async fn release_if_owner(&self, key: &str, token: &str) -> CacheResult<bool>;

    /// Renova o TTL de `key` se o valor atual for `token`. Atômico.
    async fn extend_if_owner(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool>;
}

/// Política única de chaves para todos os backends.
pub(crate) fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

/// Token de posse aleatório.
pub(crate) fn new_owner_token() -> String {
    uuid::Uuid::new_v4().to_string()
}
