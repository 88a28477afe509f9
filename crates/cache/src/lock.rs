use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use stormcache_common::{
    CacheError, CacheResult, DEFAULT_LOCK_RETRIES, DEFAULT_LOCK_RETRY_DELAY, DEFAULT_LOCK_TTL,
};

use crate::cache::Cache;

/// Parâmetros de aquisição de lock.
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Expiração da entrada de lock; libera o lock se o dono morrer.
    pub ttl: Duration,
    /// Espera fixa entre tentativas.
    pub retry_delay: Duration,
    /// Número de tentativas. Zero ainda faz uma.
    pub retries: u32,
    /// Interrompe a sequência de tentativas com `LockCancelled`.
    pub cancel: Option<CancellationToken>,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_LOCK_TTL,
            retry_delay: DEFAULT_LOCK_RETRY_DELAY,
            retries: DEFAULT_LOCK_RETRIES,
            cancel: None,
        }
    }
}

impl LockOptions {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

impl Cache {
    /// Adquire o lock de `key` com o token de posse deste backend.
    ///
    /// Faz até `retries` tentativas de set-if-absent espaçadas por
    /// `retry_delay` (sem espera depois da última). Readquirir um lock que a
    /// própria instância já segura falha como qualquer disputa.
    pub async fn acquire_lock(&self, key: &str, opts: LockOptions) -> CacheResult<()> {
        let token = self.backend.owner_token();
        let attempts = opts.retries.max(1);

        for attempt in 1..=attempts {
            if opts.is_cancelled() {
                return Err(CacheError::LockCancelled { key: key.to_string() });
            }

            if self.backend.try_claim(key, token, opts.ttl).await? {
                debug!("lock {key} adquirido na tentativa {attempt}");
                return Ok(());
            }
            debug!("lock {key} ocupado (tentativa {attempt}/{attempts})");

            if attempt < attempts {
                self.wait_retry(key, &opts).await?;
            }
        }

        Err(CacheError::LockNotAcquired { key: key.to_string() })
    }

    /// Libera o lock só se o token guardado for o desta instância.
    pub async fn release_lock(&self, key: &str) -> CacheResult<()> {
        let token = self.backend.owner_token();
        if self.backend.release_if_owner(key, token).await? {
            debug!("lock {key} liberado");
            return Ok(());
        }
        debug!("lock {key} não pertence a esta instância ou já expirou");
        Err(CacheError::LockNotReleased { key: key.to_string() })
    }

    /// Como [`Cache::acquire_lock`], mas disputa perdida vira `false`.
    pub async fn try_acquire_lock(&self, key: &str, opts: LockOptions) -> CacheResult<bool> {
        match self.acquire_lock(key, opts).await {
            Ok(()) => Ok(true),
            Err(CacheError::LockNotAcquired { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Como [`Cache::release_lock`], mas lock alheio ou ausente vira `false`.
    pub async fn try_release_lock(&self, key: &str) -> CacheResult<bool> {
        match self.release_lock(key).await {
            Ok(()) => Ok(true),
            Err(CacheError::LockNotReleased { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reaplica o TTL de um lock que ainda pertence a esta instância.
    pub async fn renew_lock(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        let token = self.backend.owner_token();
        if self.backend.extend_if_owner(key, token, ttl).await? {
            debug!("lock {key} renovado por {ttl:?}");
            return Ok(());
        }
        Err(CacheError::LockNotRenewed { key: key.to_string() })
    }

    async fn wait_retry(&self, key: &str, opts: &LockOptions) -> CacheResult<()> {
        let Some(cancel) = &opts.cancel else {
            tokio::time::sleep(opts.retry_delay).await;
            return Ok(());
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("aquisição do lock {key} cancelada");
                Err(CacheError::LockCancelled { key: key.to_string() })
            }
            _ = tokio::time::sleep(opts.retry_delay) => Ok(()),
        }
    }
}
