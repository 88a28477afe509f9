use std::time::Duration;

use stormcache_common::{
    DEFAULT_ENTRY_TTL, DEFAULT_HASHES_CAPACITY, DEFAULT_HOST, DEFAULT_LOCK_TTL,
    DEFAULT_LOCKS_CAPACITY, DEFAULT_PORT, DEFAULT_SCAN_COUNT, DEFAULT_VALUES_CAPACITY,
};

/// Capacidade e TTL padrão de um namespace do backend local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceConfig {
    pub capacity: usize,
    pub default_ttl: Duration,
}

/// Configuração do [`crate::LocalBackend`]: um LRU por namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub values: NamespaceConfig,
    pub hashes: NamespaceConfig,
    /// A capacidade limita quantos locks podem estar vivos ao mesmo tempo:
    /// além dela o LRU despeja um lock ainda válido e outro dono pode entrar.
    pub locks: NamespaceConfig,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            values: NamespaceConfig {
                capacity: DEFAULT_VALUES_CAPACITY,
                default_ttl: DEFAULT_ENTRY_TTL,
            },
            hashes: NamespaceConfig {
                capacity: DEFAULT_HASHES_CAPACITY,
                default_ttl: DEFAULT_ENTRY_TTL,
            },
            locks: NamespaceConfig {
                capacity: DEFAULT_LOCKS_CAPACITY,
                default_ttl: DEFAULT_LOCK_TTL,
            },
        }
    }
}

/// Configuração do [`crate::SharedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedConfig {
    pub host: String,
    pub port: u16,
    /// TTL aplicado quando o chamador não informa nenhum.
    pub default_ttl: Duration,
    /// Limite para o `start()` estabelecer a conexão.
    pub connect_timeout: Duration,
    /// Valor de COUNT em cada iteração de SCAN.
    pub scan_count: usize,
}

impl SharedConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_ttl: DEFAULT_ENTRY_TTL,
            connect_timeout: Duration::from_secs(5),
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }
}
