#![forbid(unsafe_code)]

//! Backends de cache intercambiáveis com lock distribuído.
//!
//! [`Cache`] é a fachada única: valores e hashes serializados em JSON e o
//! lock por token de posse. O armazenamento vem de um [`CacheBackend`]:
//! [`SharedBackend`] fala RESP com um servidor remoto compartilhado entre
//! processos; [`LocalBackend`] guarda tudo em memória com despejo LRU.

mod backend;
mod cache;
mod config;
mod local;
mod lock;
mod shared;

pub use backend::CacheBackend;
pub use cache::Cache;
pub use config::{LocalConfig, NamespaceConfig, SharedConfig};
pub use local::LocalBackend;
pub use lock::LockOptions;
pub use shared::SharedBackend;

pub use stormcache_common::{CacheError, CacheResult};
