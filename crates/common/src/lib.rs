#![forbid(unsafe_code)]

mod error;
mod pattern;

pub use error::*;
pub use pattern::glob_match;

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 6399;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const MAX_CONNECTIONS: usize = 1024;
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// TTL aplicado quando o chamador não informa nenhum.
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(60 * 60);

pub const DEFAULT_LOCK_TTL: Duration = Duration::from_millis(10_000);
pub const DEFAULT_LOCK_RETRY_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_LOCK_RETRIES: u32 = 10;

/// Capacidades padrão do backend local, por namespace.
pub const DEFAULT_VALUES_CAPACITY: usize = 10_000;
pub const DEFAULT_HASHES_CAPACITY: usize = 1_000;
pub const DEFAULT_LOCKS_CAPACITY: usize = 1_000;

/// Quantidade de chaves pedida por iteração de SCAN.
pub const DEFAULT_SCAN_COUNT: usize = 100;
