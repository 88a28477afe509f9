use bytes::Bytes;
use std::collections::HashMap;
use tokio::time::Instant;

/// Tipo do valor armazenado.
#[derive(Debug, Clone)]
pub enum Value {
    String(Bytes),
    Hash(HashMap<String, Bytes>),
}

/// Entrada no store: valor + TTL opcional.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Value, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() >= t)
    }

    /// Valor string vivo, ou None se expirada ou de outro tipo.
    pub fn live_string(&self) -> Option<&Bytes> {
        match &self.value {
            Value::String(data) if !self.is_expired() => Some(data),
            _ => None,
        }
    }
}
