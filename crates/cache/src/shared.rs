use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use stormcache_common::{CacheError, CacheResult, ConnectionError, ProtocolError};
use stormcache_protocol::{Command, Connection, Frame, Script, SetCondition, SetOptions};

use crate::backend::{CacheBackend, new_owner_token, normalize_key};
use crate::config::SharedConfig;

/// Backend sobre um servidor RESP compartilhado entre processos.
///
/// Cada primitiva vira uma única operação atômica no servidor. As
/// requisições são serializadas sobre uma conexão; uma falha de I/O derruba
/// a conexão e as chamadas seguintes falham com `NotConnected` até um novo
/// `start()`.
///
/// Uma chamada cancelada entre o envio e a leitura da resposta também
/// derruba a conexão: a resposta órfã ficaria no buffer e seria lida pela
/// chamada seguinte.
pub struct SharedBackend {
    config: SharedConfig,
    link: Mutex<Option<Link>>,
    token: String,
}

struct Link {
    conn: Connection,
    /// Ligado do envio até a última resposta lida.
    in_flight: bool,
}

impl SharedBackend {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            link: Mutex::new(None),
            token: new_owner_token(),
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Envia um comando e lê a resposta. Frames de erro viram `Server`.
    async fn request(&self, cmd: &Command) -> CacheResult<Frame> {
        let mut guard = self.link.lock().await;
        if guard.as_ref().is_some_and(|link| link.in_flight) {
            warn!(
                "conexão com {} descartada: resposta pendente de chamada cancelada",
                self.config.addr()
            );
            *guard = None;
        }
        let link = guard.as_mut().ok_or(CacheError::NotConnected)?;

        link.in_flight = true;
        let result = exchange(&mut link.conn, cmd).await;
        link.in_flight = false;
        if let Err(e) = &result {
            warn!("conexão com {} descartada: {e}", self.config.addr());
            *guard = None;
        }

        match result? {
            Frame::Error(msg) => Err(CacheError::Server(msg)),
            frame => Ok(frame),
        }
    }

    fn ttl_ms(&self, ttl: Option<Duration>) -> u64 {
        millis(ttl.unwrap_or(self.config.default_ttl))
    }
}

async fn exchange(conn: &mut Connection, cmd: &Command) -> CacheResult<Frame> {
    conn.write_frame(&cmd.to_frame()).await?;
    match conn.read_frame().await? {
        Some(frame) => Ok(frame),
        None => Err(ConnectionError::ConnectionReset.into()),
    }
}

/// Duração em milissegundos, no mínimo 1 (o servidor rejeita TTL zero).
fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn unexpected(cmd: &Command, frame: &Frame) -> CacheError {
    CacheError::UnexpectedResponse {
        command: cmd.name().to_string(),
        response: frame.to_string(),
    }
}

fn into_string(data: Bytes) -> CacheResult<String> {
    String::from_utf8(data.to_vec())
        .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()).into())
}

/// Bulk → Some, Null → None.
fn optional_string(cmd: &Command, frame: Frame) -> CacheResult<Option<String>> {
    match frame {
        Frame::Bulk(data) => into_string(data).map(Some),
        Frame::Null => Ok(None),
        other => Err(unexpected(cmd, &other)),
    }
}

fn integer(cmd: &Command, frame: Frame) -> CacheResult<i64> {
    match frame {
        Frame::Integer(n) => Ok(n),
        other => Err(unexpected(cmd, &other)),
    }
}

/// Resposta de SCAN: `[cursor, [chaves...]]`.
fn scan_page(cmd: &Command, frame: Frame) -> CacheResult<(u64, Vec<String>)> {
    let parts = match frame {
        Frame::Array(parts) if parts.len() == 2 => parts,
        other => return Err(unexpected(cmd, &other)),
    };
    let mut parts = parts.into_iter();
    let (Some(cursor), Some(keys)) = (parts.next(), parts.next()) else {
        return Err(unexpected(cmd, &Frame::Null));
    };
    let keys = match keys {
        Frame::Array(keys) => keys,
        other => return Err(unexpected(cmd, &other)),
    };

    let cursor = match cursor {
        Frame::Bulk(data) => into_string(data)?
            .parse::<u64>()
            .map_err(|e| ProtocolError::InvalidInteger(e.to_string()))?,
        Frame::Integer(n) if n >= 0 => n as u64,
        other => return Err(unexpected(cmd, &other)),
    };

    let keys = keys
        .into_iter()
        .map(|k| match k {
            Frame::Bulk(data) => into_string(data),
            other => Err(unexpected(cmd, &other)),
        })
        .collect::<CacheResult<Vec<_>>>()?;
    Ok((cursor, keys))
}

#[async_trait]
impl CacheBackend for SharedBackend {
    async fn start(&self) -> CacheResult<()> {
        let mut guard = self.link.lock().await;
        // Uma conexão com resposta pendente não é reaproveitada
        if guard.as_ref().is_some_and(|link| !link.in_flight) {
            return Ok(());
        }

        let addr = self.config.addr();
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("timeout conectando a {addr}"),
                )
            })??;
        stream.set_nodelay(true)?;

        *guard = Some(Link {
            conn: Connection::new(stream),
            in_flight: false,
        });
        info!("conectado ao store compartilhado em {addr}");
        Ok(())
    }

    async fn stop(&self) -> CacheResult<()> {
        let link = self.link.lock().await.take();
        if let Some(mut link) = link {
            // O servidor pode já ter fechado; nada a fazer nesse caso
            if let Err(e) = link.conn.shutdown().await {
                debug!("erro ao fechar conexão: {e}");
            }
            info!("desconectado de {}", self.config.addr());
        }
        Ok(())
    }

    fn owner_token(&self) -> &str {
        &self.token
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let cmd = Command::Get(normalize_key(key));
        let frame = self.request(&cmd).await?;
        optional_string(&cmd, frame)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let cmd = Command::Set {
            key: normalize_key(key),
            value: Bytes::from(value),
            options: SetOptions {
                expire_ms: Some(self.ttl_ms(ttl)),
                condition: None,
            },
        };
        match self.request(&cmd).await? {
            Frame::Simple(s) if s == "OK" => Ok(()),
            other => Err(unexpected(&cmd, &other)),
        }
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        let cmd = Command::Del(vec![normalize_key(key)]);
        let frame = self.request(&cmd).await?;
        integer(&cmd, frame).map(|_| ())
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let pattern = normalize_key(pattern);
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut cursor = 0;

        // Uma única chamada não garante todas as chaves: iterar até cursor 0
        loop {
            let cmd = Command::Scan {
                cursor,
                pattern: Some(pattern.clone()),
                count: Some(self.config.scan_count),
            };
            let frame = self.request(&cmd).await?;
            let (next, page) = scan_page(&cmd, frame)?;
            // SCAN pode repetir chaves entre páginas
            keys.extend(page.into_iter().filter(|k| seen.insert(k.clone())));
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("keys({pattern}): {} encontradas", keys.len());
        Ok(keys)
    }

    async fn set_in_hash(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let key = normalize_key(key);

        // PEXPIRE só depois de um HSET aceito: um HSET rejeitado (WRONGTYPE)
        // não pode alterar o TTL da chave existente
        let hset = Command::HSet {
            key: key.clone(),
            fields: vec![(field.to_string(), Bytes::from(value))],
        };
        let frame = self.request(&hset).await?;
        integer(&hset, frame)?;

        let pexpire = Command::PExpire {
            key,
            ms: self.ttl_ms(ttl),
        };
        let frame = self.request(&pexpire).await?;
        integer(&pexpire, frame).map(|_| ())
    }

    async fn get_from_hash(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        let cmd = Command::HGet {
            key: normalize_key(key),
            field: field.to_string(),
        };
        let frame = self.request(&cmd).await?;
        optional_string(&cmd, frame)
    }

    async fn remove_from_hash(&self, key: &str, field: &str) -> CacheResult<()> {
        // O servidor apaga a chave quando o último campo sai
        let cmd = Command::HDel {
            key: normalize_key(key),
            fields: vec![field.to_string()],
        };
        let frame = self.request(&cmd).await?;
        integer(&cmd, frame).map(|_| ())
    }

    async fn get_all_hash_fields(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let cmd = Command::HGetAll(normalize_key(key));
        let parts = match self.request(&cmd).await? {
            Frame::Array(parts) if parts.len() % 2 == 0 => parts,
            other => return Err(unexpected(&cmd, &other)),
        };

        let mut fields = HashMap::with_capacity(parts.len() / 2);
        let mut iter = parts.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            match (field, value) {
                (Frame::Bulk(f), Frame::Bulk(v)) => {
                    fields.insert(into_string(f)?, into_string(v)?);
                }
                (other, _) => return Err(unexpected(&cmd, &other)),
            }
        }
        Ok(fields)
    }

    async fn try_claim(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool> {
        let cmd = Command::Set {
            key: normalize_key(key),
            value: Bytes::copy_from_slice(token.as_bytes()),
            options: SetOptions {
                expire_ms: Some(millis(ttl)),
                condition: Some(SetCondition::Nx),
            },
        };
        match self.request(&cmd).await? {
            Frame::Simple(s) if s == "OK" => Ok(true),
            Frame::Null => Ok(false),
            other => Err(unexpected(&cmd, &other)),
        }
    }

    async fn release_if_owner(&self, key: &str, token: &str) -> CacheResult<bool> {
        let cmd = Command::Eval {
            script: Script::CompareAndDelete.source().to_string(),
            keys: vec![normalize_key(key)],
            args: vec![Bytes::copy_from_slice(token.as_bytes())],
        };
        let frame = self.request(&cmd).await?;
        Ok(integer(&cmd, frame)? == 1)
    }

    async fn extend_if_owner(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool> {
        let cmd = Command::Eval {
            script: Script::CompareAndExpire.source().to_string(),
            keys: vec![normalize_key(key)],
            args: vec![
                Bytes::copy_from_slice(token.as_bytes()),
                Bytes::from(millis(ttl).to_string()),
            ],
        };
        let frame = self.request(&cmd).await?;
        Ok(integer(&cmd, frame)? == 1)
    }
}
