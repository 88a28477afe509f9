use bytes::Bytes;
use stormcache_common::CommandError;

use crate::{Frame, Parse};

/// Condição para SET (NX ou XX).
#[derive(Debug, Clone, PartialEq)]
pub enum SetCondition {
    /// Só seta se a chave não existir.
    Nx,
    /// Só seta se a chave já existir.
    Xx,
}

/// Opções do comando SET.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetOptions {
    pub expire_ms: Option<u64>,
    pub condition: Option<SetCondition>,
}

/// Subconjunto de comandos Redis usado pelo backend compartilhado.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping(Option<Bytes>),
    Get(String),
    Set {
        key: String,
        value: Bytes,
        options: SetOptions,
    },
    Del(Vec<String>),
    HSet {
        key: String,
        fields: Vec<(String, Bytes)>,
    },
    HGet {
        key: String,
        field: String,
    },
    HDel {
        key: String,
        fields: Vec<String>,
    },
    HGetAll(String),
    PExpire {
        key: String,
        ms: u64,
    },
    Scan {
        cursor: u64,
        pattern: Option<String>,
        count: Option<usize>,
    },
    Eval {
        script: String,
        keys: Vec<String>,
        args: Vec<Bytes>,
    },
    Unknown(String),
}

impl Command {
    /// Faz o parse de um Frame em um Command.
    pub fn from_frame(frame: Frame) -> Result<Command, CommandError> {
        let mut parse = Parse::new(frame)?;
        let cmd_name = parse.next_string()?.to_uppercase();

        let cmd = match cmd_name.as_str() {
            "PING" => {
                let msg = if parse.has_remaining() {
                    Some(parse.next_bytes()?)
                } else {
                    None
                };
                parse.finish()?;
                Command::Ping(msg)
            }
            "GET" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Command::Get(key)
            }
            "SET" => parse_set(&mut parse)?,
            "DEL" => {
                if !parse.has_remaining() {
                    return Err(CommandError::WrongArity("DEL".into()));
                }
                Command::Del(parse.rest_strings()?)
            }
            "HSET" => {
                let key = parse.next_string()?;
                if !parse.has_remaining() || parse.remaining() % 2 != 0 {
                    return Err(CommandError::WrongArity("HSET".into()));
                }
                let mut fields = Vec::with_capacity(parse.remaining() / 2);
                while parse.has_remaining() {
                    let field = parse.next_string()?;
                    let value = parse.next_bytes()?;
                    fields.push((field, value));
                }
                Command::HSet { key, fields }
            }
            "HGET" => {
                let key = parse.next_string()?;
                let field = parse.next_string()?;
                parse.finish()?;
                Command::HGet { key, field }
            }
            "HDEL" => {
                let key = parse.next_string()?;
                if !parse.has_remaining() {
                    return Err(CommandError::WrongArity("HDEL".into()));
                }
                let fields = parse.rest_strings()?;
                Command::HDel { key, fields }
            }
            "HGETALL" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Command::HGetAll(key)
            }
            "PEXPIRE" => {
                let key = parse.next_string()?;
                let ms = parse.next_u64()?;
                parse.finish()?;
                Command::PExpire { key, ms }
            }
            "SCAN" => parse_scan(&mut parse)?,
            "EVAL" => {
                let script = parse.next_string()?;
                let numkeys = parse.next_u64()? as usize;
                if parse.remaining() < numkeys {
                    return Err(CommandError::WrongArity("EVAL".into()));
                }
                let mut keys = Vec::with_capacity(numkeys);
                for _ in 0..numkeys {
                    keys.push(parse.next_string()?);
                }
                let args = parse.rest_bytes()?;
                Command::Eval { script, keys, args }
            }
            _ => Command::Unknown(cmd_name),
        };

        Ok(cmd)
    }

    /// Nome do comando, para logs e mensagens de erro.
    pub fn name(&self) -> &str {
        match self {
            Command::Ping(_) => "PING",
            Command::Get(_) => "GET",
            Command::Set { .. } => "SET",
            Command::Del(_) => "DEL",
            Command::HSet { .. } => "HSET",
            Command::HGet { .. } => "HGET",
            Command::HDel { .. } => "HDEL",
            Command::HGetAll(_) => "HGETALL",
            Command::PExpire { .. } => "PEXPIRE",
            Command::Scan { .. } => "SCAN",
            Command::Eval { .. } => "EVAL",
            Command::Unknown(name) => name,
        }
    }

    /// Encoda o comando como Frame para envio via RESP.
    pub fn to_frame(&self) -> Frame {
        let mut parts = vec![Frame::bulk(self.name())];
        match self {
            Command::Ping(msg) => {
                parts.extend(msg.iter().cloned().map(Frame::Bulk));
            }
            Command::Get(key) | Command::HGetAll(key) => parts.push(Frame::bulk(key)),
            Command::Set {
                key,
                value,
                options,
            } => {
                parts.push(Frame::bulk(key));
                parts.push(Frame::Bulk(value.clone()));
                if let Some(ms) = options.expire_ms {
                    parts.push(Frame::bulk("PX"));
                    parts.push(Frame::bulk(&ms.to_string()));
                }
                match options.condition {
                    Some(SetCondition::Nx) => parts.push(Frame::bulk("NX")),
                    Some(SetCondition::Xx) => parts.push(Frame::bulk("XX")),
                    None => {}
                }
            }
            Command::Del(keys) => parts.extend(keys.iter().map(|k| Frame::bulk(k))),
            Command::HSet { key, fields } => {
                parts.push(Frame::bulk(key));
                for (field, value) in fields {
                    parts.push(Frame::bulk(field));
                    parts.push(Frame::Bulk(value.clone()));
                }
            }
            Command::HGet { key, field } => {
                parts.push(Frame::bulk(key));
                parts.push(Frame::bulk(field));
            }
            Command::HDel { key, fields } => {
                parts.push(Frame::bulk(key));
                parts.extend(fields.iter().map(|f| Frame::bulk(f)));
            }
            Command::PExpire { key, ms } => {
                parts.push(Frame::bulk(key));
                parts.push(Frame::bulk(&ms.to_string()));
            }
            Command::Scan {
                cursor,
                pattern,
                count,
            } => {
                parts.push(Frame::bulk(&cursor.to_string()));
                if let Some(pattern) = pattern {
                    parts.push(Frame::bulk("MATCH"));
                    parts.push(Frame::bulk(pattern));
                }
                if let Some(count) = count {
                    parts.push(Frame::bulk("COUNT"));
                    parts.push(Frame::bulk(&count.to_string()));
                }
            }
            Command::Eval { script, keys, args } => {
                parts.push(Frame::bulk(script));
                parts.push(Frame::bulk(&keys.len().to_string()));
                parts.extend(keys.iter().map(|k| Frame::bulk(k)));
                parts.extend(args.iter().cloned().map(Frame::Bulk));
            }
            Command::Unknown(_) => {}
        }
        Frame::Array(parts)
    }
}

fn parse_set(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    let value = parse.next_bytes()?;

    let mut options = SetOptions::default();

    while parse.has_remaining() {
        let opt = parse.next_string()?.to_uppercase();
        match opt.as_str() {
            "EX" => {
                let secs = parse.next_int()?;
                if secs <= 0 {
                    return Err(CommandError::InvalidSetOption(
                        "EX deve ser positivo".into(),
                    ));
                }
                options.expire_ms = Some(secs as u64 * 1000);
            }
            "PX" => {
                let ms = parse.next_int()?;
                if ms <= 0 {
                    return Err(CommandError::InvalidSetOption(
                        "PX deve ser positivo".into(),
                    ));
                }
                options.expire_ms = Some(ms as u64);
            }
            "NX" => {
                options.condition = Some(SetCondition::Nx);
            }
            "XX" => {
                options.condition = Some(SetCondition::Xx);
            }
            other => {
                return Err(CommandError::InvalidSetOption(other.to_string()));
            }
        }
    }

    Ok(Command::Set {
        key,
        value,
        options,
    })
}

fn parse_scan(parse: &mut Parse) -> Result<Command, CommandError> {
    let cursor = parse.next_u64()?;
    let mut pattern = None;
    let mut count = None;

    while parse.has_remaining() {
        let opt = parse.next_string()?.to_uppercase();
        match opt.as_str() {
            "MATCH" => pattern = Some(parse.next_string()?),
            "COUNT" => {
                let n = parse.next_u64()?;
                if n == 0 {
                    return Err(CommandError::InvalidArgument(
                        "COUNT deve ser positivo".into(),
                    ));
                }
                count = Some(n as usize);
            }
            other => {
                return Err(CommandError::InvalidArgument(format!(
                    "opção inválida para SCAN: {other}"
                )));
            }
        }
    }

    Ok(Command::Scan {
        cursor,
        pattern,
        count,
    })
}
