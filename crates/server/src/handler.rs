use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::debug;

use stormcache_common::{ConnectionError, DEFAULT_SCAN_COUNT, StorageError};
use stormcache_protocol::{Command, Connection, Frame, Script};
use stormcache_storage::Db;

/// Loop principal de tratamento de uma conexão.
pub async fn handle_connection(
    mut conn: Connection,
    db: Db,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let frame = tokio::select! {
            result = conn.read_frame() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let frame = match frame {
            Some(f) => f,
            None => return Ok(()), // EOF
        };

        let response = match Command::from_frame(frame) {
            Ok(cmd) => {
                debug!("comando recebido: {cmd:?}");
                execute_command(&cmd, &db)
            }
            Err(e) => Frame::Error(format!("ERR {e}")),
        };

        conn.write_frame(&response).await?;
    }
}

/// Executa um comando e retorna o Frame de resposta.
pub fn execute_command(cmd: &Command, db: &Db) -> Frame {
    match cmd {
        Command::Ping(msg) => match msg {
            Some(m) => Frame::Bulk(m.clone()),
            None => Frame::Simple("PONG".into()),
        },
        Command::Get(key) => reply(db.get(key), |value| match value {
            Some(v) => Frame::Bulk(v),
            None => Frame::Null,
        }),
        Command::Set {
            key,
            value,
            options,
        } => {
            if db.set(key.clone(), value.clone(), options) {
                Frame::ok()
            } else {
                Frame::Null // condição NX/XX não satisfeita
            }
        }
        Command::Del(keys) => Frame::Integer(db.del(keys) as i64),
        Command::HSet { key, fields } => {
            reply(db.hset(key, fields), |created| Frame::Integer(created as i64))
        }
        Command::HGet { key, field } => reply(db.hget(key, field), |value| match value {
            Some(v) => Frame::Bulk(v),
            None => Frame::Null,
        }),
        Command::HDel { key, fields } => {
            reply(db.hdel(key, fields), |removed| Frame::Integer(removed as i64))
        }
        Command::HGetAll(key) => reply(db.hgetall(key), |pairs| {
            let mut flat = Vec::with_capacity(pairs.len() * 2);
            for (field, value) in pairs {
                flat.push(Frame::Bulk(Bytes::from(field)));
                flat.push(Frame::Bulk(value));
            }
            Frame::Array(flat)
        }),
        Command::PExpire { key, ms } => {
            reply(db.pexpire(key, *ms), |updated| Frame::Integer(updated as i64))
        }
        Command::Scan {
            cursor,
            pattern,
            count,
        } => {
            let (next, keys) = db.scan(
                *cursor,
                pattern.as_deref(),
                count.unwrap_or(DEFAULT_SCAN_COUNT),
            );
            Frame::Array(vec![
                Frame::bulk(&next.to_string()),
                Frame::Array(keys.iter().map(|k| Frame::bulk(k)).collect()),
            ])
        }
        Command::Eval { script, keys, args } => execute_script(script, keys, args, db),
        Command::Unknown(name) => Frame::Error(format!("ERR unknown command '{name}'")),
    }
}

/// EVAL restrito aos scripts de lock conhecidos.
fn execute_script(source: &str, keys: &[String], args: &[Bytes], db: &Db) -> Frame {
    let Some(script) = Script::from_source(source) else {
        return Frame::Error("ERR unsupported script".into());
    };
    let [key] = keys else {
        return Frame::Error("ERR script expects exactly one key".into());
    };
    if args.len() != script.arity() {
        return Frame::Error("ERR wrong number of script arguments".into());
    }

    let result = match script {
        Script::CompareAndDelete => db.del_if_eq(key, &args[0]),
        Script::CompareAndExpire => match parse_ms(&args[1]) {
            Some(ms) => db.pexpire_if_eq(key, &args[0], ms),
            None => return Frame::Error("ERR value is not an integer or out of range".into()),
        },
    };
    reply(result, |done| Frame::Integer(done as i64))
}

fn parse_ms(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

fn reply<T>(result: Result<T, StorageError>, ok: impl FnOnce(T) -> Frame) -> Frame {
    match result {
        Ok(value) => ok(value),
        Err(StorageError::WrongType) => Frame::Error(
            "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
        ),
        Err(e) => Frame::Error(format!("ERR {e}")),
    }
}
