use bytes::Bytes;
use stormcache_common::CommandError;

use crate::Frame;

/// Cursor sobre um Frame::Array para extrair argumentos sequencialmente.
pub struct Parse {
    parts: std::vec::IntoIter<Frame>,
}

impl Parse {
    /// Cria um Parse a partir de um Frame. O frame deve ser Array.
    pub fn new(frame: Frame) -> Result<Parse, CommandError> {
        match frame {
            Frame::Array(parts) => Ok(Parse {
                parts: parts.into_iter(),
            }),
            _ => Err(CommandError::InvalidArgument("esperado array".into())),
        }
    }

    /// Retorna o próximo elemento como String (de Bulk ou Simple).
    pub fn next_string(&mut self) -> Result<String, CommandError> {
        match self.next()? {
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(data) => String::from_utf8(data.to_vec())
                .map_err(|_| CommandError::InvalidArgument("string UTF-8 inválida".into())),
            _ => Err(CommandError::InvalidArgument(
                "esperado string ou bulk".into(),
            )),
        }
    }

    /// Retorna o próximo elemento como Bytes (de Bulk).
    pub fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        match self.next()? {
            Frame::Bulk(data) => Ok(data),
            Frame::Simple(s) => Ok(Bytes::from(s)),
            _ => Err(CommandError::InvalidArgument("esperado bulk".into())),
        }
    }

    /// Retorna o próximo elemento como i64.
    pub fn next_int(&mut self) -> Result<i64, CommandError> {
        match self.next()? {
            Frame::Integer(n) => Ok(n),
            Frame::Bulk(data) => {
                let s = std::str::from_utf8(&data)
                    .map_err(|_| CommandError::InvalidArgument("inteiro inválido".into()))?;
                parse_int(s)
            }
            Frame::Simple(s) => parse_int(&s),
            _ => Err(CommandError::InvalidArgument("esperado inteiro".into())),
        }
    }

    /// Retorna o próximo elemento como inteiro não negativo.
    pub fn next_u64(&mut self) -> Result<u64, CommandError> {
        let n = self.next_int()?;
        u64::try_from(n)
            .map_err(|_| CommandError::InvalidArgument(format!("'{n}' não pode ser negativo")))
    }

    /// Consome todos os argumentos restantes como Bytes.
    pub fn rest_bytes(&mut self) -> Result<Vec<Bytes>, CommandError> {
        let mut values = Vec::with_capacity(self.remaining());
        while self.has_remaining() {
            values.push(self.next_bytes()?);
        }
        Ok(values)
    }

    /// Consome todos os argumentos restantes como String.
    pub fn rest_strings(&mut self) -> Result<Vec<String>, CommandError> {
        let mut values = Vec::with_capacity(self.remaining());
        while self.has_remaining() {
            values.push(self.next_string()?);
        }
        Ok(values)
    }

    /// Verifica se todos os argumentos foram consumidos.
    pub fn finish(&self) -> Result<(), CommandError> {
        if self.has_remaining() {
            Err(CommandError::InvalidArgument(
                "argumentos extras não esperados".into(),
            ))
        } else {
            Ok(())
        }
    }

    /// Verifica se ainda há argumentos restantes.
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Retorna o número de argumentos restantes.
    pub fn remaining(&self) -> usize {
        self.parts.len()
    }

    fn next(&mut self) -> Result<Frame, CommandError> {
        self.parts.next().ok_or_else(|| {
            CommandError::InvalidArgument("argumentos insuficientes".into())
        })
    }
}

fn parse_int(s: &str) -> Result<i64, CommandError> {
    s.parse::<i64>()
        .map_err(|_| CommandError::InvalidArgument(format!("'{s}' não é um inteiro")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_strings() {
        let frame = Frame::array_from_strs(&["HGET", "session:1", "user"]);
        let mut parse = Parse::new(frame).unwrap();
        assert_eq!(parse.next_string().unwrap(), "HGET");
        assert_eq!(parse.next_string().unwrap(), "session:1");
        assert_eq!(parse.next_string().unwrap(), "user");
        parse.finish().unwrap();
    }

    #[test]
    fn parse_cursor_as_u64() {
        let frame = Frame::array_from_strs(&["SCAN", "42"]);
        let mut parse = Parse::new(frame).unwrap();
        parse.next_string().unwrap();
        assert_eq!(parse.next_u64().unwrap(), 42);
    }

    #[test]
    fn parse_negative_cursor_fails() {
        let frame = Frame::array_from_strs(&["SCAN", "-1"]);
        let mut parse = Parse::new(frame).unwrap();
        parse.next_string().unwrap();
        assert!(parse.next_u64().is_err());
    }

    #[test]
    fn parse_rest_collects_remaining() {
        let frame = Frame::array_from_strs(&["DEL", "a", "b"]);
        let mut parse = Parse::new(frame).unwrap();
        parse.next_string().unwrap();
        assert_eq!(parse.rest_strings().unwrap(), vec!["a", "b"]);
        assert!(!parse.has_remaining());
    }

    #[test]
    fn parse_not_array_fails() {
        let frame = Frame::Simple("OK".into());
        assert!(Parse::new(frame).is_err());
    }

    #[test]
    fn parse_extra_args_fails_finish() {
        let frame = Frame::array_from_strs(&["PING", "extra"]);
        let mut parse = Parse::new(frame).unwrap();
        parse.next_string().unwrap();
        assert!(parse.finish().is_err());
    }

    #[test]
    fn parse_insufficient_args() {
        let frame = Frame::array_from_strs(&["GET"]);
        let mut parse = Parse::new(frame).unwrap();
        parse.next_string().unwrap();
        assert!(parse.next_string().is_err());
    }
}
