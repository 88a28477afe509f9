/// Erros de parsing do protocolo RESP.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("byte de tipo inválido: {0:#x}")]
    InvalidFrameType(u8),
    #[error("inteiro inválido: {0}")]
    InvalidInteger(String),
    #[error("comprimento de bulk inválido: {0}")]
    InvalidBulkLength(i64),
    #[error("frame excede tamanho máximo ({0} bytes)")]
    FrameTooLarge(usize),
    #[error("encoding inválido: {0}")]
    InvalidEncoding(String),
}

/// Erros do engine de armazenamento do servidor.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("operação contra chave com tipo errado")]
    WrongType,
    #[error("tempo de expiração inválido")]
    InvalidExpire,
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Erros de parsing/validação de comandos.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("número errado de argumentos para '{0}'")]
    WrongArity(String),
    #[error("opção inválida para SET: {0}")]
    InvalidSetOption(String),
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}

/// Erro top-level da API de cache.
///
/// `LockNotAcquired`, `LockNotReleased` e `LockNotRenewed` são sentinelas de
/// contenção/posse: o chamador deve tratá-las explicitamente. As demais
/// variantes são falhas do backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("lock não adquirido: {key}")]
    LockNotAcquired { key: String },
    #[error("lock não liberado: {key}")]
    LockNotReleased { key: String },
    #[error("lock não renovado: {key}")]
    LockNotRenewed { key: String },
    #[error("aquisição do lock cancelada: {key}")]
    LockCancelled { key: String },
    #[error("backend não conectado")]
    NotConnected,
    #[error("erro do servidor: {0}")]
    Server(String),
    #[error("resposta inesperada para {command}: {response}")]
    UnexpectedResponse { command: String, response: String },
    #[error("serialização: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result type alias.
pub type CacheResult<T> = Result<T, CacheError>;

// Conversão implícita de io::Error → CacheError (via ConnectionError)
impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Connection(ConnectionError::Io(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::Incomplete;
        assert_eq!(err.to_string(), "frame incompleto");
    }

    #[test]
    fn lock_errors_name_the_key() {
        let err = CacheError::LockNotAcquired { key: "jobs:sync".into() };
        assert_eq!(err.to_string(), "lock não adquirido: jobs:sync");

        let err = CacheError::LockNotReleased { key: "jobs:sync".into() };
        assert_eq!(err.to_string(), "lock não liberado: jobs:sync");
    }

    #[test]
    fn cache_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken");
        let err: CacheError = io_err.into();
        assert!(matches!(
            err,
            CacheError::Connection(ConnectionError::Io(_))
        ));
    }

    #[test]
    fn cache_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn command_error_display() {
        let err = CommandError::WrongArity("GET".into());
        assert_eq!(err.to_string(), "número errado de argumentos para 'GET'");
    }
}
