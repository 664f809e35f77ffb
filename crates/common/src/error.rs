/// Erros de backend (I/O, conectividade, estado interno).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend indisponível: {0}")]
    Unavailable(String),
    #[error("falha no backend: {0}")]
    Backend(String),
    #[error("dados corrompidos: {0}")]
    Corrupted(String),
}

/// Erros de codificação/decodificação de valores.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("falha ao codificar valor: {0}")]
    Encode(String),
    #[error("falha ao decodificar valor: {0}")]
    Decode(String),
}

/// Erros de parsing de registros do arquivo AOF.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("registro incompleto")]
    Incomplete,
    #[error("opcode inválido: {0:#x}")]
    InvalidOp(u8),
    #[error("campo excede tamanho máximo ({0} bytes)")]
    FieldTooLarge(usize),
    #[error("encoding inválido: {0}")]
    InvalidEncoding(String),
}

impl From<RecordError> for StorageError {
    fn from(e: RecordError) -> Self {
        StorageError::Corrupted(e.to_string())
    }
}

/// Erros de configuração do Store, detectados na construção.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("namespace {0:?} não pode conter o separador ':'")]
    InvalidNamespace(String),
}

/// Erro top-level visto pelo cliente do Store.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Result type alias.
pub type KvResult<T> = Result<T, KvError>;

// Conversão implícita de io::Error → KvError (via StorageError)
impl From<std::io::Error> for KvError {
    fn from(e: std::io::Error) -> Self {
        KvError::Storage(StorageError::Io(e))
    }
}
