#![forbid(unsafe_code)]

mod error;

pub use error::*;

/// Namespace aplicado às chaves quando a configuração não define outro.
pub const DEFAULT_NAMESPACE: &str = "keyv";
/// Separador entre namespace e chave (`namespace:chave`).
pub const NAMESPACE_SEPARATOR: char = ':';
/// Capacidade do channel entre o AofAdapter e a task de escrita.
pub const AOF_CHANNEL_CAPACITY: usize = 10_000;
/// Tamanho máximo de uma chave ou valor num registro AOF.
pub const MAX_RECORD_FIELD_SIZE: usize = 64 * 1024 * 1024; // 64 MB
