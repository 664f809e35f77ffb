use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use kvbridge_common::StorageError;

/// Capacidades opcionais declaradas por um backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// O backend expira entradas sozinho a partir do TTL passado em `set`.
    /// Quando `false`, o Store carimba a expiração no próprio valor.
    pub ttl_support: bool,
}

/// Contrato mínimo que todo backend precisa implementar.
///
/// Os valores são opacos para o backend: ele deve devolver em `get` exatamente
/// os bytes recebidos em `set`. `has`, `get_many` e `set_many` têm
/// implementações padrão em termos das operações obrigatórias; backends com
/// suporte nativo podem sobrescrevê-las.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Nome curto usado em logs.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// Grava ou substitui a entrada. Backends sem `ttl_support` ignoram `ttl`.
    async fn set(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError>;

    /// Retorna se havia uma entrada para remover.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Remove todas as entradas. Idempotente.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Chaves atualmente armazenadas, sem ordem definida.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Bytes>>, StorageError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    async fn set_many(
        &self,
        entries: Vec<(String, Bytes)>,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(&key, value, ttl).await?;
        }
        Ok(())
    }
}
