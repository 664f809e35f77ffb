use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use kvbridge_codec::{Codec, Envelope, JsonCodec, Slot};
use kvbridge_common::{KvResult, SerializationError};
use kvbridge_storage::{Adapter, Capabilities};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::expiry::{self, EntryState};

const ITER_BUFFER: usize = 64;

/// Fachada key-value sobre qualquer `Adapter`.
///
/// Chaves ausentes e chaves expiradas são indistinguíveis: `get` devolve
/// `None` e `has` devolve `false`. Quando o backend não tem TTL nativo a
/// expiração é carimbada no valor e checada em cada leitura; entradas
/// vencidas são removidas do backend no caminho (best-effort).
pub struct Store<C: Codec = JsonCodec> {
    adapter: Arc<dyn Adapter>,
    capabilities: Capabilities,
    codec: Arc<C>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl<C: Codec> Clone for Store<C> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            capabilities: self.capabilities,
            codec: self.codec.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
        }
    }
}

impl Store<JsonCodec> {
    pub fn new(adapter: impl Adapter + 'static) -> Self {
        Self::with_config(adapter, StoreConfig::default())
    }

    pub fn with_config(adapter: impl Adapter + 'static, config: StoreConfig) -> Self {
        Self::from_shared(Arc::new(adapter), config)
    }

    /// Store sobre um backend compartilhado com outros Stores (ex.: um por namespace).
    pub fn from_shared(adapter: Arc<dyn Adapter>, config: StoreConfig) -> Self {
        let capabilities = adapter.capabilities();
        debug!(
            "store criado: backend={} ttl_nativo={} namespace={:?}",
            adapter.name(),
            capabilities.ttl_support,
            config.namespace
        );
        Self {
            adapter,
            capabilities,
            codec: Arc::new(JsonCodec),
            clock: Arc::new(SystemClock),
            config,
        }
    }
}

impl<C: Codec> Store<C> {
    pub fn with_codec<D: Codec>(self, codec: D) -> Store<D> {
        Store {
            adapter: self.adapter,
            capabilities: self.capabilities,
            codec: Arc::new(codec),
            clock: self.clock,
            config: self.config,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    // --- Escrita ---

    /// Grava `value` em `key`, substituindo qualquer entrada anterior.
    /// Sem `ttl`, usa o TTL padrão da configuração (se houver).
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> KvResult<bool>
    where
        T: Serialize + ?Sized,
    {
        self.put(key, Slot::Defined(value), ttl).await
    }

    /// Grava o sentinela "indefinido": `has` passa a ser `true`, `get` continua `None`.
    pub async fn set_undefined(&self, key: &str, ttl: Option<Duration>) -> KvResult<bool> {
        self.put::<()>(key, Slot::Undefined, ttl).await
    }

    pub async fn set_many<T>(&self, entries: &[(&str, T)], ttl: Option<Duration>) -> KvResult<bool>
    where
        T: Serialize,
    {
        let ttl = self.config.resolve_ttl(ttl);
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let bytes = self.encode(Slot::Defined(value), ttl)?;
            encoded.push((self.storage_key(key), bytes));
        }
        self.adapter.set_many(encoded, ttl).await?;
        Ok(true)
    }

    async fn put<T>(&self, key: &str, value: Slot<&T>, ttl: Option<Duration>) -> KvResult<bool>
    where
        T: Serialize + ?Sized,
    {
        let ttl = self.config.resolve_ttl(ttl);
        let bytes = self.encode(value, ttl)?;
        self.adapter.set(&self.storage_key(key), bytes, ttl).await?;
        Ok(true)
    }

    // --- Leitura ---

    /// Valor vivo em `key`. `None` se ausente, expirado ou indefinido.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> KvResult<Option<T>> {
        Ok(self.get_slot(key).await?.and_then(Slot::into_option))
    }

    /// Como `get`, mas distingue "indefinido armazenado" de "ausente".
    pub async fn get_slot<T: DeserializeOwned>(&self, key: &str) -> KvResult<Option<Slot<T>>> {
        let skey = self.storage_key(key);
        let raw = self.adapter.get(&skey).await?;
        self.resolve(&skey, raw).await
    }

    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[&str]) -> KvResult<Vec<Option<T>>> {
        let skeys: Vec<String> = keys.iter().map(|key| self.storage_key(key)).collect();
        let raws = self.adapter.get_many(&skeys).await?;

        let mut values = Vec::with_capacity(raws.len());
        for (skey, raw) in skeys.iter().zip(raws) {
            let slot = self.resolve::<T>(skey, raw).await?;
            values.push(slot.and_then(Slot::into_option));
        }
        Ok(values)
    }

    pub async fn has(&self, key: &str) -> KvResult<bool> {
        let skey = self.storage_key(key);
        if self.capabilities.ttl_support {
            return Ok(self.adapter.has(&skey).await?);
        }
        // Sem TTL nativo é preciso olhar o carimbo, não só a existência
        let raw = self.adapter.get(&skey).await?;
        Ok(self.resolve::<IgnoredAny>(&skey, raw).await?.is_some())
    }

    /// Stream com as entradas vivas (e definidas) do namespace.
    /// Entradas vencidas encontradas no caminho são removidas.
    pub fn iter<T>(&self) -> ReceiverStream<KvResult<(String, T)>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(ITER_BUFFER);
        let store = self.clone();
        tokio::spawn(async move {
            if let Err(e) = store.walk(&tx).await {
                let _ = tx.send(Err(e)).await;
            }
        });
        ReceiverStream::new(rx)
    }

    async fn walk<T>(&self, tx: &mpsc::Sender<KvResult<(String, T)>>) -> KvResult<()>
    where
        T: DeserializeOwned + Send,
    {
        let prefix = self.config.prefix();
        for skey in self.adapter.keys().await? {
            let key = match &prefix {
                Some(prefix) => match skey.strip_prefix(prefix.as_str()) {
                    Some(key) => key.to_string(),
                    None => continue,
                },
                None => skey.clone(),
            };

            let raw = self.adapter.get(&skey).await?;
            if let Some(Slot::Defined(value)) = self.resolve::<T>(&skey, raw).await?
                && tx.send(Ok((key, value))).await.is_err()
            {
                // Consumidor descartou o stream
                break;
            }
        }
        Ok(())
    }

    // --- Remoção ---

    /// Retorna se havia uma entrada viva para remover. Idempotente.
    ///
    /// Uma entrada vencida ainda não limpa conta como ausente: é removida do
    /// backend e o resultado é `false`, como no backend com TTL nativo.
    pub async fn delete(&self, key: &str) -> KvResult<bool> {
        let skey = self.storage_key(key);
        if !self.capabilities.ttl_support {
            let raw = self.adapter.get(&skey).await?;
            // Valor ilegível ainda pode ser removido
            if let Ok(None) = self.resolve::<IgnoredAny>(&skey, raw).await {
                return Ok(false);
            }
        }
        Ok(self.adapter.delete(&skey).await?)
    }

    /// `true` se todas as chaves existiam.
    pub async fn delete_many(&self, keys: &[&str]) -> KvResult<bool> {
        let mut all = true;
        for key in keys {
            all &= self.delete(key).await?;
        }
        Ok(all)
    }

    /// Remove todas as entradas do namespace (ou do backend inteiro, sem namespace).
    pub async fn clear(&self) -> KvResult<()> {
        match self.config.prefix() {
            None => self.adapter.clear().await?,
            Some(prefix) => {
                for skey in self.adapter.keys().await? {
                    if skey.starts_with(&prefix) {
                        self.adapter.delete(&skey).await?;
                    }
                }
            }
        }
        Ok(())
    }

    // --- Internos ---

    fn storage_key(&self, key: &str) -> String {
        match self.config.prefix() {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        }
    }

    fn encode<T>(&self, value: Slot<&T>, ttl: Option<Duration>) -> Result<Bytes, SerializationError>
    where
        T: Serialize + ?Sized,
    {
        let expires = if self.capabilities.ttl_support {
            None
        } else {
            ttl.map(|ttl| expiry::deadline(self.clock.now_ms(), ttl))
        };
        self.codec.encode(&Envelope::new(value, expires))
    }

    /// Decodifica e aplica a política de expiração a um valor lido do backend.
    async fn resolve<T: DeserializeOwned>(
        &self,
        skey: &str,
        raw: Option<Bytes>,
    ) -> KvResult<Option<Slot<T>>> {
        let envelope = match raw {
            Some(raw) => Some(self.codec.decode::<Envelope<T>>(&raw)?),
            None => None,
        };

        match expiry::evaluate(envelope, self.clock.now_ms()) {
            EntryState::Live(slot) => Ok(Some(slot)),
            EntryState::Absent => Ok(None),
            EntryState::Expired => {
                self.evict(skey).await;
                Ok(None)
            }
        }
    }

    /// Remove uma entrada vencida. Falhas só são logadas: a leitura que
    /// disparou a limpeza continua reportando ausência.
    async fn evict(&self, skey: &str) {
        match self.adapter.delete(skey).await {
            Ok(_) => debug!("key expirada removida: {skey}"),
            Err(e) => warn!(
                "falha ao remover key expirada {skey} do backend {}: {e}",
                self.adapter.name()
            ),
        }
    }
}
