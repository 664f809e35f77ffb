use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};
use tokio::time::{Duration, Instant};
use tracing::debug;

use kvbridge_common::StorageError;

use crate::entry::Entry;
use crate::{Adapter, Capabilities};

/// Item no BTreeSet de expiração: (instante, chave).
/// Ordenado por instante para purga eficiente.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
struct ExpiryEntry(Instant, String);

/// Estado compartilhado entre todos os handles.
struct SharedState {
    data: DashMap<String, Entry>,
    expiry: Mutex<BTreeSet<ExpiryEntry>>,
    notify_expiry: Notify,
}

/// Backend em memória com TTL nativo.
///
/// Entradas vencidas nunca são devolvidas (checagem lazy em cada acesso) e são
/// removidas por uma task de purga em background. Deve ser criado dentro de
/// um runtime tokio.
#[derive(Clone)]
pub struct ExpiringMemoryAdapter {
    shared: Arc<SharedState>,
}

impl ExpiringMemoryAdapter {
    pub fn new() -> Self {
        let adapter = ExpiringMemoryAdapter {
            shared: Arc::new(SharedState {
                data: DashMap::new(),
                expiry: Mutex::new(BTreeSet::new()),
                notify_expiry: Notify::new(),
            }),
        };

        // Spawn background task para purgar keys expiradas
        let shared = adapter.shared.clone();
        tokio::spawn(async move {
            purge_expired_keys(shared).await;
        });

        adapter
    }

    /// Número de entradas fisicamente presentes, vencidas ou não.
    pub fn len(&self) -> usize {
        self.shared.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.data.is_empty()
    }

    fn live(&self, key: &str) -> Option<Bytes> {
        let entry = self.shared.data.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.shared.data.remove_if(key, |_, e| e.is_expired());
            return None;
        }
        Some(entry.value.clone())
    }
}

impl Default for ExpiringMemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for ExpiringMemoryAdapter {
    fn name(&self) -> &'static str {
        "expiring-memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { ttl_support: true }
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.live(key))
    }

    async fn set(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.shared
            .data
            .insert(key.to_string(), Entry::new(value, expires_at));

        if let Some(when) = expires_at {
            let mut expiry = self.shared.expiry.lock().await;
            expiry.insert(ExpiryEntry(when, key.to_string()));
            drop(expiry);
            self.shared.notify_expiry.notify_one();
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        // Entrada vencida ainda não purgada conta como inexistente
        Ok(self
            .shared
            .data
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired()))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.shared.data.clear();
        self.shared.expiry.lock().await.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .shared
            .data
            .iter()
            .filter(|e| !e.is_expired())
            .map(|e| e.key().clone())
            .collect())
    }

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .shared
            .data
            .get(key)
            .is_some_and(|entry| !entry.is_expired()))
    }
}

impl SharedState {
    async fn next_deadline(&self) -> Option<Instant> {
        self.expiry.lock().await.first().map(|ExpiryEntry(when, _)| *when)
    }

    /// Remove as entradas cujo prazo já passou. Um prazo antigo de uma chave
    /// regravada não apaga o valor novo.
    async fn purge_due(&self, now: Instant) {
        let mut expiry = self.expiry.lock().await;
        while expiry.first().is_some_and(|ExpiryEntry(when, _)| *when <= now) {
            let Some(ExpiryEntry(_, key)) = expiry.pop_first() else {
                break;
            };
            if self.data.remove_if(&key, |_, e| e.is_expired()).is_some() {
                debug!("key expirada removida: {key}");
            }
        }
    }
}

/// Task de purga: dorme até o prazo mais próximo ou até um `set` novo.
async fn purge_expired_keys(shared: Arc<SharedState>) {
    loop {
        let Some(when) = shared.next_deadline().await else {
            shared.notify_expiry.notified().await;
            continue;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(when) => shared.purge_due(Instant::now()).await,
            _ = shared.notify_expiry.notified() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_set_basic() {
        let adapter = ExpiringMemoryAdapter::new();
        adapter.set("key", Bytes::from("value"), None).await.unwrap();
        assert_eq!(adapter.get("key").await.unwrap(), Some(Bytes::from("value")));
    }

    #[tokio::test]
    async fn declares_ttl_support() {
        let adapter = ExpiringMemoryAdapter::new();
        assert!(adapter.capabilities().ttl_support);
    }

    #[tokio::test(start_paused = true)]
    async fn set_with_expiry() {
        let adapter = ExpiringMemoryAdapter::new();
        adapter
            .set("key", Bytes::from("value"), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(adapter.has("key").await.unwrap());

        tokio::time::advance(Duration::from_millis(51)).await;
        assert_eq!(adapter.get("key").await.unwrap(), None);
        assert!(!adapter.has("key").await.unwrap());
    }

    #[tokio::test]
    async fn purge_task_removes_expired() {
        let adapter = ExpiringMemoryAdapter::new();
        adapter
            .set("key", Bytes::from("value"), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(adapter.len(), 1);

        // Sem nenhum acesso, a task de purga deve remover a entrada
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(adapter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_old_deadline() {
        let adapter = ExpiringMemoryAdapter::new();
        adapter
            .set("key", Bytes::from("v1"), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        adapter.set("key", Bytes::from("v2"), None).await.unwrap();

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(adapter.get("key").await.unwrap(), Some(Bytes::from("v2")));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_expired_reports_false() {
        let adapter = ExpiringMemoryAdapter::new();
        adapter
            .set("key", Bytes::from("v"), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(!adapter.delete("key").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_is_already_expired() {
        let adapter = ExpiringMemoryAdapter::new();
        adapter
            .set("key", Bytes::from("v"), Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(adapter.get("key").await.unwrap(), None);
        assert!(!adapter.has("key").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_skip_expired() {
        let adapter = ExpiringMemoryAdapter::new();
        adapter.set("a", Bytes::from("1"), None).await.unwrap();
        adapter
            .set("b", Bytes::from("2"), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(adapter.keys().await.unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let adapter = ExpiringMemoryAdapter::new();
        adapter.set("a", Bytes::from("1"), None).await.unwrap();
        adapter
            .set("b", Bytes::from("2"), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        adapter.clear().await.unwrap();
        assert!(adapter.is_empty());
        adapter.clear().await.unwrap();
    }
}
