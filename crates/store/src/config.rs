use std::time::Duration;

use kvbridge_common::{ConfigError, DEFAULT_NAMESPACE, NAMESPACE_SEPARATOR};

/// Configuração de um Store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Prefixo aplicado às chaves (`namespace:chave`). `None` desativa.
    /// Só muda via `namespace()`, que valida o valor.
    pub(crate) namespace: Option<String>,
    /// TTL aplicado quando `set` não recebe um.
    pub ttl: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: Some(DEFAULT_NAMESPACE.to_string()),
            ttl: None,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define o namespace. Não pode conter o separador: `clear` e `iter`
    /// casam chaves por prefixo, e `a` alcançaria as chaves de `a:b`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Result<Self, ConfigError> {
        let namespace = namespace.into();
        if namespace.contains(NAMESPACE_SEPARATOR) {
            return Err(ConfigError::InvalidNamespace(namespace));
        }
        self.namespace = Some(namespace);
        Ok(self)
    }

    pub fn without_namespace(mut self) -> Self {
        self.namespace = None;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// TTL efetivo de uma escrita. Zero vence na hora da gravação.
    pub(crate) fn resolve_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.or(self.ttl)
    }

    pub(crate) fn prefix(&self) -> Option<String> {
        self.namespace
            .as_ref()
            .map(|ns| format!("{ns}{NAMESPACE_SEPARATOR}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_keyv_namespace() {
        let config = StoreConfig::default();
        assert_eq!(config.prefix().as_deref(), Some("keyv:"));
        assert_eq!(config.ttl, None);
    }

    #[test]
    fn explicit_ttl_wins_over_default() {
        let config = StoreConfig::new().ttl(Duration::from_secs(60));
        assert_eq!(
            config.resolve_ttl(Some(Duration::from_secs(1))),
            Some(Duration::from_secs(1))
        );
        assert_eq!(config.resolve_ttl(None), Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_ttl_is_kept() {
        let config = StoreConfig::new().ttl(Duration::ZERO);
        assert_eq!(config.resolve_ttl(None), Some(Duration::ZERO));
        assert_eq!(
            StoreConfig::new().resolve_ttl(Some(Duration::ZERO)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn namespace_can_be_disabled() {
        let config = StoreConfig::new()
            .namespace("cache")
            .unwrap()
            .without_namespace();
        assert_eq!(config.prefix(), None);
    }

    #[test]
    fn namespace_rejects_separator() {
        let err = StoreConfig::new().namespace("a:b").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNamespace(ns) if ns == "a:b"));

        let config = StoreConfig::new().namespace("users").unwrap();
        assert_eq!(config.prefix().as_deref(), Some("users:"));
    }
}
