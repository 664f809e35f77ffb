//! Política de expiração lazy: o estado de uma entrada é função apenas do
//! carimbo gravado e do "agora" no momento da leitura.

use std::time::Duration;

use kvbridge_codec::{Envelope, Slot};

/// Estado lógico de uma entrada no momento da leitura.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState<T> {
    Absent,
    Expired,
    Live(Slot<T>),
}

/// Instante (epoch ms) a partir do qual uma entrada gravada em `now_ms` com
/// `ttl` deixa de estar viva.
pub fn deadline(now_ms: u64, ttl: Duration) -> u64 {
    let ttl = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    now_ms.saturating_add(ttl)
}

pub fn is_expired(expires: Option<u64>, now_ms: u64) -> bool {
    expires.is_some_and(|at| now_ms >= at)
}

pub fn evaluate<T>(envelope: Option<Envelope<T>>, now_ms: u64) -> EntryState<T> {
    match envelope {
        None => EntryState::Absent,
        Some(env) if is_expired(env.expires, now_ms) => EntryState::Expired,
        Some(env) => EntryState::Live(env.value),
    }
}
