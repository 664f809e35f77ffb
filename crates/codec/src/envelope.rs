use serde::{Deserialize, Serialize};

use crate::Slot;

/// Payload entregue ao codec: valor + carimbo de expiração opcional.
///
/// `expires` (epoch em milissegundos) só é preenchido quando o backend não
/// suporta TTL nativo; nesse caso a checagem de expiração é feita na leitura.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub value: Slot<T>,
    pub expires: Option<u64>,
}

impl<T> Envelope<T> {
    pub fn new(value: Slot<T>, expires: Option<u64>) -> Self {
        Self { value, expires }
    }
}
