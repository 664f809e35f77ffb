use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use kvbridge_common::SerializationError;

/// Par encode/decode plugável usado pelo Store.
///
/// Deve satisfazer `decode(encode(v)) == v` para todo valor representável,
/// inclusive valores nulos e `Slot::Undefined`.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, SerializationError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializationError>;
}

/// Codec padrão, baseado em JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, SerializationError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        serde_json::from_slice(bytes).map_err(|e| SerializationError::Decode(e.to_string()))
    }
}
