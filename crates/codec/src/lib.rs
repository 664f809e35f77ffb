#![forbid(unsafe_code)]

mod codec;
mod envelope;
mod slot;

pub use codec::{Codec, JsonCodec};
pub use envelope::Envelope;
pub use slot::Slot;
