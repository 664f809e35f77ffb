#![forbid(unsafe_code)]

mod clock;
mod config;
pub mod expiry;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use store::Store;

pub use kvbridge_codec::{Codec, Envelope, JsonCodec, Slot};
pub use kvbridge_common::{ConfigError, KvError, KvResult, SerializationError, StorageError};
pub use kvbridge_storage::{
    Adapter, AofAdapter, Capabilities, ExpiringMemoryAdapter, FsyncPolicy, MemoryAdapter,
};
