#![forbid(unsafe_code)]

mod adapter;
mod aof;
mod entry;
mod expiring;
mod memory;
mod record;

pub use adapter::{Adapter, Capabilities};
pub use aof::{AofAdapter, FsyncPolicy};
pub use expiring::ExpiringMemoryAdapter;
pub use memory::MemoryAdapter;
pub use record::Record;
