//! [`RecordStore`](spool_core::RecordStore) adapters.

pub mod memory;
pub mod redis;

pub use self::memory::InMemoryStore;
pub use self::redis::{RedisStore, RedisStoreSettings};
pub use spool_core::repository::Result;
pub use spool_core::{RecordStore, StorageError};
