//! Storage Layer - local blob store and hosted object storage
//!
//! Two adapters, picked one per deployment:
//! - `LocalStore`: the whole site as one JSON blob under a fixed key in a
//!   key-value store (SQLite table `kv` by default)
//! - `RemoteStore`: one record per object in hosted tables
//!   (`Resources`, `Coding`, `Events`, `Messages`), sorted by `order`

pub mod schema;
pub mod kv;
pub mod local;
pub mod remote;
pub mod leancloud;

pub use kv::{KeyValueStore, MemoryKv, SqliteKv};
pub use local::{export_target, LocalStore, EXPORT_FILE_NAME, STORAGE_KEY};
pub use remote::{MemoryObjectStorage, ObjectStorage, RemoteStore, ID_FIELD, ORDER_FIELD};
pub use leancloud::LeanCloudClient;
