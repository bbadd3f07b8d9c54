//! Site backend - one async interface over both storage adapters
//!
//! Callers (CLI, HTTP API, message board) address records with string ids:
//! the position rendered as a decimal for the local adapter, the
//! `objectId` for the remote adapter. Field maps are validated against the
//! collection's record type before any storage call.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::collection::Collection;
use crate::model::{self, Message, Record, SiteData};
use crate::storage::kv::KeyValueStore;
use crate::storage::remote::{take_id, ObjectStorage};
use crate::storage::{LocalStore, RemoteStore};
use crate::{Error, Result};

/// A record together with the id used to address it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[async_trait]
pub trait SiteBackend: Send + Sync {
    /// Short name for logs and status output
    fn name(&self) -> &'static str;

    /// Records of `collection` in display order
    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>>;

    /// Create (no id) or overwrite a record, returning its id
    async fn save(&self, collection: Collection, fields: Map<String, Value>, id: Option<&str>) -> Result<String>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Add one like to a message, returning the new count
    async fn like(&self, id: &str) -> Result<u64>;

    /// The whole dataset as a JSON blob
    async fn export(&self) -> Result<String> {
        Err(Error::Unsupported("export"))
    }

    /// Replace the whole dataset from a JSON blob
    async fn import(&self, _blob: &str) -> Result<SiteData> {
        Err(Error::Unsupported("import"))
    }

    /// Write the dataset to a backup file, returning its path
    async fn export_file(&self, _dest: &Path) -> Result<PathBuf> {
        Err(Error::Unsupported("export"))
    }

    /// Replace the dataset from a backup file; `on_success` runs once it is stored
    async fn import_file(&self, _path: &Path, _on_success: ImportCallback) -> Result<SiteData> {
        Err(Error::Unsupported("import"))
    }

    /// Restore the seed dataset
    async fn reset(&self) -> Result<SiteData> {
        Err(Error::Unsupported("reset"))
    }
}

/// Called with the imported dataset after it replaced the stored one
pub type ImportCallback = Box<dyn FnOnce(&SiteData) + Send>;

/// Local adapter behind a mutex so read-modify-write cycles never interleave
pub struct LocalBackend<K: KeyValueStore> {
    store: Mutex<LocalStore<K>>,
}

impl<K: KeyValueStore> LocalBackend<K> {
    pub fn new(store: LocalStore<K>) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }
}

fn parse_index(collection: Collection, id: &str) -> Result<usize> {
    id.parse()
        .map_err(|_| Error::NotFound(format!("{}[{}]", collection, id)))
}

#[async_trait]
impl<K: KeyValueStore + 'static> SiteBackend for LocalBackend<K> {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>> {
        let store = self.store.lock().await;
        Ok(store
            .list_fields(collection)
            .into_iter()
            .enumerate()
            .map(|(index, fields)| StoredRecord {
                id: index.to_string(),
                fields,
            })
            .collect())
    }

    async fn save(&self, collection: Collection, fields: Map<String, Value>, id: Option<&str>) -> Result<String> {
        let index = id.map(|id| parse_index(collection, id)).transpose()?;
        let store = self.store.lock().await;
        let index = store.save_fields(collection, fields, index)?;
        Ok(index.to_string())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let index = parse_index(collection, id)?;
        self.store.lock().await.remove_at(collection, index)
    }

    async fn like(&self, id: &str) -> Result<u64> {
        let index = parse_index(Collection::Messages, id)?;
        self.store.lock().await.like_message(index)
    }

    async fn export(&self) -> Result<String> {
        self.store.lock().await.raw_blob()
    }

    async fn import(&self, blob: &str) -> Result<SiteData> {
        self.store.lock().await.import_str(blob)
    }

    async fn export_file(&self, dest: &Path) -> Result<PathBuf> {
        self.store.lock().await.export_data(dest)
    }

    async fn import_file(&self, path: &Path, on_success: ImportCallback) -> Result<SiteData> {
        self.store.lock().await.import_data(path, on_success)
    }

    async fn reset(&self) -> Result<SiteData> {
        self.store.lock().await.reset()
    }
}

/// Remote adapter; every call is a request of its own
pub struct RemoteBackend<S: ObjectStorage> {
    store: RemoteStore<S>,
}

impl<S: ObjectStorage> RemoteBackend<S> {
    pub fn new(store: RemoteStore<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ObjectStorage + 'static> SiteBackend for RemoteBackend<S> {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>> {
        self.store
            .fetch_all(collection)
            .await?
            .into_iter()
            .map(|mut fields| -> Result<StoredRecord> {
                let id = take_id(&mut fields)?;
                Ok(StoredRecord { id, fields })
            })
            .collect()
    }

    async fn save(&self, collection: Collection, fields: Map<String, Value>, id: Option<&str>) -> Result<String> {
        let fields = model::validate_fields(collection, fields)?;
        self.store.save_item(collection, fields, id).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.store.delete_item(collection, id).await
    }

    /// Read then write; concurrent likes on the service are last-write-wins
    async fn like(&self, id: &str) -> Result<u64> {
        let StoredRecord { mut fields, .. } = self
            .list(Collection::Messages)
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| Error::NotFound(format!("{}[{}]", Collection::Messages, id)))?;

        let mut message = Message::from_fields(fields.clone())?;
        let likes = message.like();
        fields.insert("likes".to_string(), Value::from(likes));
        self.save(Collection::Messages, fields, Some(id)).await?;
        Ok(likes)
    }
}
