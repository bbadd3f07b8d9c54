//! Remote store adapter over hosted object storage
//!
//! Each collection maps to a table of flat objects. Records are addressed
//! by the service-assigned `objectId` and listed ascending by `order`.
//! Every call is a single request; failures propagate to the caller
//! without retry or local fallback.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::collection::Collection;
use crate::{Error, Result};

/// Identifier field added to every fetched record
pub const ID_FIELD: &str = "objectId";

/// Sort field of every table
pub const ORDER_FIELD: &str = "order";

/// Fields maintained by the service that callers never write
const RESERVED_FIELDS: &[&str] = &[ID_FIELD, "createdAt", "updatedAt", "ACL"];

/// Hosted object storage client.
///
/// This allows for alternative implementations (the LeanCloud REST client,
/// in-memory tables for tests and offline runs).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// All objects of `class` ascending by `order_by`, each carrying `objectId`
    async fn query(&self, class: &str, order_by: &str) -> Result<Vec<Map<String, Value>>>;

    /// Create an object, returning its identifier
    async fn create(&self, class: &str, fields: &Map<String, Value>) -> Result<String>;

    /// Set each provided field on an existing object
    async fn update(&self, class: &str, object_id: &str, fields: &Map<String, Value>) -> Result<()>;

    async fn destroy(&self, class: &str, object_id: &str) -> Result<()>;
}

/// Table-level data access over an `ObjectStorage`
pub struct RemoteStore<S: ObjectStorage> {
    storage: S,
}

impl<S: ObjectStorage> RemoteStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Every record of `collection`, ascending by `order`
    #[tracing::instrument(skip(self), fields(table = collection.table()))]
    pub async fn fetch_all(&self, collection: Collection) -> Result<Vec<Map<String, Value>>> {
        let records = self.storage.query(collection.table(), ORDER_FIELD).await?;
        tracing::debug!("Fetched {} records", records.len());
        Ok(records)
    }

    /// Create (no `object_id`) or update a record, returning its identifier.
    ///
    /// New records without an explicit `order` are placed after the current
    /// last record.
    #[tracing::instrument(skip(self, data), fields(table = collection.table()))]
    pub async fn save_item(
        &self,
        collection: Collection,
        mut data: Map<String, Value>,
        object_id: Option<&str>,
    ) -> Result<String> {
        for field in RESERVED_FIELDS {
            data.remove(*field);
        }

        match object_id {
            Some(id) => {
                self.storage.update(collection.table(), id, &data).await?;
                tracing::debug!("Updated {}", id);
                Ok(id.to_string())
            }
            None => {
                if !data.contains_key(ORDER_FIELD) {
                    let next = next_order(&self.fetch_all(collection).await?);
                    data.insert(ORDER_FIELD.to_string(), Value::from(next));
                }
                let id = self.storage.create(collection.table(), &data).await?;
                tracing::debug!("Created {}", id);
                Ok(id)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(table = collection.table()))]
    pub async fn delete_item(&self, collection: Collection, object_id: &str) -> Result<()> {
        self.storage.destroy(collection.table(), object_id).await
    }
}

/// Remove and return the `objectId` of a fetched record
pub fn take_id(fields: &mut Map<String, Value>) -> Result<String> {
    match fields.remove(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id),
        _ => Err(Error::MalformedResponse("record without objectId".to_string())),
    }
}

fn order_of(fields: &Map<String, Value>) -> Option<f64> {
    fields.get(ORDER_FIELD).and_then(Value::as_f64)
}

/// One past the largest `order` in `records` (1 for an empty table)
fn next_order(records: &[Map<String, Value>]) -> i64 {
    records
        .iter()
        .filter_map(order_of)
        .fold(0_i64, |max, order| max.max(order.floor() as i64))
        + 1
}

/// In-memory object storage.
///
/// Behaves like the hosted service for the operations the adapter uses:
/// generated hex identifiers, stable ascending sort with unordered records
/// first, per-field updates.
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    tables: Mutex<HashMap<String, Vec<Map<String, Value>>>>,
    next_id: AtomicU64,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{:024x}", n)
    }

    fn missing(class: &str, object_id: &str) -> Error {
        Error::NotFound(format!("{}/{}", class, object_id))
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn query(&self, class: &str, order_by: &str) -> Result<Vec<Map<String, Value>>> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = tables.get(class).cloned().unwrap_or_default();
        records.sort_by(|a, b| {
            let a = a.get(order_by).and_then(Value::as_f64);
            let b = b.get(order_by).and_then(Value::as_f64);
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(records)
    }

    async fn create(&self, class: &str, fields: &Map<String, Value>) -> Result<String> {
        let id = self.generate_id();
        let mut record = fields.clone();
        record.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.entry(class.to_string()).or_default().push(record);
        Ok(id)
    }

    async fn update(&self, class: &str, object_id: &str, fields: &Map<String, Value>) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let record = tables
            .get_mut(class)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.get(ID_FIELD).and_then(Value::as_str) == Some(object_id))
            })
            .ok_or_else(|| Self::missing(class, object_id))?;

        for (key, value) in fields {
            record.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn destroy(&self, class: &str, object_id: &str) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let records = tables
            .get_mut(class)
            .ok_or_else(|| Self::missing(class, object_id))?;
        let before = records.len();
        records.retain(|r| r.get(ID_FIELD).and_then(Value::as_str) != Some(object_id));
        if records.len() == before {
            return Err(Self::missing(class, object_id));
        }
        Ok(())
    }
}
