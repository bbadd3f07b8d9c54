//! Local store adapter
//!
//! The whole site lives in one JSON blob under `STORAGE_KEY`. Every mutation
//! is load, modify, save: the blob is rewritten in full or not at all.
//! Records carry no identifier here; they are addressed by position.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::kv::{KeyValueStore, MemoryKv, SqliteKv};
use crate::collection::Collection;
use crate::model::{self, CodingLink, Event, Message, Record, Resource, SiteData};
use crate::{Error, Result};

/// Key of the site blob
pub const STORAGE_KEY: &str = "cxnet_data_v1";

/// File name used when exporting into a directory
pub const EXPORT_FILE_NAME: &str = "cxnet_data_backup.json";

/// Repository over the site blob, owning its key-value handle
pub struct LocalStore<K: KeyValueStore> {
    kv: K,
}

impl LocalStore<SqliteKv> {
    /// Open the SQLite-backed store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(SqliteKv::open(path)?))
    }
}

impl LocalStore<MemoryKv> {
    pub fn in_memory() -> Self {
        Self::new(MemoryKv::new())
    }
}

impl<K: KeyValueStore> LocalStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Read the stored dataset.
    ///
    /// Absent, unreadable or mis-shaped blobs all yield the seed dataset.
    pub fn load(&self) -> SiteData {
        let blob = match self.kv.get(STORAGE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return SiteData::seed(),
            Err(e) => {
                tracing::warn!("Failed to read site blob, using defaults: {}", e);
                return SiteData::seed();
            }
        };

        match SiteData::parse(&blob) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Ignoring stored blob: {}", e);
                SiteData::seed()
            }
        }
    }

    /// Read the dataset ahead of a write.
    ///
    /// Only an absent blob falls back to the seed. Read failures and stored
    /// blobs that do not parse are errors, so a mutation never replaces
    /// existing data with the defaults.
    fn load_for_update(&self) -> Result<SiteData> {
        match self.kv.get(STORAGE_KEY)? {
            Some(blob) => Ok(SiteData::parse(&blob)?),
            None => Ok(SiteData::seed()),
        }
    }

    /// Overwrite the stored blob with `data`
    pub fn save(&self, data: &SiteData) -> Result<()> {
        let blob = serde_json::to_string(data)?;
        self.kv.set(STORAGE_KEY, &blob)?;
        tracing::debug!("Saved site blob ({} bytes)", blob.len());
        Ok(())
    }

    /// The stored blob as-is, or the serialized seed when nothing is stored
    pub fn raw_blob(&self) -> Result<String> {
        match self.kv.get(STORAGE_KEY)? {
            Some(blob) => Ok(blob),
            None => Ok(serde_json::to_string(&SiteData::seed())?),
        }
    }

    /// Write the stored blob to a file.
    ///
    /// When `dest` is a directory the file is named `EXPORT_FILE_NAME`.
    pub fn export_data(&self, dest: &Path) -> Result<PathBuf> {
        let path = export_target(dest);
        std::fs::write(&path, self.raw_blob()?)?;
        tracing::info!("Exported site data to {}", path.display());
        Ok(path)
    }

    /// Replace the stored blob with the contents of a backup file.
    ///
    /// `on_success` runs only after the new blob is written. On any failure
    /// the stored data is left untouched.
    pub fn import_data<F>(&self, path: &Path, on_success: F) -> Result<SiteData>
    where
        F: FnOnce(&SiteData),
    {
        let text = std::fs::read_to_string(path)?;
        let data = self.import_str(&text)?;
        on_success(&data);
        Ok(data)
    }

    /// Shape-check `text` and store it as the new blob
    pub fn import_str(&self, text: &str) -> Result<SiteData> {
        let data = SiteData::parse(text)?;
        self.save(&data)?;
        tracing::info!("Imported site data");
        Ok(data)
    }

    /// Restore the seed dataset
    pub fn reset(&self) -> Result<SiteData> {
        let data = SiteData::seed();
        self.save(&data)?;
        Ok(data)
    }

    // ========== Typed record operations ==========

    /// Append a record, returning its position
    pub fn insert<R: Record>(&self, record: R) -> Result<usize> {
        record.validate()?;
        let mut data = self.load_for_update()?;
        let records = R::select_mut(&mut data);
        records.push(record);
        let index = records.len() - 1;
        self.save(&data)?;
        Ok(index)
    }

    /// Replace the record at `index`
    pub fn replace<R: Record>(&self, index: usize, record: R) -> Result<()> {
        record.validate()?;
        let mut data = self.load_for_update()?;
        let slot = R::select_mut(&mut data)
            .get_mut(index)
            .ok_or_else(|| not_found(R::COLLECTION, index))?;
        *slot = record;
        self.save(&data)
    }

    /// Remove and return the record at `index`
    pub fn remove<R: Record>(&self, index: usize) -> Result<R> {
        let mut data = self.load_for_update()?;
        let records = R::select_mut(&mut data);
        if index >= records.len() {
            return Err(not_found(R::COLLECTION, index));
        }
        let removed = records.remove(index);
        self.save(&data)?;
        Ok(removed)
    }

    /// Add one like to the message at `index`, returning the new count
    pub fn like_message(&self, index: usize) -> Result<u64> {
        let mut data = self.load_for_update()?;
        let likes = data
            .messages
            .get_mut(index)
            .ok_or_else(|| not_found(Collection::Messages, index))?
            .like();
        self.save(&data)?;
        Ok(likes)
    }

    // ========== Untyped operations by collection ==========

    pub fn list_fields(&self, collection: Collection) -> Vec<Map<String, Value>> {
        self.load().fields_of(collection)
    }

    /// Insert (no index) or replace (index) a record given as a field map
    pub fn save_fields(
        &self,
        collection: Collection,
        fields: Map<String, Value>,
        index: Option<usize>,
    ) -> Result<usize> {
        fn save_as<R: Record, K: KeyValueStore>(
            store: &LocalStore<K>,
            fields: Map<String, Value>,
            index: Option<usize>,
        ) -> Result<usize> {
            let record = R::from_fields(fields)?;
            match index {
                Some(index) => store.replace(index, record).map(|_| index),
                None => store.insert(record),
            }
        }

        let fields = model::validate_fields(collection, fields)?;
        match collection {
            Collection::Resources => save_as::<Resource, K>(self, fields, index),
            Collection::Coding => save_as::<CodingLink, K>(self, fields, index),
            Collection::Events => save_as::<Event, K>(self, fields, index),
            Collection::Messages => save_as::<Message, K>(self, fields, index),
        }
    }

    pub fn remove_at(&self, collection: Collection, index: usize) -> Result<()> {
        match collection {
            Collection::Resources => self.remove::<Resource>(index).map(|_| ()),
            Collection::Coding => self.remove::<CodingLink>(index).map(|_| ()),
            Collection::Events => self.remove::<Event>(index).map(|_| ()),
            Collection::Messages => self.remove::<Message>(index).map(|_| ()),
        }
    }
}

/// Where an export to `dest` lands: inside it when it is a directory
pub fn export_target(dest: &Path) -> PathBuf {
    if dest.is_dir() {
        dest.join(EXPORT_FILE_NAME)
    } else {
        dest.to_path_buf()
    }
}

fn not_found(collection: Collection, index: usize) -> Error {
    Error::NotFound(format!("{}[{}]", collection, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationError;

    fn sample_data() -> SiteData {
        SiteData {
            resources: vec![Resource::new("Rust Book", "The official book")],
            coding: vec![CodingLink::new("Exercism", "https://exercism.org/")],
            events: Vec::new(),
            messages: vec![Message {
                name: "B".to_string(),
                content: "hi".to_string(),
                time: "2024/03/01 12:00:00".to_string(),
                likes: 2,
            }],
        }
    }

    #[test]
    fn test_load_absent_returns_seed() {
        let store = LocalStore::in_memory();
        assert_eq!(store.load(), SiteData::seed());
    }

    #[test]
    fn test_load_malformed_returns_seed() {
        let kv = MemoryKv::new();
        kv.set(STORAGE_KEY, "{not json").unwrap();
        assert_eq!(LocalStore::new(kv).load(), SiteData::seed());

        let kv = MemoryKv::new();
        kv.set(STORAGE_KEY, r#"{"resources": [], "coding": []}"#).unwrap();
        assert_eq!(LocalStore::new(kv).load(), SiteData::seed());
    }

    /// A key-value store whose reads always fail, counting attempted writes
    #[derive(Default)]
    struct UnreadableKv {
        writes: std::sync::atomic::AtomicUsize,
    }

    impl KeyValueStore for UnreadableKv {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Io(std::io::Error::other("database is locked")))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    const MISTYPED_BLOB: &str = r#"{"resources": [{"title": "Club Wiki", "desc": null, "img": "", "link": ""}],
        "coding": [], "events": [], "messages": [{"content": "hi", "likes": "3"}]}"#;

    #[test]
    fn test_load_keeps_blob_with_mistyped_fields() {
        let kv = MemoryKv::new();
        kv.set(STORAGE_KEY, MISTYPED_BLOB).unwrap();
        let store = LocalStore::new(kv);

        let data = store.load();
        assert_eq!(data.resources.len(), 1);
        assert_eq!(data.resources[0].title, "Club Wiki");
        assert_eq!(data.messages[0].likes, 3);

        store.insert(CodingLink::new("Rustlings", "https://rustlings.dev")).unwrap();
        let blob = store.raw_blob().unwrap();
        assert!(blob.contains("Club Wiki"));
        assert!(blob.contains("Rustlings"));
    }

    #[test]
    fn test_import_accepts_mistyped_fields() {
        let store = LocalStore::in_memory();
        let data = store.import_str(MISTYPED_BLOB).unwrap();
        assert_eq!(data.resources[0].desc, "");
        assert_eq!(store.load(), data);
    }

    #[test]
    fn test_mutation_never_overwrites_unparsable_blob() {
        let kv = MemoryKv::new();
        kv.set(STORAGE_KEY, r#"{"resources": [{"title": ["wiki"]}], "coding": [], "events": [], "messages": []}"#)
            .unwrap();
        let store = LocalStore::new(kv);
        let before = store.raw_blob().unwrap();

        // Reads still fall back to the defaults
        assert_eq!(store.load(), SiteData::seed());

        let err = store.insert(CodingLink::new("Rustlings", "https://rustlings.dev")).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MalformedJson(_))));
        assert!(store.remove::<Event>(0).is_err());
        assert!(store.like_message(0).is_err());
        assert_eq!(store.raw_blob().unwrap(), before);
    }

    #[test]
    fn test_mutation_propagates_read_failure() {
        let store = LocalStore::new(UnreadableKv::default());
        assert_eq!(store.load(), SiteData::seed());

        let err = store.insert(Resource::new("Slides", "")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(store.replace(0, Resource::new("Slides", "")).is_err());
        assert!(store.remove::<Resource>(0).is_err());
        assert!(store.like_message(0).is_err());
        assert_eq!(store.kv.writes.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = LocalStore::in_memory();
        let data = sample_data();
        store.save(&data).unwrap();
        assert_eq!(store.load(), data);
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cxnet.db");

        LocalStore::open(&db).unwrap().save(&sample_data()).unwrap();
        assert_eq!(LocalStore::open(&db).unwrap().load(), sample_data());
    }

    #[test]
    fn test_export_matches_stored_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::in_memory();
        store.save(&sample_data()).unwrap();

        let path = store.export_data(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), EXPORT_FILE_NAME);

        let exported = std::fs::read_to_string(&path).unwrap();
        assert_eq!(exported, store.raw_blob().unwrap());
        assert_eq!(SiteData::parse(&exported).unwrap(), sample_data());
    }

    #[test]
    fn test_export_without_saved_data_writes_seed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::in_memory();
        let path = store.export_data(&dir.path().join("backup.json")).unwrap();

        let exported = std::fs::read_to_string(path).unwrap();
        assert_eq!(SiteData::parse(&exported).unwrap(), SiteData::seed());
    }

    #[test]
    fn test_import_replaces_blob_and_calls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);
        std::fs::write(&path, serde_json::to_string(&sample_data()).unwrap()).unwrap();

        let store = LocalStore::in_memory();
        let mut called = false;
        let imported = store.import_data(&path, |_| called = true).unwrap();

        assert!(called);
        assert_eq!(imported, sample_data());
        assert_eq!(store.load(), sample_data());
    }

    #[test]
    fn test_import_bad_shape_leaves_data_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"resources": [], "coding": [], "events": []}"#).unwrap();

        let store = LocalStore::in_memory();
        store.save(&sample_data()).unwrap();
        let before = store.raw_blob().unwrap();

        let mut called = false;
        let err = store.import_data(&path, |_| called = true).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingCollection("messages"))
        ));
        assert!(!called);
        assert_eq!(store.raw_blob().unwrap(), before);
    }

    #[test]
    fn test_import_unparsable_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "<<<").unwrap();

        let store = LocalStore::in_memory();
        let err = store.import_data(&path, |_| {}).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MalformedJson(_))));
        assert_eq!(store.load(), SiteData::seed());
    }

    #[test]
    fn test_insert_replace_remove() {
        let store = LocalStore::in_memory();

        let index = store.insert(CodingLink::new("Rustlings", "https://rustlings.dev")).unwrap();
        assert_eq!(index, 3);

        store.replace(0, CodingLink::new("LeetCode", "https://leetcode.com/")).unwrap();
        let removed: CodingLink = store.remove(1).unwrap();
        assert_eq!(removed.name, "菜鸟教程");

        let names: Vec<_> = store.load().coding.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["LeetCode", "力扣题解精选", "Rustlings"]);
    }

    #[test]
    fn test_invalid_record_is_not_written() {
        let store = LocalStore::in_memory();
        let err = store.insert(Resource::new("", "no title")).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::Required { field: "title" })));
        assert_eq!(store.kv.get(STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_index() {
        let store = LocalStore::in_memory();
        assert!(matches!(store.remove::<Event>(10), Err(Error::NotFound(_))));
        assert!(matches!(store.like_message(0), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_post_and_like_message() {
        let store = LocalStore::in_memory();
        assert!(store.load().messages.is_empty());

        let index = store.insert(Message::new("A", "hello").unwrap()).unwrap();
        let messages = store.load().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].likes, 0);
        assert!(!messages[0].time.is_empty());

        assert_eq!(store.like_message(index).unwrap(), 1);
        assert_eq!(store.load().messages[0].likes, 1);
    }

    #[test]
    fn test_save_fields_validates_by_collection() {
        let store = LocalStore::in_memory();
        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::from("Hackathon"));
        fields.insert("img".to_string(), Value::from("https://example.com/h.png"));

        let index = store.save_fields(Collection::Events, fields, None).unwrap();
        let events = store.list_fields(Collection::Events);
        assert_eq!(events[index]["title"], "Hackathon");
        assert_eq!(events[index]["desc"], "");

        let err = store.save_fields(Collection::Coding, Map::new(), None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        store.remove_at(Collection::Events, index).unwrap();
        assert_eq!(store.list_fields(Collection::Events).len(), 4);
    }
}
