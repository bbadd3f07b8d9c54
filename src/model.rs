//! Record types and the whole-site dataset
//!
//! Four record kinds are stored:
//! - `Resource`: learning material card (title, desc, img, link)
//! - `CodingLink`: named link to a coding practice site
//! - `Event`: event card, same shape as `Resource`
//! - `Message`: message board entry with a like counter
//!
//! `SiteData` is the local blob: exactly four collections under fixed keys.

use crate::collection::Collection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum length of titles and names
pub const MAX_TITLE_CHARS: usize = 50;
/// Maximum length of descriptions and coding links
pub const MAX_TEXT_CHARS: usize = 200;

/// Why a dataset or a record was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing collection `{0}`")]
    MissingCollection(&'static str),

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("field `{field}` is required")]
    Required { field: &'static str },

    #[error("field `{field}` exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

type Validation = std::result::Result<(), ValidationError>;

fn require(field: &'static str, value: &str) -> Validation {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

fn max_len(field: &'static str, value: &str, max: usize) -> Validation {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Tolerant field decoding for stored and submitted records.
///
/// Blobs written by older clients may carry `null`, numbers or booleans
/// where text is expected, and numeric strings for counters. These decode
/// to the closest value instead of failing the whole dataset.
mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(D::Error::custom(format!("expected text, got {}", other))),
        }
    }

    /// Non-negative counter; negative values clamp to zero
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let number = match Value::deserialize(deserializer)? {
            Value::Null => return Ok(0),
            Value::Bool(_) => return Ok(0),
            Value::Number(n) => n.as_f64(),
            Value::String(s) if s.trim().is_empty() => return Ok(0),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            other => return Err(D::Error::custom(format!("expected a count, got {}", other))),
        };
        match number {
            Some(n) if n.is_finite() => Ok(n.max(0.0).floor() as u64),
            _ => Err(D::Error::custom("expected a count")),
        }
    }
}

/// A record kind bound to its collection.
///
/// Field maps coming from forms, HTTP bodies or the remote store are turned
/// into typed records through this trait before being written.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    /// Check required fields and length limits
    fn validate(&self) -> Validation;

    /// This record's collection inside the dataset
    fn select_mut(data: &mut SiteData) -> &mut Vec<Self>;

    /// Build a record from a flat field map. Unknown keys are ignored.
    fn from_fields(fields: Map<String, Value>) -> std::result::Result<Self, ValidationError> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| ValidationError::InvalidRecord(e.to_string()))
    }

    /// Flatten the record into a field map
    fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub desc: String,
    /// Image URL or inline `data:` URL
    #[serde(default, deserialize_with = "lenient::text")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub link: String,
}

impl Resource {
    pub fn new(title: &str, desc: &str) -> Self {
        Self {
            title: title.to_string(),
            desc: desc.to_string(),
            ..Default::default()
        }
    }
}

impl Record for Resource {
    const COLLECTION: Collection = Collection::Resources;

    fn validate(&self) -> Validation {
        require("title", &self.title)?;
        max_len("title", &self.title, MAX_TITLE_CHARS)?;
        max_len("desc", &self.desc, MAX_TEXT_CHARS)
    }

    fn select_mut(data: &mut SiteData) -> &mut Vec<Self> {
        &mut data.resources
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodingLink {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub link: String,
}

impl CodingLink {
    pub fn new(name: &str, link: &str) -> Self {
        Self {
            name: name.to_string(),
            link: link.to_string(),
        }
    }
}

impl Record for CodingLink {
    const COLLECTION: Collection = Collection::Coding;

    fn validate(&self) -> Validation {
        require("name", &self.name)?;
        max_len("name", &self.name, MAX_TITLE_CHARS)?;
        require("link", &self.link)?;
        max_len("link", &self.link, MAX_TEXT_CHARS)
    }

    fn select_mut(data: &mut SiteData) -> &mut Vec<Self> {
        &mut data.coding
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub desc: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub link: String,
}

impl Event {
    pub fn new(title: &str, desc: &str) -> Self {
        Self {
            title: title.to_string(),
            desc: desc.to_string(),
            ..Default::default()
        }
    }
}

impl Record for Event {
    const COLLECTION: Collection = Collection::Events;

    fn validate(&self) -> Validation {
        require("title", &self.title)?;
        max_len("title", &self.title, MAX_TITLE_CHARS)?;
        max_len("desc", &self.desc, MAX_TEXT_CHARS)
    }

    fn select_mut(data: &mut SiteData) -> &mut Vec<Self> {
        &mut data.events
    }
}

/// Message board entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub content: String,
    /// Display timestamp set at creation
    #[serde(default, deserialize_with = "lenient::text")]
    pub time: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub likes: u64,
}

impl Message {
    /// Display format of `time`
    pub const TIME_FORMAT: &'static str = "%Y/%m/%d %H:%M:%S";

    /// Create a message stamped with the current local time.
    ///
    /// Both inputs are trimmed; blank content is rejected.
    pub fn new(name: &str, content: &str) -> std::result::Result<Self, ValidationError> {
        let message = Self {
            name: name.trim().to_string(),
            content: content.trim().to_string(),
            time: chrono::Local::now().format(Self::TIME_FORMAT).to_string(),
            likes: 0,
        };
        message.validate()?;
        Ok(message)
    }

    pub fn like(&mut self) -> u64 {
        self.likes += 1;
        self.likes
    }
}

impl Record for Message {
    const COLLECTION: Collection = Collection::Messages;

    fn validate(&self) -> Validation {
        require("content", &self.content)
    }

    fn select_mut(data: &mut SiteData) -> &mut Vec<Self> {
        &mut data.messages
    }
}

/// Validate an untyped field map against the record kind of `collection`.
///
/// Returns the normalized field map (every field of the record present).
/// An `order` key is carried over untouched since the remote store sorts on it.
pub fn validate_fields(
    collection: Collection,
    fields: Map<String, Value>,
) -> std::result::Result<Map<String, Value>, ValidationError> {
    fn normalize<R: Record>(fields: Map<String, Value>) -> std::result::Result<Map<String, Value>, ValidationError> {
        let order = fields.get("order").cloned();
        let record = R::from_fields(fields)?;
        record.validate()?;
        let mut normalized = record.to_fields();
        if let Some(order) = order {
            normalized.insert("order".to_string(), order);
        }
        Ok(normalized)
    }

    match collection {
        Collection::Resources => normalize::<Resource>(fields),
        Collection::Coding => normalize::<CodingLink>(fields),
        Collection::Events => normalize::<Event>(fields),
        Collection::Messages => normalize::<Message>(fields),
    }
}

/// The entire local dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteData {
    pub resources: Vec<Resource>,
    pub coding: Vec<CodingLink>,
    pub events: Vec<Event>,
    pub messages: Vec<Message>,
}

impl SiteData {
    /// Parse and shape-check a blob.
    ///
    /// The top-level value must be an object carrying all four collections;
    /// a key that is missing or `null` counts as absent.
    pub fn parse(text: &str) -> std::result::Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> std::result::Result<Self, ValidationError> {
        let Some(object) = value.as_object() else {
            return Err(ValidationError::MalformedJson("expected a JSON object".to_string()));
        };

        for collection in Collection::all() {
            match object.get(collection.as_str()) {
                None | Some(Value::Null) => {
                    return Err(ValidationError::MissingCollection(collection.as_str()));
                }
                Some(_) => {}
            }
        }

        serde_json::from_value(value).map_err(|e| ValidationError::MalformedJson(e.to_string()))
    }

    /// Default dataset shown before anything has been saved
    pub fn seed() -> Self {
        Self {
            resources: vec![
                Resource::new("开源项目推荐", "精选开源项目，适合学习和参与"),
                Resource::new("技术讲座PPT", "历届讲座PPT下载"),
                Resource::new("社团内部文档", "协会内部资料文档"),
            ],
            coding: vec![
                CodingLink::new("LeetCode 刷题", "https://leetcode.cn/"),
                CodingLink::new("菜鸟教程", "https://www.runoob.com/"),
                CodingLink::new("力扣题解精选", "https://leetcode-solution.cn/"),
            ],
            events: vec![
                Event::new("2024春季编程马拉松", "春季编程马拉松精彩回顾"),
                Event::new("2023秋季技术沙龙", "技术沙龙活动集锦"),
                Event::new("2023暑期创新训练营", "暑期创新训练营精彩瞬间"),
                Event::new("更多精彩活动，敬请期待！", ""),
            ],
            messages: Vec::new(),
        }
    }

    /// Number of records per collection, in `Collection::all()` order
    pub fn counts(&self) -> [(Collection, usize); 4] {
        [
            (Collection::Resources, self.resources.len()),
            (Collection::Coding, self.coding.len()),
            (Collection::Events, self.events.len()),
            (Collection::Messages, self.messages.len()),
        ]
    }

    /// One collection as a list of field maps
    pub fn fields_of(&self, collection: Collection) -> Vec<Map<String, Value>> {
        match collection {
            Collection::Resources => self.resources.iter().map(Record::to_fields).collect(),
            Collection::Coding => self.coding.iter().map(Record::to_fields).collect(),
            Collection::Events => self.events.iter().map(Record::to_fields).collect(),
            Collection::Messages => self.messages.iter().map(Record::to_fields).collect(),
        }
    }
}

impl Default for SiteData {
    fn default() -> Self {
        Self::seed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_requires_all_collections() {
        let err = SiteData::parse(r#"{"resources": [], "coding": [], "events": []}"#).unwrap_err();
        assert_eq!(err, ValidationError::MissingCollection("messages"));

        let err = SiteData::parse(r#"{"resources": null, "coding": [], "events": [], "messages": []}"#)
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingCollection("resources"));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(SiteData::parse("[1, 2]"), Err(ValidationError::MalformedJson(_))));
        assert!(matches!(SiteData::parse("not json"), Err(ValidationError::MalformedJson(_))));
    }

    #[test]
    fn test_parse_tolerates_missing_record_fields() {
        let data = SiteData::parse(
            r#"{"resources": [{"title": "Docs"}], "coding": [], "events": [],
                "messages": [{"content": "hi", "time": "2024/01/01 10:00:00"}]}"#,
        )
        .unwrap();
        assert_eq!(data.resources[0].title, "Docs");
        assert_eq!(data.resources[0].img, "");
        assert_eq!(data.messages[0].likes, 0);
    }

    #[test]
    fn test_parse_keeps_records_with_mistyped_fields() {
        let data = SiteData::parse(
            r#"{"resources": [{"title": "Club Wiki", "desc": null, "img": null, "link": 42}],
                "coding": [], "events": [],
                "messages": [{"name": null, "content": "hi", "likes": "3"},
                             {"content": "yo", "likes": -2},
                             {"content": "ok", "likes": 4.0, "time": null}]}"#,
        )
        .unwrap();
        assert_eq!(data.resources[0].title, "Club Wiki");
        assert_eq!(data.resources[0].desc, "");
        assert_eq!(data.resources[0].link, "42");
        let likes: Vec<_> = data.messages.iter().map(|m| m.likes).collect();
        assert_eq!(likes, vec![3, 0, 4]);
    }

    #[test]
    fn test_parse_rejects_structured_field_values() {
        let err = SiteData::parse(
            r#"{"resources": [{"title": {"zh": "wiki"}}], "coding": [], "events": [], "messages": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedJson(_)));
    }

    #[test]
    fn test_seed_shape() {
        let seed = SiteData::seed();
        assert_eq!(seed.resources.len(), 3);
        assert_eq!(seed.coding.len(), 3);
        assert_eq!(seed.events.len(), 4);
        assert!(seed.messages.is_empty());
        assert_eq!(seed.coding[0].link, "https://leetcode.cn/");
    }

    #[test]
    fn test_resource_validation() {
        assert_eq!(
            Resource::new("  ", "").validate(),
            Err(ValidationError::Required { field: "title" })
        );
        let long_title = "题".repeat(51);
        assert_eq!(
            Resource::new(&long_title, "").validate(),
            Err(ValidationError::TooLong { field: "title", max: 50 })
        );
        // 50 multi-byte characters are within the limit
        assert!(Resource::new(&"题".repeat(50), "").validate().is_ok());
        assert_eq!(
            Event::new("ok", &"x".repeat(201)).validate(),
            Err(ValidationError::TooLong { field: "desc", max: 200 })
        );
    }

    #[test]
    fn test_coding_link_requires_link() {
        assert_eq!(
            CodingLink::new("LeetCode", "").validate(),
            Err(ValidationError::Required { field: "link" })
        );
    }

    #[test]
    fn test_message_new_trims_and_stamps() {
        let message = Message::new("  A ", " hello ").unwrap();
        assert_eq!(message.name, "A");
        assert_eq!(message.content, "hello");
        assert_eq!(message.likes, 0);
        assert!(!message.time.is_empty());
        assert!(chrono::NaiveDateTime::parse_from_str(&message.time, Message::TIME_FORMAT).is_ok());
    }

    #[test]
    fn test_message_rejects_blank_content() {
        assert_eq!(
            Message::new("A", "   ").unwrap_err(),
            ValidationError::Required { field: "content" }
        );
    }

    #[test]
    fn test_validate_fields_normalizes_and_keeps_order() {
        let fields = json!({"name": "Rustlings", "link": "https://rustlings.dev", "order": 3, "extra": true});
        let Value::Object(map) = fields else { unreachable!() };

        let normalized = validate_fields(Collection::Coding, map).unwrap();
        assert_eq!(normalized["name"], "Rustlings");
        assert_eq!(normalized["order"], 3);
        assert!(!normalized.contains_key("extra"));
    }

    #[test]
    fn test_validate_fields_rejects_wrong_types() {
        let Value::Object(map) = json!({"content": ["hi"]}) else { unreachable!() };
        assert!(matches!(
            validate_fields(Collection::Messages, map),
            Err(ValidationError::InvalidRecord(_))
        ));
    }
}
