//! LeanCloud REST client
//!
//! Speaks the storage REST API (`/1.1/classes/{class}`) with the app id and
//! key headers. Only the four calls the remote adapter needs are exposed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::remote::{ObjectStorage, ID_FIELD};
use crate::config::RemoteConfig;
use crate::{Error, Result};

/// Bookkeeping fields the service adds to every object
const SERVICE_FIELDS: &[&str] = &["createdAt", "updatedAt", "ACL"];

/// Largest page the service returns for one query
const QUERY_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "objectId")]
    object_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<i64>,
    error: Option<String>,
}

/// HTTP client for one LeanCloud application
#[derive(Debug, Clone)]
pub struct LeanCloudClient {
    base_url: reqwest::Url,
    app_id: String,
    app_key: String,
    client: reqwest::Client,
}

impl LeanCloudClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = reqwest::Url::parse(&config.server_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.server_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(config.server_url.clone()));
        }

        Ok(Self {
            base_url,
            app_id: config.app_id.clone(),
            app_key: config.app_key.clone(),
            client: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `{server}/1.1/classes/{segments...}` with each segment percent-encoded
    fn classes_url(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["1.1", "classes"]).extend(segments);
        }
        url
    }

    fn class_url(&self, class: &str) -> reqwest::Url {
        self.classes_url(&[class])
    }

    fn object_url(&self, class: &str, object_id: &str) -> reqwest::Url {
        self.classes_url(&[class, object_id])
    }

    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("X-LC-Id", &self.app_id)
            .header("X-LC-Key", &self.app_key)
    }

    /// Send a request and turn non-2xx statuses into `Error::Remote`
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { code: Some(code), error: Some(error) }) => format!("{} (code {})", error, code),
            Ok(ErrorBody { error: Some(error), .. }) => error,
            _ => body,
        };
        tracing::warn!(status = status.as_u16(), "LeanCloud request failed: {}", message);

        Err(Error::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ObjectStorage for LeanCloudClient {
    #[tracing::instrument(skip(self))]
    async fn query(&self, class: &str, order_by: &str) -> Result<Vec<Map<String, Value>>> {
        let limit = QUERY_LIMIT.to_string();
        let builder = self
            .request(reqwest::Method::GET, self.class_url(class))
            .query(&[("order", order_by), ("limit", limit.as_str())]);

        let response: QueryResponse = self.send(builder).await?.json().await?;

        let mut records = response.results;
        for record in &mut records {
            for field in SERVICE_FIELDS {
                record.remove(*field);
            }
            if !matches!(record.get(ID_FIELD), Some(Value::String(_))) {
                return Err(Error::MalformedResponse(format!("{} object without objectId", class)));
            }
        }
        Ok(records)
    }

    #[tracing::instrument(skip(self, fields))]
    async fn create(&self, class: &str, fields: &Map<String, Value>) -> Result<String> {
        let builder = self
            .request(reqwest::Method::POST, self.class_url(class))
            .json(fields);

        let created: CreateResponse = self.send(builder).await?.json().await?;
        Ok(created.object_id)
    }

    #[tracing::instrument(skip(self, fields))]
    async fn update(&self, class: &str, object_id: &str, fields: &Map<String, Value>) -> Result<()> {
        let builder = self
            .request(reqwest::Method::PUT, self.object_url(class, object_id))
            .json(fields);

        self.send(builder).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn destroy(&self, class: &str, object_id: &str) -> Result<()> {
        let builder = self.request(reqwest::Method::DELETE, self.object_url(class, object_id));
        self.send(builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::storage::RemoteStore;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server_url: String) -> RemoteConfig {
        RemoteConfig {
            app_id: "app-id".to_string(),
            app_key: "app-key".to_string(),
            server_url,
        }
    }

    fn client(server: &MockServer) -> LeanCloudClient {
        LeanCloudClient::new(&config(format!("{}/", server.uri()))).unwrap()
    }

    #[test]
    fn test_rejects_unusable_server_url() {
        assert!(matches!(
            LeanCloudClient::new(&config("not a url".to_string())),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            LeanCloudClient::new(&config("mailto:club@example.com".to_string())),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_object_id_is_encoded_as_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/1.1/classes/Resources/r1%3Fx=1%23top"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let store = RemoteStore::new(client(&server));
        store.delete_item(Collection::Resources, "r1?x=1#top").await.unwrap();
    }

    #[tokio::test]
    async fn test_query_sends_order_and_strips_service_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/classes/Coding"))
            .and(query_param("order", "order"))
            .and(header("X-LC-Id", "app-id"))
            .and(header("X-LC-Key", "app-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"objectId": "a1", "name": "LeetCode", "link": "https://leetcode.cn/", "order": 1,
                     "createdAt": "2024-01-01T00:00:00.000Z", "updatedAt": "2024-01-01T00:00:00.000Z"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = RemoteStore::new(client(&server));
        let records = store.fetch_all(Collection::Coding).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["objectId"], "a1");
        assert_eq!(records[0]["name"], "LeetCode");
        assert!(!records[0].contains_key("createdAt"));
    }

    #[tokio::test]
    async fn test_create_posts_fields_with_next_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/classes/Messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"objectId": "m1", "content": "first", "order": 7}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/1.1/classes/Messages"))
            .and(body_json(json!({"name": "A", "content": "hello", "order": 8})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "objectId": "m2", "createdAt": "2024-01-01T00:00:00.000Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = RemoteStore::new(client(&server));
        let Value::Object(data) = json!({"name": "A", "content": "hello"}) else { unreachable!() };
        let id = store.save_item(Collection::Messages, data, None).await.unwrap();
        assert_eq!(id, "m2");
    }

    #[tokio::test]
    async fn test_update_puts_to_object_url() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/1.1/classes/Events/e1"))
            .and(body_json(json!({"title": "Renamed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "updatedAt": "2024-01-02T00:00:00.000Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = RemoteStore::new(client(&server));
        let Value::Object(data) = json!({"title": "Renamed", "objectId": "e1"}) else { unreachable!() };
        let id = store.save_item(Collection::Events, data, Some("e1")).await.unwrap();
        assert_eq!(id, "e1");
    }

    #[tokio::test]
    async fn test_delete_and_error_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/1.1/classes/Resources/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/1.1/classes/Resources/locked"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": 403, "error": "Forbidden to delete by class permissions."
            })))
            .mount(&server)
            .await;

        let store = RemoteStore::new(client(&server));
        store.delete_item(Collection::Resources, "r1").await.unwrap();

        let err = store.delete_item(Collection::Resources, "locked").await.unwrap_err();
        match err {
            Error::Remote { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("Forbidden"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_query_without_object_id_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/classes/Events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"title": "no id"}]
            })))
            .mount(&server)
            .await;

        let store = RemoteStore::new(client(&server));
        let err = store.fetch_all(Collection::Events).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }
}
