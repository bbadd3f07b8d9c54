use axum::{
    extract::{Path, State},
    Json,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::backend::StoredRecord;
use crate::board;
use crate::server::AppState;
use crate::{Collection, Error, ValidationError};
use std::sync::Arc;
use std::str::FromStr;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub id: String,
    pub likes: u64,
}

/// Message board form; `null` counts as left blank
#[derive(Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(e: Error) -> ApiError {
    let status = match &e {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) | Error::UnknownCollection(_) => StatusCode::NOT_FOUND,
        Error::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        Error::Remote { .. } | Error::Http(_) | Error::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", e);
    }
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn parse_collection(name: &str) -> Result<Collection, ApiError> {
    Collection::from_str(name).map_err(api_error)
}

/// Re-fetch after every mutation; the response is always the current list
async fn refreshed(state: &AppState, collection: Collection) -> ApiResult<Vec<StoredRecord>> {
    let records = state.backend.list(collection).await.map_err(api_error)?;
    Ok(Json(records))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({"status": "ok", "backend": state.backend.name()}))
}

pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> ApiResult<Vec<StoredRecord>> {
    let collection = parse_collection(&collection)?;
    refreshed(&state, collection).await
}

pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Vec<StoredRecord>>), ApiError> {
    let collection = parse_collection(&collection)?;

    if collection == Collection::Messages {
        let form: MessageForm = serde_json::from_value(Value::Object(fields))
            .map_err(|e| api_error(ValidationError::InvalidRecord(e.to_string()).into()))?;
        let name = form.name.unwrap_or_default();
        let content = form.content.unwrap_or_default();
        board::post_message(state.backend.as_ref(), &name, &content)
            .await
            .map_err(api_error)?;
    } else {
        state.backend.save(collection, fields, None).await.map_err(api_error)?;
    }

    Ok((StatusCode::CREATED, refreshed(&state, collection).await?))
}

pub async fn update_record(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(fields): Json<Map<String, Value>>,
) -> ApiResult<Vec<StoredRecord>> {
    let collection = parse_collection(&collection)?;
    state.backend.save(collection, fields, Some(id.as_str())).await.map_err(api_error)?;
    refreshed(&state, collection).await
}

pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Vec<StoredRecord>> {
    let collection = parse_collection(&collection)?;
    state.backend.delete(collection, &id).await.map_err(api_error)?;
    refreshed(&state, collection).await
}

pub async fn like_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<LikeResponse> {
    let likes = board::like_message(state.backend.as_ref(), &id)
        .await
        .map_err(api_error)?;
    Ok(Json(LikeResponse { id, likes }))
}

pub async fn export_data(State(state): State<Arc<AppState>>) -> Result<([(axum::http::HeaderName, String); 2], String), ApiError> {
    let blob = state.backend.export().await.map_err(api_error)?;
    let headers = [
        (axum::http::header::CONTENT_TYPE, "application/json".to_string()),
        (
            axum::http::header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", crate::storage::EXPORT_FILE_NAME),
        ),
    ];
    Ok((headers, blob))
}

pub async fn import_data(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<Value> {
    let data = state.backend.import(&body).await.map_err(api_error)?;
    let counts: Map<String, Value> = data
        .counts()
        .iter()
        .map(|(collection, count)| (collection.as_str().to_string(), Value::from(*count)))
        .collect();
    Ok(Json(Value::Object(counts)))
}
