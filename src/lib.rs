//! # cxnet - Club site content store
//!
//! Data access for the club website: resources, coding links, events and
//! the public message board.
//!
//! cxnet provides:
//! - A local adapter persisting the whole site as one JSON blob in a key-value store
//! - A remote adapter over hosted object storage (LeanCloud REST)
//! - Shape validation for imported data and per-record field validation
//! - A single async backend interface used by the CLI and the HTTP API

pub mod model;
pub mod collection;
pub mod storage;
pub mod backend;
pub mod board;
pub mod image;
pub mod server;
pub mod output;
pub mod config;
pub mod ui;


// Re-exports for convenient access
pub use collection::Collection;
pub use model::{CodingLink, Event, Message, Record, Resource, SiteData, ValidationError};
pub use storage::{LocalStore, RemoteStore, SqliteKv};
pub use backend::{LocalBackend, RemoteBackend, SiteBackend, StoredRecord};

/// Result type alias for cxnet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cxnet operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    Validation(#[from] ValidationError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote store rejected request ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid remote store URL: {0}")]
    InvalidUrl(String),

    #[error("Malformed response from remote store: {0}")]
    MalformedResponse(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Not supported by this backend: {0}")]
    Unsupported(&'static str),
}
