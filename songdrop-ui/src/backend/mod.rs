//! Hosted backend collaborators
//!
//! The sequencer only talks to these traits. [`SupabaseBackend`] implements all
//! three over HTTP; tests substitute in-memory fakes.

pub mod supabase;

pub use supabase::SupabaseBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::form::FileSelection;

/// Backend call errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Row inserted for a new song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSongRow {
    pub title: String,
    pub album: String,
    pub artist: String,
    pub genres: Vec<String>,
}

/// Row as returned by the row store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRow {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    pub artist: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub song_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// Media URLs written back onto an inserted row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongUrlPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl SongUrlPatch {
    pub fn is_empty(&self) -> bool {
        self.song_url.is_none() && self.cover_url.is_none()
    }
}

/// Short-lived URL permitting one write to `bucket/path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUploadTarget {
    pub bucket: String,
    pub path: String,
    /// Absolute URL to `PUT` the content to
    pub url: String,
    pub token: Option<String>,
}

/// Upload progress callback, called with 0-100
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// OAuth sign-in
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// URL that begins OAuth sign-in with the named provider
    fn sign_in_url(&self, provider: &str, redirect_to: Option<&str>)
        -> Result<String, BackendError>;

    /// Use `token` (or the anonymous key when `None`) for later calls
    async fn set_access_token(&self, token: Option<String>);

    async fn has_session(&self) -> bool;
}

/// Relational row store
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn insert(&self, table: &str, record: &NewSongRow) -> Result<SongRow, BackendError>;

    async fn update(&self, table: &str, patch: &SongUrlPatch, id: i64)
        -> Result<(), BackendError>;
}

/// Object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_signed_upload_target(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<SignedUploadTarget, BackendError>;

    /// Public URL of `bucket/path`; pure string construction
    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn upload(
        &self,
        target: &SignedUploadTarget,
        file: &FileSelection,
        progress: ProgressFn,
    ) -> Result<(), BackendError>;
}

/// Collaborators handed to the submission sequencer
#[derive(Clone)]
pub struct BackendContext {
    pub auth: Arc<dyn AuthProvider>,
    pub rows: Arc<dyn RowStore>,
    pub objects: Arc<dyn ObjectStore>,
}

impl BackendContext {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        rows: Arc<dyn RowStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            auth,
            rows,
            objects,
        }
    }

    /// All three roles served by one [`SupabaseBackend`]
    pub fn supabase(backend: SupabaseBackend) -> Self {
        let backend = Arc::new(backend);
        Self {
            auth: backend.clone(),
            rows: backend.clone(),
            objects: backend,
        }
    }
}
