//! Supabase-style backend over HTTP
//!
//! - Rows: PostgREST under `/rest/v1`
//! - Objects: storage API under `/storage/v1`
//! - Auth: OAuth authorize endpoint under `/auth/v1`

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Response, Url};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{
    AuthProvider, BackendError, NewSongRow, ObjectStore, ProgressFn, RowStore, SignedUploadTarget,
    SongRow, SongUrlPatch,
};
use crate::form::FileSelection;

const USER_AGENT: &str = concat!("songdrop/", env!("CARGO_PKG_VERSION"));

/// Upload body chunk size; one progress callback per chunk
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Highest percentage reported before the storage server accepts the upload
const PRE_RESPONSE_PROGRESS_CAP: u8 = 99;

#[derive(Debug, Deserialize)]
struct SignedUploadResponse {
    url: String,
    #[serde(default)]
    token: Option<String>,
}

/// HTTP client for a Supabase project
///
/// `request_timeout` bounds row and signing calls. Uploads are only bounded
/// by the connect timeout, since their duration scales with file size.
pub struct SupabaseBackend {
    http_client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    api_key: String,
    access_token: RwLock<Option<String>>,
}

impl SupabaseBackend {
    /// `base_url` is the project URL, e.g. `https://xyz.supabase.co`
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            request_timeout: timeout,
            api_key: api_key.to_string(),
            access_token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn storage_url(&self, suffix: &str) -> String {
        format!("{}/storage/v1{}", self.base_url, suffix)
    }

    /// `apikey` plus bearer token (session token when signed in)
    async fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.api_key.clone());
        request
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl AuthProvider for SupabaseBackend {
    fn sign_in_url(
        &self,
        provider: &str,
        redirect_to: Option<&str>,
    ) -> Result<String, BackendError> {
        let authorize = format!("{}/auth/v1/authorize", self.base_url);
        let mut params = vec![("provider", provider)];
        if let Some(redirect_to) = redirect_to {
            params.push(("redirect_to", redirect_to));
        }
        let url = Url::parse_with_params(&authorize, &params)
            .map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        Ok(url.to_string())
    }

    async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    async fn has_session(&self) -> bool {
        self.access_token.read().await.is_some()
    }
}

#[async_trait]
impl RowStore for SupabaseBackend {
    async fn insert(&self, table: &str, record: &NewSongRow) -> Result<SongRow, BackendError> {
        let request = self
            .http_client
            .post(self.rest_url(table))
            .timeout(self.request_timeout)
            .header("Prefer", "return=representation")
            .json(record);
        let response = self.send(self.authorized(request).await).await?;

        let rows: Vec<SongRow> = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse("Insert returned no rows".to_string()))
    }

    async fn update(
        &self,
        table: &str,
        patch: &SongUrlPatch,
        id: i64,
    ) -> Result<(), BackendError> {
        let request = self
            .http_client
            .patch(self.rest_url(table))
            .timeout(self.request_timeout)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(patch);
        self.send(self.authorized(request).await).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for SupabaseBackend {
    async fn create_signed_upload_target(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<SignedUploadTarget, BackendError> {
        let request = self
            .http_client
            .post(self.storage_url(&format!("/object/upload/sign/{}/{}", bucket, path)))
            .timeout(self.request_timeout)
            .json(&serde_json::json!({}));
        let response = self.send(self.authorized(request).await).await?;

        let signed: SignedUploadResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        // The storage API answers with a path relative to /storage/v1
        let url = if signed.url.starts_with("http://") || signed.url.starts_with("https://") {
            signed.url
        } else {
            self.storage_url(&signed.url)
        };
        let parsed = Url::parse(&url).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        let token = signed.token.or_else(|| {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        });

        Ok(SignedUploadTarget {
            bucket: bucket.to_string(),
            path: path.to_string(),
            url,
            token,
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.storage_url(&format!("/object/public/{}/{}", bucket, path))
    }

    async fn upload(
        &self,
        target: &SignedUploadTarget,
        file: &FileSelection,
        progress: ProgressFn,
    ) -> Result<(), BackendError> {
        let total = file.size();
        progress(0);

        let body = reqwest::Body::wrap_stream(progress_stream(
            file.data.clone(),
            UPLOAD_CHUNK_BYTES,
            progress.clone(),
        ));
        let content_type = HeaderValue::from_str(&file.content_type)
            .map_err(|e| BackendError::Parse(format!("Invalid content type: {}", e)))?;

        let request = self
            .http_client
            .put(&target.url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, total)
            .header("x-upsert", "false")
            .body(body);
        self.send(self.authorized(request).await).await?;

        progress(100);
        Ok(())
    }
}

/// Percentage of `sent` out of `total`; an empty payload counts as complete
pub(crate) fn percent_of(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) as u64 * 100) / total as u64) as u8
}

/// Split `data` into chunks, calling `progress` as each chunk is pulled
///
/// Reports at most [`PRE_RESPONSE_PROGRESS_CAP`]; the caller reports 100 once
/// the server has accepted the body.
fn progress_stream(
    data: Bytes,
    chunk_size: usize,
    progress: ProgressFn,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = data.len();
    let chunks: Vec<Bytes> = (0..total)
        .step_by(chunk_size.max(1))
        .map(|start| data.slice(start..(start + chunk_size).min(total)))
        .collect();

    let mut sent = 0usize;
    futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len();
        progress(percent_of(sent, total).min(PRE_RESPONSE_PROGRESS_CAP));
        Ok(chunk)
    }))
}
