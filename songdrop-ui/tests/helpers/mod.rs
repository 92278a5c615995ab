//! Test doubles for the backend collaborators
//!
//! `FakeBackend` implements all three backend traits in memory, records every
//! call in order, and can be told to fail individual steps.

#![allow(dead_code)]

use async_trait::async_trait;
use songdrop_common::{FileSlot, SubmissionPhase};
use songdrop_ui::backend::{
    AuthProvider, BackendContext, BackendError, NewSongRow, ObjectStore, ProgressFn, RowStore,
    SignedUploadTarget, SongRow, SongUrlPatch,
};
use songdrop_ui::form::FileSelection;
use songdrop_ui::submission::SubmissionObserver;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

pub const PUBLIC_BASE: &str = "https://fake.example/public";

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Insert { table: String, record: NewSongRow },
    Sign { bucket: String, path: String },
    Upload { bucket: String, path: String, bytes: usize },
    Update { table: String, patch: SongUrlPatch, id: i64 },
}

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    token: Mutex<Option<String>>,
    fail_insert: bool,
    fail_patch: bool,
    fail_sign: HashSet<String>,
    fail_upload: HashSet<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(41),
            ..Default::default()
        }
    }

    pub fn failing_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    pub fn failing_patch(mut self) -> Self {
        self.fail_patch = true;
        self
    }

    /// Signing fails for every path in `bucket`
    pub fn failing_sign(mut self, bucket: &str) -> Self {
        self.fail_sign.insert(bucket.to_string());
        self
    }

    /// Uploads into `bucket` fail after signing succeeds
    pub fn failing_upload(mut self, bucket: &str) -> Self {
        self.fail_upload.insert(bucket.to_string());
        self
    }

    pub fn into_context(self) -> (Arc<FakeBackend>, BackendContext) {
        let fake = Arc::new(self);
        let context = BackendContext::new(fake.clone(), fake.clone(), fake.clone());
        (fake, context)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn inserts(&self) -> usize {
        self.count(|c| matches!(c, Call::Insert { .. }))
    }

    pub fn signs(&self) -> usize {
        self.count(|c| matches!(c, Call::Sign { .. }))
    }

    pub fn uploads(&self) -> usize {
        self.count(|c| matches!(c, Call::Upload { .. }))
    }

    pub fn updates(&self) -> Vec<SongUrlPatch> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update { patch, .. } => Some(patch),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    fn sign_in_url(
        &self,
        provider: &str,
        redirect_to: Option<&str>,
    ) -> Result<String, BackendError> {
        Ok(format!(
            "https://fake.example/authorize?provider={}&redirect_to={}",
            provider,
            redirect_to.unwrap_or_default()
        ))
    }

    async fn set_access_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn has_session(&self) -> bool {
        self.token.lock().unwrap().is_some()
    }
}

#[async_trait]
impl RowStore for FakeBackend {
    async fn insert(&self, table: &str, record: &NewSongRow) -> Result<SongRow, BackendError> {
        self.record(Call::Insert {
            table: table.to_string(),
            record: record.clone(),
        });
        if self.fail_insert {
            return Err(BackendError::Api {
                status: 401,
                message: "JWT expired".to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SongRow {
            id,
            title: record.title.clone(),
            album: Some(record.album.clone()),
            artist: record.artist.clone(),
            genres: record.genres.clone(),
            song_url: None,
            cover_url: None,
        })
    }

    async fn update(
        &self,
        table: &str,
        patch: &SongUrlPatch,
        id: i64,
    ) -> Result<(), BackendError> {
        self.record(Call::Update {
            table: table.to_string(),
            patch: patch.clone(),
            id,
        });
        if self.fail_patch {
            return Err(BackendError::Network("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FakeBackend {
    async fn create_signed_upload_target(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<SignedUploadTarget, BackendError> {
        self.record(Call::Sign {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
        if self.fail_sign.contains(bucket) {
            return Err(BackendError::Api {
                status: 403,
                message: "new row violates row-level security policy".to_string(),
            });
        }
        Ok(SignedUploadTarget {
            bucket: bucket.to_string(),
            path: path.to_string(),
            url: format!("https://fake.example/upload/{}/{}?token=t", bucket, path),
            token: Some("t".to_string()),
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", PUBLIC_BASE, bucket, path)
    }

    async fn upload(
        &self,
        target: &SignedUploadTarget,
        file: &FileSelection,
        progress: ProgressFn,
    ) -> Result<(), BackendError> {
        self.record(Call::Upload {
            bucket: target.bucket.clone(),
            path: target.path.clone(),
            bytes: file.size(),
        });
        progress(0);
        if self.fail_upload.contains(&target.bucket) {
            return Err(BackendError::Network("broken pipe".to_string()));
        }
        progress(50);
        progress(100);
        Ok(())
    }
}

/// Observer that records everything it is told
#[derive(Default)]
pub struct RecordingObserver {
    pub phases: Mutex<Vec<SubmissionPhase>>,
    pub progress: Mutex<Vec<(FileSlot, u8)>>,
}

impl RecordingObserver {
    pub fn phases(&self) -> Vec<SubmissionPhase> {
        self.phases.lock().unwrap().clone()
    }

    pub fn last_progress(&self, slot: FileSlot) -> Option<u8> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _)| *s == slot)
            .map(|(_, p)| *p)
    }
}

impl SubmissionObserver for RecordingObserver {
    fn phase_changed(&self, phase: SubmissionPhase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn upload_progress(&self, slot: FileSlot, percent: u8) {
        self.progress.lock().unwrap().push((slot, percent));
    }
}

pub fn song_file() -> FileSelection {
    FileSelection::new("night.mp3", "audio/mpeg", vec![0u8; 2048])
}

pub fn cover_file() -> FileSelection {
    FileSelection::new("night.png", "image/png", vec![1u8; 512])
}
