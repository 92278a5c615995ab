//! Submission Sequencer
//!
//! Runs one submission against the injected backend:
//! insert row → sign + upload cover and song → patch row with public URLs.
//!
//! Error policy per step:
//! - missing required file: abort before any remote call
//! - insert failure: abort, nothing else runs
//! - signing failure: skip that file's upload, keep going
//! - transfer failure: logged, keep going
//! - patch failure: reported after uploads have happened
//!
//! Nothing is retried and partially created rows/objects are left in place.

mod storage_path;

pub use storage_path::{extension_for, storage_path};

use serde::Serialize;
use songdrop_common::config::{StorageConfig, SubmissionConfig};
use songdrop_common::{FileSlot, SubmissionPhase};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backend::{BackendContext, BackendError, NewSongRow, ProgressFn, SongRow, SongUrlPatch};
use crate::form::{Draft, FileSelection};

/// Everything one submission needs, copied out of the form
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub draft: Draft,
    /// Genre titles in tag order
    pub genres: Vec<String>,
    pub song: Option<FileSelection>,
    pub cover: Option<FileSelection>,
}

impl SubmissionRequest {
    pub fn file(&self, slot: FileSlot) -> Option<&FileSelection> {
        match slot {
            FileSlot::Song => self.song.as_ref(),
            FileSlot::Cover => self.cover.as_ref(),
        }
    }
}

/// Terminal submission errors
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("No {0} file selected")]
    MissingFile(FileSlot),

    #[error("Could not create song row: {0}")]
    Insert(#[source] BackendError),

    #[error("Could not update song row {row_id} with media URLs: {source}")]
    Patch {
        row_id: i64,
        #[source]
        source: BackendError,
    },
}

/// Result of one file's sign + upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Uploaded,
    SignFailed { error: String },
    TransferFailed { error: String },
}

impl UploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded)
    }
}

/// Per-file part of a [`SubmissionReport`]
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub slot: FileSlot,
    pub bucket: String,
    pub path: String,
    /// Written to the row even when the upload did not complete
    pub public_url: String,
    pub outcome: UploadOutcome,
}

/// What a finished submission produced
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    pub row_id: i64,
    pub song: Option<FileReport>,
    pub cover: Option<FileReport>,
}

impl SubmissionReport {
    /// Slots whose upload did not complete
    pub fn failed_uploads(&self) -> Vec<FileSlot> {
        [&self.cover, &self.song]
            .into_iter()
            .flatten()
            .filter(|report| !report.outcome.is_uploaded())
            .map(|report| report.slot)
            .collect()
    }
}

/// Receives phase changes and upload progress while a submission runs
pub trait SubmissionObserver: Send + Sync {
    fn phase_changed(&self, phase: SubmissionPhase);

    fn upload_progress(&self, slot: FileSlot, percent: u8);
}

/// Observer that ignores everything
pub struct NoopObserver;

impl SubmissionObserver for NoopObserver {
    fn phase_changed(&self, _phase: SubmissionPhase) {}

    fn upload_progress(&self, _slot: FileSlot, _percent: u8) {}
}

/// Table and bucket names plus the file guard policy
#[derive(Debug, Clone)]
pub struct SequencerSettings {
    pub table: String,
    pub song_bucket: String,
    pub cover_bucket: String,
    pub require_song: bool,
    pub require_cover: bool,
}

impl SequencerSettings {
    pub fn from_config(storage: &StorageConfig, submission: &SubmissionConfig) -> Self {
        Self {
            table: storage.table.clone(),
            song_bucket: storage.song_bucket.clone(),
            cover_bucket: storage.cover_bucket.clone(),
            require_song: submission.require_song,
            require_cover: submission.require_cover,
        }
    }

    pub fn bucket(&self, slot: FileSlot) -> &str {
        match slot {
            FileSlot::Song => &self.song_bucket,
            FileSlot::Cover => &self.cover_bucket,
        }
    }

    pub fn requires(&self, slot: FileSlot) -> bool {
        match slot {
            FileSlot::Song => self.require_song,
            FileSlot::Cover => self.require_cover,
        }
    }
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self::from_config(&StorageConfig::default(), &SubmissionConfig::default())
    }
}

/// Runs submissions against one backend
#[derive(Clone)]
pub struct Sequencer {
    backend: BackendContext,
    settings: SequencerSettings,
}

impl Sequencer {
    pub fn new(backend: BackendContext, settings: SequencerSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    /// Check the file guard without touching the backend
    pub fn check_files(&self, request: &SubmissionRequest) -> Result<(), SubmitError> {
        for slot in FileSlot::ALL {
            if self.settings.requires(slot) && request.file(slot).is_none() {
                return Err(SubmitError::MissingFile(slot));
            }
        }
        Ok(())
    }

    /// Run the full insert → upload → patch sequence
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        observer: Arc<dyn SubmissionObserver>,
    ) -> Result<SubmissionReport, SubmitError> {
        if let Err(e) = self.check_files(request) {
            warn!("Submission rejected: {}", e);
            observer.phase_changed(SubmissionPhase::Failed);
            return Err(e);
        }

        observer.phase_changed(SubmissionPhase::Inserting);
        let record = NewSongRow {
            title: request.draft.title.clone(),
            album: request.draft.album.clone(),
            artist: request.draft.artist.clone(),
            genres: request.genres.clone(),
        };
        let row = match self.backend.rows.insert(&self.settings.table, &record).await {
            Ok(row) => row,
            Err(e) => {
                error!(table = %self.settings.table, error = %e, "Song row insert failed");
                observer.phase_changed(SubmissionPhase::Failed);
                return Err(SubmitError::Insert(e));
            }
        };
        info!(row_id = row.id, title = %row.title, "Song row inserted");

        observer.phase_changed(SubmissionPhase::Uploading);
        let (cover, song) = futures::join!(
            self.upload_file(FileSlot::Cover, request.cover.as_ref(), &row, observer.clone()),
            self.upload_file(FileSlot::Song, request.song.as_ref(), &row, observer.clone()),
        );

        observer.phase_changed(SubmissionPhase::Patching);
        let patch = SongUrlPatch {
            song_url: song.as_ref().map(|r| r.public_url.clone()),
            cover_url: cover.as_ref().map(|r| r.public_url.clone()),
        };
        if patch.is_empty() {
            debug!(row_id = row.id, "No files selected, skipping row patch");
        } else if let Err(e) = self
            .backend
            .rows
            .update(&self.settings.table, &patch, row.id)
            .await
        {
            error!(row_id = row.id, error = %e, "Song row patch failed");
            observer.phase_changed(SubmissionPhase::Failed);
            return Err(SubmitError::Patch {
                row_id: row.id,
                source: e,
            });
        }

        let report = SubmissionReport {
            row_id: row.id,
            song,
            cover,
        };
        info!(
            row_id = report.row_id,
            failed_uploads = ?report.failed_uploads(),
            "Submission complete"
        );
        observer.phase_changed(SubmissionPhase::Done);
        Ok(report)
    }

    /// Sign and upload one file; failures are contained in the outcome
    async fn upload_file(
        &self,
        slot: FileSlot,
        file: Option<&FileSelection>,
        row: &SongRow,
        observer: Arc<dyn SubmissionObserver>,
    ) -> Option<FileReport> {
        let file = file?;
        let bucket = self.settings.bucket(slot).to_string();
        let path = storage_path(&row.title, &row.artist, row.id, &file.content_type);
        let public_url = self.backend.objects.public_url(&bucket, &path);

        let outcome = match self
            .backend
            .objects
            .create_signed_upload_target(&bucket, &path)
            .await
        {
            Err(e) => {
                warn!(%slot, %bucket, %path, error = %e, "Signed upload URL request failed, skipping upload");
                UploadOutcome::SignFailed {
                    error: e.to_string(),
                }
            }
            Ok(target) => {
                let progress: ProgressFn = {
                    let observer = observer.clone();
                    Arc::new(move |percent| observer.upload_progress(slot, percent))
                };
                match self.backend.objects.upload(&target, file, progress).await {
                    Ok(()) => {
                        info!(%slot, %bucket, %path, bytes = file.size(), "File uploaded");
                        UploadOutcome::Uploaded
                    }
                    Err(e) => {
                        warn!(%slot, %bucket, %path, error = %e, "File upload failed");
                        UploadOutcome::TransferFailed {
                            error: e.to_string(),
                        }
                    }
                }
            }
        };

        Some(FileReport {
            slot,
            bucket,
            path,
            public_url,
            outcome,
        })
    }
}
