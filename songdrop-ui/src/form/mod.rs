//! Form State Holder
//!
//! Owns the in-memory draft for one form session: scalar fields, genre tags,
//! file selections, per-file upload progress and the submission-in-progress
//! flag. Nothing here is persisted.

mod draft;
mod files;
mod genres;
mod shared;

pub use draft::{Draft, DraftField, DEFAULT_ALBUM};
pub use files::{FileSelection, FileSummary, FALLBACK_CONTENT_TYPE};
pub use genres::{GenreList, GenreTag};
pub use shared::{SharedForm, SubmissionGuard};

use serde::Serialize;
use songdrop_common::FileSlot;
use std::collections::HashMap;

use crate::submission::SubmissionRequest;

/// Mutable state behind the form
#[derive(Debug, Clone, Default)]
pub struct FormState {
    draft: Draft,
    genres: GenreList,
    files: HashMap<FileSlot, FileSelection>,
    progress: HashMap<FileSlot, u8>,
    submitting: bool,
}

/// Serializable view of [`FormState`] (file payloads omitted)
#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
    pub draft: Draft,
    pub genres: Vec<GenreTag>,
    pub song: Option<FileSummary>,
    pub cover: Option<FileSummary>,
    pub song_progress: u8,
    pub cover_progress: u8,
    pub submitting: bool,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn genres(&self) -> &GenreList {
        &self.genres
    }

    /// Replace one scalar in the draft
    pub fn update_field(&mut self, field: DraftField, value: String) {
        self.draft.set(field, value);
    }

    /// Add the pending genre text as a tag
    ///
    /// On success the pending text is cleared. Empty or duplicate text is a
    /// silent no-op that leaves the pending text as typed.
    pub fn add_genre(&mut self) -> Option<GenreTag> {
        let pending = self.draft.pending_genre.clone();
        self.add_genre_text(&pending)
    }

    /// Add `text` as a tag; same rules as [`FormState::add_genre`]
    pub fn add_genre_text(&mut self, text: &str) -> Option<GenreTag> {
        let added = self.genres.add(text).cloned();
        if added.is_some() {
            self.draft.pending_genre.clear();
        }
        added
    }

    /// Remove the tag with `id`; no-op if absent
    pub fn remove_genre(&mut self, id: u32) -> bool {
        self.genres.remove(id)
    }

    /// Replace the selection for `slot` and reset its progress
    pub fn select_file(&mut self, slot: FileSlot, selection: FileSelection) {
        self.files.insert(slot, selection);
        self.progress.insert(slot, 0);
    }

    pub fn clear_file(&mut self, slot: FileSlot) -> bool {
        self.progress.remove(&slot);
        self.files.remove(&slot).is_some()
    }

    pub fn file(&self, slot: FileSlot) -> Option<&FileSelection> {
        self.files.get(&slot)
    }

    /// Record upload progress, clamped to 100
    pub fn set_progress(&mut self, slot: FileSlot, percent: u8) {
        self.progress.insert(slot, percent.min(100));
    }

    pub fn progress(&self, slot: FileSlot) -> u8 {
        self.progress.get(&slot).copied().unwrap_or(0)
    }

    /// Raise the in-progress flag
    ///
    /// Returns `false` (and changes nothing) if a submission is already running.
    pub fn begin_submission(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.submitting = true;
        for slot in FileSlot::ALL {
            if self.files.contains_key(&slot) {
                self.progress.insert(slot, 0);
            }
        }
        true
    }

    pub fn end_submission(&mut self) {
        self.submitting = false;
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Return every field to its initial value
    ///
    /// The in-progress flag is left alone; it belongs to whoever raised it.
    pub fn reset(&mut self) {
        self.draft = Draft::default();
        self.genres.clear();
        self.files.clear();
        self.progress.clear();
    }

    /// Copy out what the submission sequencer needs
    pub fn submission_request(&self) -> SubmissionRequest {
        SubmissionRequest {
            draft: self.draft.clone(),
            genres: self.genres.titles(),
            song: self.files.get(&FileSlot::Song).cloned(),
            cover: self.files.get(&FileSlot::Cover).cloned(),
        }
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            draft: self.draft.clone(),
            genres: self.genres.tags().to_vec(),
            song: self.files.get(&FileSlot::Song).map(FileSelection::summary),
            cover: self.files.get(&FileSlot::Cover).map(FileSelection::summary),
            song_progress: self.progress(FileSlot::Song),
            cover_progress: self.progress(FileSlot::Cover),
            submitting: self.submitting,
        }
    }
}
