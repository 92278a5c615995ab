//! Draft: the scalar form fields

use serde::{Deserialize, Serialize};

/// Album used for a song that is not part of an album
pub const DEFAULT_ALBUM: &str = "Single";

/// In-progress, unsaved form data for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub album: String,
    pub artist: String,
    /// Text typed into the genre box but not yet added as a tag
    pub pending_genre: String,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            title: String::new(),
            album: DEFAULT_ALBUM.to_string(),
            artist: String::new(),
            pending_genre: String::new(),
        }
    }
}

/// Addressable scalar in a [`Draft`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Title,
    Album,
    Artist,
    PendingGenre,
}

impl Draft {
    /// Replace one field; no validation
    pub fn set(&mut self, field: DraftField, value: String) {
        match field {
            DraftField::Title => self.title = value,
            DraftField::Album => self.album = value,
            DraftField::Artist => self.artist = value,
            DraftField::PendingGenre => self.pending_genre = value,
        }
    }

    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::Title => &self.title,
            DraftField::Album => &self.album,
            DraftField::Artist => &self.artist,
            DraftField::PendingGenre => &self.pending_genre,
        }
    }
}
