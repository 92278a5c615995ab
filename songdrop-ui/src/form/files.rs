//! File selections for the song and cover slots

use bytes::Bytes;
use serde::Serialize;

/// Content type assumed when the browser does not send one
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A user-chosen binary payload plus its declared media type
///
/// No type or size validation happens here; the object store decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FileSelection {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let content_type = content_type.into();
        Self {
            file_name: file_name.into(),
            content_type: if content_type.trim().is_empty() {
                FALLBACK_CONTENT_TYPE.to_string()
            } else {
                content_type
            },
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            size_bytes: self.size(),
        }
    }
}

/// Payload-free view of a [`FileSelection`] for the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
}
