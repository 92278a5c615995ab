//! Event types for the songdrop event system
//!
//! Provides shared event definitions and the EventBus used to push submission
//! progress to connected browsers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// One of the two file selections a submission carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSlot {
    Song,
    Cover,
}

impl FileSlot {
    pub const ALL: [FileSlot; 2] = [FileSlot::Cover, FileSlot::Song];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileSlot::Song => "song",
            FileSlot::Cover => "cover",
        }
    }
}

impl fmt::Display for FileSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "song" => Ok(FileSlot::Song),
            "cover" => Ok(FileSlot::Cover),
            other => Err(format!("Unknown file slot: {}", other)),
        }
    }
}

/// Submission state machine
///
/// `Idle → Inserting → Uploading → Patching → {Done | Failed}`.
/// There is no transition out of a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionPhase {
    Idle,
    Inserting,
    Uploading,
    Patching,
    Done,
    Failed,
}

impl SubmissionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionPhase::Done | SubmissionPhase::Failed)
    }
}

/// songdrop event types
///
/// Broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SongdropEvent {
    /// Submission accepted and about to insert the row
    SubmissionStarted {
        submission_id: Uuid,
        title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Sequencer moved to a new phase
    SubmissionPhaseChanged {
        submission_id: Uuid,
        phase: SubmissionPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Fraction of one file transferred so far
    UploadProgress {
        submission_id: Uuid,
        slot: FileSlot,
        /// 0-100
        percent: u8,
    },

    /// Row inserted, uploads attempted, row patched
    SubmissionCompleted {
        submission_id: Uuid,
        row_id: i64,
        song_url: Option<String>,
        cover_url: Option<String>,
        /// Slots whose upload did not complete
        failed_uploads: Vec<FileSlot>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Submission aborted (insert failure, patch failure, missing file)
    SubmissionFailed {
        submission_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Form returned to its initial state
    FormReset {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SongdropEvent {
    /// SSE `event:` name
    pub fn event_type(&self) -> &'static str {
        match self {
            SongdropEvent::SubmissionStarted { .. } => "SubmissionStarted",
            SongdropEvent::SubmissionPhaseChanged { .. } => "SubmissionPhaseChanged",
            SongdropEvent::UploadProgress { .. } => "UploadProgress",
            SongdropEvent::SubmissionCompleted { .. } => "SubmissionCompleted",
            SongdropEvent::SubmissionFailed { .. } => "SubmissionFailed",
            SongdropEvent::FormReset { .. } => "FormReset",
        }
    }
}

/// Broadcast bus for [`SongdropEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SongdropEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SongdropEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SongdropEvent,
    ) -> Result<usize, broadcast::error::SendError<SongdropEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SongdropEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_slot_round_trip_str() {
        for slot in FileSlot::ALL {
            assert_eq!(slot.as_str().parse::<FileSlot>().unwrap(), slot);
        }
        assert!("lyrics".parse::<FileSlot>().is_err());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(SubmissionPhase::Done.is_terminal());
        assert!(SubmissionPhase::Failed.is_terminal());
        assert!(!SubmissionPhase::Idle.is_terminal());
        assert!(!SubmissionPhase::Uploading.is_terminal());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = SongdropEvent::UploadProgress {
            submission_id: Uuid::new_v4(),
            slot: FileSlot::Cover,
            percent: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "UploadProgress");
        assert_eq!(json["slot"], "cover");
        assert_eq!(json["percent"], 42);
        assert_eq!(event.event_type(), "UploadProgress");
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(SongdropEvent::FormReset {
            timestamp: chrono::Utc::now(),
        })
        .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "FormReset");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let event = SongdropEvent::FormReset {
            timestamp: chrono::Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.capacity(), 10);
    }
}
