//! Submission endpoint
//!
//! POST /api/submit runs the sequencer on a snapshot of the form. The
//! sequence runs in its own task so a dropped client connection cannot stop
//! it halfway or leave the in-progress flag raised.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use songdrop_common::{EventBus, FileSlot, SongdropEvent, SubmissionPhase};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    form::{SharedForm, SubmissionGuard},
    submission::{SubmissionObserver, SubmissionReport},
    AppState,
};

/// POST /api/submit response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub submission_id: Uuid,
    #[serde(flatten)]
    pub report: SubmissionReport,
}

/// Mirrors sequencer progress into the form and onto the event bus
struct FormObserver {
    submission_id: Uuid,
    form: SharedForm,
    event_bus: EventBus,
}

impl SubmissionObserver for FormObserver {
    fn phase_changed(&self, phase: SubmissionPhase) {
        self.event_bus.emit_lossy(SongdropEvent::SubmissionPhaseChanged {
            submission_id: self.submission_id,
            phase,
            timestamp: chrono::Utc::now(),
        });
    }

    fn upload_progress(&self, slot: FileSlot, percent: u8) {
        self.form.write(|f| f.set_progress(slot, percent));
        self.event_bus.emit_lossy(SongdropEvent::UploadProgress {
            submission_id: self.submission_id,
            slot,
            percent,
        });
    }
}

/// POST /api/submit
pub async fn submit(State(state): State<AppState>) -> ApiResult<Json<SubmitResponse>> {
    let guard = SubmissionGuard::acquire(&state.form)
        .ok_or_else(|| ApiError::Conflict("A submission is already in progress".to_string()))?;

    let submission_id = Uuid::new_v4();
    let request = state.form.read(|f| f.submission_request());

    info!(
        %submission_id,
        title = %request.draft.title,
        genres = request.genres.len(),
        "Submission started"
    );
    state.event_bus.emit_lossy(SongdropEvent::SubmissionStarted {
        submission_id,
        title: request.draft.title.clone(),
        timestamp: chrono::Utc::now(),
    });

    let observer = Arc::new(FormObserver {
        submission_id,
        form: state.form.clone(),
        event_bus: state.event_bus.clone(),
    });

    let task_state = state.clone();
    let task = tokio::spawn(async move {
        let _guard = guard;
        let result = task_state.sequencer.submit(&request, observer).await;

        match &result {
            Ok(report) => {
                task_state.form.write(|f| f.reset());
                task_state.event_bus.emit_lossy(SongdropEvent::FormReset {
                    timestamp: chrono::Utc::now(),
                });
                task_state.event_bus.emit_lossy(SongdropEvent::SubmissionCompleted {
                    submission_id,
                    row_id: report.row_id,
                    song_url: report.song.as_ref().map(|r| r.public_url.clone()),
                    cover_url: report.cover.as_ref().map(|r| r.public_url.clone()),
                    failed_uploads: report.failed_uploads(),
                    timestamp: chrono::Utc::now(),
                });
            }
            Err(e) => {
                error!(%submission_id, error = %e, "Submission failed");
                task_state.event_bus.emit_lossy(SongdropEvent::SubmissionFailed {
                    submission_id,
                    error: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
            }
        }
        result
    });

    let report = task
        .await
        .map_err(|e| ApiError::Internal(format!("Submission task failed: {}", e)))??;

    Ok(Json(SubmitResponse {
        submission_id,
        report,
    }))
}

pub fn submit_routes() -> Router<AppState> {
    Router::new().route("/api/submit", post(submit))
}
