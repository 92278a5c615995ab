//! Server-Sent Events for submission progress

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Streams SubmissionStarted, SubmissionPhaseChanged, UploadProgress,
/// SubmissionCompleted, SubmissionFailed and FormReset.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    songdrop_common::sse::create_event_sse_stream("songdrop-ui", &state.event_bus)
}
