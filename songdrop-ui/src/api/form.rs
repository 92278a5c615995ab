//! Form state endpoints
//!
//! Each mutating endpoint maps onto one form state operation and answers with
//! the resulting snapshot so the browser can re-render. While a submission is
//! running the form is read-only: edits get 409, since a successful
//! submission resets the form and would discard them.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use songdrop_common::{FileSlot, SongdropEvent};
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    form::{DraftField, FileSelection, FormSnapshot, FormState, GenreTag},
    AppState,
};

/// PUT /api/form/fields request
#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub field: DraftField,
    pub value: String,
}

/// POST /api/form/genres request
///
/// Without `title` the draft's pending genre text is added.
#[derive(Debug, Default, Deserialize)]
pub struct AddGenreRequest {
    #[serde(default)]
    pub title: Option<String>,
}

/// POST /api/form/files/:slot query
#[derive(Debug, Default, Deserialize)]
pub struct SelectFileQuery {
    /// Original file name
    pub name: Option<String>,
}

/// POST /api/form/genres response
#[derive(Debug, Serialize)]
pub struct AddGenreResponse {
    /// `None` when the text was blank or a duplicate
    pub added: Option<GenreTag>,
    pub form: FormSnapshot,
}

/// DELETE /api/form/genres/:id and /api/form/files/:slot response
#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub removed: bool,
    pub form: FormSnapshot,
}

/// Apply `edit` to the form unless a submission holds it
fn edit_form<R>(state: &AppState, edit: impl FnOnce(&mut FormState) -> R) -> ApiResult<R> {
    state.form.write(|form| {
        if form.is_submitting() {
            return Err(ApiError::Conflict(
                "Form is locked while a submission is in progress".to_string(),
            ));
        }
        Ok(edit(form))
    })
}

/// GET /api/form
pub async fn get_form(State(state): State<AppState>) -> Json<FormSnapshot> {
    Json(state.form.read(|f| f.snapshot()))
}

/// PUT /api/form/fields
pub async fn update_field(
    State(state): State<AppState>,
    Json(request): Json<UpdateFieldRequest>,
) -> ApiResult<Json<FormSnapshot>> {
    let field = request.field;
    let snapshot = edit_form(&state, |f| {
        f.update_field(request.field, request.value);
        f.snapshot()
    })?;
    debug!(?field, "Form field updated");
    Ok(Json(snapshot))
}

/// POST /api/form/genres
pub async fn add_genre(
    State(state): State<AppState>,
    Json(request): Json<AddGenreRequest>,
) -> ApiResult<Json<AddGenreResponse>> {
    let (added, form) = edit_form(&state, |f| {
        let added = match request.title.as_deref() {
            Some(title) => f.add_genre_text(title),
            None => f.add_genre(),
        };
        (added, f.snapshot())
    })?;

    match &added {
        Some(tag) => debug!(id = tag.id, title = %tag.title, "Genre added"),
        None => debug!("Genre add ignored (blank or duplicate)"),
    }
    Ok(Json(AddGenreResponse { added, form }))
}

/// DELETE /api/form/genres/:id
pub async fn remove_genre(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Json<RemoveResponse>> {
    let (removed, form) = edit_form(&state, |f| (f.remove_genre(id), f.snapshot()))?;
    Ok(Json(RemoveResponse { removed, form }))
}

/// POST /api/form/files/:slot
///
/// The request body is the raw file, `Content-Type` its media type and the
/// `name` query parameter its original name.
pub async fn select_file(
    State(state): State<AppState>,
    Path(slot): Path<FileSlot>,
    Query(query): Query<SelectFileQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<FormSnapshot>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest(format!("Empty {} file", slot)));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let file_name = query
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| slot.to_string());

    let selection = FileSelection::new(file_name, content_type, body);
    let summary = selection.summary();

    let snapshot = edit_form(&state, |f| {
        f.select_file(slot, selection);
        f.snapshot()
    })?;
    info!(
        %slot,
        file_name = %summary.file_name,
        content_type = %summary.content_type,
        bytes = summary.size_bytes,
        "File selected"
    );
    Ok(Json(snapshot))
}

/// DELETE /api/form/files/:slot
pub async fn clear_file(
    State(state): State<AppState>,
    Path(slot): Path<FileSlot>,
) -> ApiResult<Json<RemoveResponse>> {
    let (removed, form) = edit_form(&state, |f| (f.clear_file(slot), f.snapshot()))?;
    Ok(Json(RemoveResponse { removed, form }))
}

/// POST /api/form/reset
pub async fn reset_form(State(state): State<AppState>) -> ApiResult<Json<FormSnapshot>> {
    let snapshot = edit_form(&state, |f| {
        f.reset();
        f.snapshot()
    })?;
    state.event_bus.emit_lossy(SongdropEvent::FormReset {
        timestamp: chrono::Utc::now(),
    });
    Ok(Json(snapshot))
}

/// Build form routes; file bodies may be up to `max_upload_bytes`
pub fn form_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/form", get(get_form))
        .route("/api/form/fields", put(update_field))
        .route("/api/form/genres", post(add_genre))
        .route("/api/form/genres/:id", delete(remove_genre))
        .route(
            "/api/form/files/:slot",
            post(select_file)
                .delete(clear_file)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/form/reset", post(reset_form))
}
