//! songdrop-ui library
//!
//! Local web service behind the song submission form. Exposes the form state,
//! the submission sequencer and the router for integration testing.

pub mod api;
pub mod backend;
pub mod error;
pub mod form;
pub mod logging;
pub mod submission;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use songdrop_common::config::TomlConfig;
use songdrop_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::BackendContext;
use crate::form::SharedForm;
use crate::submission::{Sequencer, SequencerSettings};

/// OAuth settings used by `/auth/signin`
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub provider: String,
    pub redirect_to: Option<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The single in-memory form
    pub form: SharedForm,
    /// Backend collaborators (auth is used directly by the auth routes)
    pub backend: BackendContext,
    pub sequencer: Sequencer,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub auth: AuthSettings,
    /// Largest accepted file body
    pub max_upload_bytes: usize,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(backend: BackendContext, config: &TomlConfig, event_bus: EventBus) -> Self {
        let settings = SequencerSettings::from_config(&config.storage, &config.submission);
        Self {
            form: SharedForm::default(),
            sequencer: Sequencer::new(backend.clone(), settings),
            backend,
            event_bus,
            auth: AuthSettings {
                provider: config.auth.provider.clone(),
                redirect_to: config.auth.redirect_to.clone(),
            },
            max_upload_bytes: config.server.max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::ui_routes())
        .merge(api::form_routes(state.max_upload_bytes))
        .merge(api::submit_routes())
        .merge(api::auth_routes())
        .route("/events", get(api::event_stream))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
