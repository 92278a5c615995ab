//! OAuth sign-in routes
//!
//! `/auth/signin` redirects the browser to the backend's authorize endpoint.
//! After sign-in the provider returns to the form page with the access token
//! in the URL fragment; the page posts it to `/auth/session`.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// GET /auth/signin query
#[derive(Debug, Default, Deserialize)]
pub struct SignInQuery {
    /// Overrides the configured provider
    pub provider: Option<String>,
}

/// POST /auth/session request
#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    /// `null` signs out
    pub access_token: Option<String>,
}

/// GET/POST /auth/session response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub signed_in: bool,
}

/// GET /auth/signin
pub async fn sign_in(
    State(state): State<AppState>,
    Query(query): Query<SignInQuery>,
) -> ApiResult<Redirect> {
    let provider = query
        .provider
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.auth.provider.clone());

    let url = state
        .backend
        .auth
        .sign_in_url(&provider, state.auth.redirect_to.as_deref())?;

    info!(%provider, "Redirecting to OAuth sign-in");
    Ok(Redirect::to(&url))
}

/// GET /auth/session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        signed_in: state.backend.auth.has_session().await,
    })
}

/// POST /auth/session
pub async fn set_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let token = match request.access_token {
        Some(token) if token.trim().is_empty() => {
            return Err(ApiError::BadRequest("access_token must not be blank".to_string()))
        }
        other => other,
    };

    let signed_in = token.is_some();
    state.backend.auth.set_access_token(token).await;
    info!(signed_in, "Backend session updated");

    Ok(Json(SessionResponse { signed_in }))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signin", get(sign_in))
        .route("/auth/session", get(get_session).post(set_session))
}
