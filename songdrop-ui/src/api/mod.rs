//! HTTP API handlers for songdrop-ui

pub mod auth;
pub mod buildinfo;
pub mod form;
pub mod health;
pub mod sse;
pub mod submit;
pub mod ui;

pub use auth::auth_routes;
pub use buildinfo::get_build_info;
pub use form::form_routes;
pub use health::health_routes;
pub use sse::event_stream;
pub use submit::submit_routes;
pub use ui::ui_routes;
