pub mod app;
pub mod auth;
pub mod chat;
pub mod metrics;
pub mod settings;

use crate::stores::{AuthStore, ChatStore};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use service_core::error::AppError;
use tower_sessions::Session;

pub const HX_REQUEST: &str = "hx-request";
pub const HX_REDIRECT: &str = "hx-redirect";

pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

/// Send the browser elsewhere. HTMX requests get `HX-Redirect` so the
/// navigation replaces the page instead of a swapped fragment.
pub fn redirect(headers: &HeaderMap, location: &'static str) -> Response {
    if is_htmx(headers) {
        let mut response = StatusCode::OK.into_response();
        response
            .headers_mut()
            .insert(HX_REDIRECT, HeaderValue::from_static(location));
        response
    } else {
        Redirect::to(location).into_response()
    }
}

/// The backend refused the visitor's session even after a refresh: sign
/// out locally and go to the login page.
pub(crate) async fn session_expired(
    session: &Session,
    auth: &mut AuthStore,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    tracing::warn!("Backend session expired, re-login required");
    auth.clear();
    auth.save().await?;

    let mut chat = ChatStore::load(session).await?;
    chat.reset();
    chat.save().await?;

    Ok(redirect(headers, "/login"))
}
