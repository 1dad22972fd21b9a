//! Per-visitor state kept in the server-side session.
//!
//! Stores are plain containers: a handler loads one from its [`Session`],
//! mutates it, and saves it back before responding.

pub mod auth_store;
pub mod chat_store;

pub use auth_store::AuthStore;
pub use chat_store::ChatStore;

use service_core::error::AppError;
use tower_sessions::session;

pub(crate) fn session_error(e: session::Error) -> AppError {
    tracing::error!(error = %e, "Session store failure");
    AppError::SessionError(e.to_string())
}
