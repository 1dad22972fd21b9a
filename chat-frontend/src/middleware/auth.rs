use crate::handlers::redirect;
use crate::http::Credentials;
use crate::models::User;
use crate::stores::AuthStore;
use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

/// Route guard: visitors who are not signed in go to `/login`.
pub async fn auth_middleware(
    session: Session,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let store = AuthStore::load(&session)
        .await
        .map_err(IntoResponse::into_response)?;

    if !store.is_authenticated() {
        return Ok(redirect(request.headers(), "/login"));
    }

    Ok(next.run(request).await)
}

/// The signed-in visitor, with the store they were loaded from so a
/// handler can persist rotated credentials.
pub struct AuthUser {
    pub user: User,
    pub credentials: Credentials,
    pub store: AuthStore,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let store = AuthStore::load(&session)
            .await
            .map_err(IntoResponse::into_response)?;

        match (store.user().cloned(), store.credentials()) {
            (Some(user), Some(credentials)) if store.is_authenticated() => Ok(AuthUser {
                user,
                credentials,
                store,
            }),
            _ => Err(redirect(&parts.headers, "/login")),
        }
    }
}
