use super::session_error;
use crate::http::Credentials;
use crate::models::User;
use crate::services::{AuthService, RegisterPayload, UserService};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use tower_sessions::Session;

pub const AUTH_STORAGE_KEY: &str = "auth-storage";
pub const BACKEND_COOKIES_KEY: &str = "backend-cookies";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSnapshot {
    user: Option<User>,
    token: Option<String>,
    is_authenticated: bool,
}

/// Who the visitor is signed in as.
///
/// `is_authenticated` holds exactly when both a user and a token are
/// present; every mutator re-establishes that.
pub struct AuthStore {
    session: Session,
    user: Option<User>,
    token: Option<String>,
    cookie: Option<String>,
    is_authenticated: bool,
}

impl AuthStore {
    pub async fn load(session: &Session) -> Result<Self, AppError> {
        let snapshot: AuthSnapshot = session
            .get(AUTH_STORAGE_KEY)
            .await
            .map_err(session_error)?
            .unwrap_or_default();
        let cookie: Option<String> = session
            .get(BACKEND_COOKIES_KEY)
            .await
            .map_err(session_error)?;

        let mut store = Self {
            session: session.clone(),
            user: snapshot.user,
            token: snapshot.token,
            cookie,
            is_authenticated: snapshot.is_authenticated,
        };

        let consistent = store.is_authenticated == (store.user.is_some() && store.token.is_some());
        if !consistent {
            tracing::warn!("Discarding inconsistent auth snapshot");
            store.clear();
        }
        Ok(store)
    }

    pub async fn save(&self) -> Result<(), AppError> {
        let snapshot = AuthSnapshot {
            user: self.user.clone(),
            token: self.token.clone(),
            is_authenticated: self.is_authenticated,
        };
        self.session
            .insert(AUTH_STORAGE_KEY, snapshot)
            .await
            .map_err(session_error)?;

        match &self.cookie {
            Some(cookie) => self
                .session
                .insert(BACKEND_COOKIES_KEY, cookie)
                .await
                .map_err(session_error)?,
            None => {
                self.session
                    .remove::<String>(BACKEND_COOKIES_KEY)
                    .await
                    .map_err(session_error)?;
            }
        }
        Ok(())
    }

    fn sync(&mut self) {
        self.is_authenticated = self.user.is_some() && self.token.is_some();
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.token.as_ref().map(|token| Credentials {
            access_token: token.clone(),
            cookie: self.cookie.clone(),
        })
    }

    pub fn set_session(&mut self, user: User, credentials: Credentials) {
        self.user = Some(user);
        self.token = Some(credentials.access_token);
        self.cookie = credentials.cookie;
        self.sync();
    }

    /// Persist credentials a refresh rotated. Ignored when signed out.
    pub fn update_credentials(&mut self, credentials: Option<Credentials>) {
        let Some(credentials) = credentials else {
            return;
        };
        if self.token.is_none() {
            return;
        }
        self.token = Some(credentials.access_token);
        if credentials.cookie.is_some() {
            self.cookie = credentials.cookie;
        }
        self.sync();
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
        self.sync();
    }

    pub fn clear(&mut self) {
        self.user = None;
        self.token = None;
        self.cookie = None;
        self.sync();
    }

    /// Exchange credentials, then fetch the profile with the new token.
    /// The store only becomes authenticated when both calls succeed.
    pub async fn login(
        &mut self,
        auth: &AuthService,
        users: &UserService,
        email: &str,
        password: &str,
    ) -> Result<bool, AppError> {
        let grant = match auth.login(email, password).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(error = %e, "Login rejected");
                self.clear();
                self.save().await?;
                return Ok(false);
            }
        };

        let credentials = grant.credentials();
        let (result, rotated) = users.get_user_current(&credentials).await.into_parts();
        match result {
            Ok(user) => {
                // new id for the signed-in session
                self.session.cycle_id().await.map_err(session_error)?;
                tracing::info!(email = %user.email, "User logged in");
                self.set_session(user, rotated.unwrap_or(credentials));
                self.save().await?;
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch current user after login");
                self.clear();
                self.save().await?;
                Ok(false)
            }
        }
    }

    pub async fn register(&self, auth: &AuthService, payload: &RegisterPayload) -> bool {
        match auth.register(payload).await {
            Ok(()) => {
                tracing::info!(email = %payload.email, "User registered");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Registration failed");
                false
            }
        }
    }

    pub async fn logout(&mut self, auth: &AuthService) -> Result<(), AppError> {
        if let Some(credentials) = self.credentials() {
            if let Err(e) = auth.logout(&credentials).await {
                tracing::warn!(error = %e, "Backend logout failed, clearing local session anyway");
            }
        }
        self.clear();
        // the signed-out visitor must not keep the signed-in session id
        self.session.cycle_id().await.map_err(session_error)?;
        self.save().await
    }
}
