use super::redirect;
use crate::forms::{check, FieldErrors, LoginForm, RegisterForm};
use crate::services::RegisterPayload;
use crate::stores::{AuthStore, ChatStore};
use crate::AppState;
use askama::Template;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Form,
};
use service_core::error::AppError;
use tower_sessions::Session;

pub const LOGIN_FAILED: &str = "Invalid email or password.";
pub const REGISTER_FAILED: &str = "Registration failed. User might already exist.";

#[derive(Template, Default)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub errors: FieldErrors,
    pub banner: String,
}

#[derive(Template, Default)]
#[template(path = "fragments/login_form.html")]
pub struct LoginFormTemplate {
    pub email: String,
    pub errors: FieldErrors,
    pub banner: String,
}

#[derive(Template, Default)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub email: String,
    pub username: String,
    pub errors: FieldErrors,
    pub banner: String,
}

#[derive(Template, Default)]
#[template(path = "fragments/register_form.html")]
pub struct RegisterFormTemplate {
    pub email: String,
    pub username: String,
    pub errors: FieldErrors,
    pub banner: String,
}

pub async fn login_page() -> impl IntoResponse {
    LoginTemplate::default()
}

pub async fn register_page() -> impl IntoResponse {
    RegisterTemplate::default()
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = check(&form) {
        return Ok(LoginFormTemplate {
            email: form.email,
            errors,
            banner: String::new(),
        }
        .into_response());
    }

    let mut auth = AuthStore::load(&session).await?;
    let ok = auth
        .login(
            &state.auth_service,
            &state.user_service,
            &form.email,
            &form.password,
        )
        .await?;

    if !ok {
        return Ok(LoginFormTemplate {
            email: form.email,
            errors: FieldErrors::default(),
            banner: LOGIN_FAILED.to_string(),
        }
        .into_response());
    }

    let mut chat = ChatStore::load(&session).await?;
    chat.reset();
    chat.save().await?;

    Ok(redirect(&headers, "/"))
}

pub async fn register_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = check(&form) {
        return Ok(RegisterFormTemplate {
            email: form.email,
            username: form.username,
            errors,
            banner: String::new(),
        }
        .into_response());
    }

    let payload = RegisterPayload {
        email: form.email.clone(),
        username: form.username.clone(),
        password: form.password,
        confirm_password: form.confirm_password,
    };

    let auth = AuthStore::load(&session).await?;
    if !auth.register(&state.auth_service, &payload).await {
        return Ok(RegisterFormTemplate {
            email: form.email,
            username: form.username,
            errors: FieldErrors::default(),
            banner: REGISTER_FAILED.to_string(),
        }
        .into_response());
    }

    Ok(redirect(&headers, "/login"))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut auth = AuthStore::load(&session).await?;
    auth.logout(&state.auth_service).await?;

    let mut chat = ChatStore::load(&session).await?;
    chat.reset();
    chat.save().await?;

    tracing::info!("User logged out");
    Ok(redirect(&headers, "/"))
}
