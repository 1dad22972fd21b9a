use super::session_expired;
use crate::forms::{check, ChangePasswordForm, FieldErrors};
use crate::middleware::auth::AuthUser;
use crate::models::User;
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

pub const PASSWORD_CHANGED: &str = "Password updated successfully.";
pub const PASSWORD_CHANGE_FAILED: &str = "Failed to change password. Check your current password.";

#[derive(Template)]
#[template(path = "pages/account.html")]
pub struct AccountTemplate {
    pub user: User,
    pub current_page: &'static str,
}

#[derive(Template, Default)]
#[template(path = "pages/change_password.html")]
pub struct ChangePasswordTemplate {
    pub errors: FieldErrors,
    pub banner: String,
    pub success: String,
    pub current_page: &'static str,
}

#[derive(Template, Default)]
#[template(path = "fragments/change_password_form.html")]
pub struct ChangePasswordFormTemplate {
    pub errors: FieldErrors,
    pub banner: String,
    pub success: String,
}

pub async fn account_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    mut auth_user: AuthUser,
) -> Result<Response, AppError> {
    let (result, rotated) = state
        .user_service
        .get_user_current(&auth_user.credentials)
        .await
        .into_parts();
    auth_user.store.update_credentials(rotated);

    let user = match result {
        Ok(user) => {
            auth_user.store.set_user(user.clone());
            user
        }
        Err(e) if e.requires_login() => {
            return session_expired(&session, &mut auth_user.store, &headers).await
        }
        Err(e) => {
            // stale profile beats an error page
            tracing::warn!(error = %e, "Failed to refresh profile");
            auth_user.user.clone()
        }
    };
    auth_user.store.save().await?;

    Ok(AccountTemplate {
        user,
        current_page: "account",
    }
    .into_response())
}

pub async fn change_password_page(_auth_user: AuthUser) -> impl IntoResponse {
    ChangePasswordTemplate {
        current_page: "change-password",
        ..Default::default()
    }
}

pub async fn change_password_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    mut auth_user: AuthUser,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = check(&form) {
        return Ok(ChangePasswordFormTemplate {
            errors,
            ..Default::default()
        }
        .into_response());
    }

    let (result, rotated) = state
        .user_service
        .change_password(
            &auth_user.credentials,
            &form.current_password,
            &form.new_password,
        )
        .await
        .into_parts();
    auth_user.store.update_credentials(rotated);

    let fragment = match result {
        Ok(()) => ChangePasswordFormTemplate {
            success: PASSWORD_CHANGED.to_string(),
            ..Default::default()
        },
        Err(e) if e.requires_login() => {
            return session_expired(&session, &mut auth_user.store, &headers).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password change rejected");
            ChangePasswordFormTemplate {
                banner: PASSWORD_CHANGE_FAILED.to_string(),
                ..Default::default()
            }
        }
    };

    auth_user.store.save().await?;
    Ok(fragment.into_response())
}
