use super::{redirect, session_expired};
use crate::middleware::auth::AuthUser;
use crate::models::{Attachment, Message, Prompt};
use crate::services::ConversationContext;
use crate::stores::{AuthStore, ChatStore};
use crate::AppState;
use askama::Template;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use service_core::error::AppError;
use tower_sessions::Session;

pub const EMPTY_PROMPT: &str = "Please enter a message or attach a file.";

#[derive(Template)]
#[template(path = "fragments/messages.html")]
pub struct MessagesTemplate {
    pub messages: Vec<Message>,
    pub error: String,
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::BadRequest(anyhow::Error::new(e))
}

async fn read_prompt(mut multipart: Multipart) -> Result<Prompt, AppError> {
    let mut text = None;
    let mut attachment = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => {
                text = Some(field.text().await.map_err(bad_multipart)?);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;

                // an untouched file input still submits an empty part
                if !bytes.is_empty() {
                    attachment = Some(Attachment {
                        file_name: if file_name.is_empty() {
                            "upload".to_string()
                        } else {
                            file_name
                        },
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(Prompt::new(text, attachment))
}

pub async fn send_message(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let prompt = read_prompt(multipart).await?;
    let mut auth = AuthStore::load(&session).await?;
    let mut chat = ChatStore::load(&session).await?;
    let authenticated = auth.is_authenticated();

    if prompt.is_empty() {
        return Ok(MessagesTemplate {
            messages: chat.messages(authenticated).to_vec(),
            error: EMPTY_PROMPT.to_string(),
        }
        .into_response());
    }

    let context = match (auth.user(), auth.credentials()) {
        (Some(user), Some(credentials)) if authenticated => Some(ConversationContext {
            credentials,
            user_id: user.conversation_owner(),
            chat_id: None,
        }),
        _ => None,
    };

    match chat.send_message(&state.chat_service, &prompt, context).await {
        Ok(rotated) => auth.update_credentials(rotated),
        Err(e) if e.requires_login() => {
            return session_expired(&session, &mut auth, &headers).await
        }
        Err(e) => return Err(e.into()),
    }

    auth.save().await?;
    chat.save().await?;
    Ok(MessagesTemplate {
        messages: chat.messages(authenticated).to_vec(),
        error: String::new(),
    }
    .into_response())
}

pub async fn new_chat(session: Session, headers: HeaderMap) -> Result<Response, AppError> {
    let auth = AuthStore::load(&session).await?;
    let mut chat = ChatStore::load(&session).await?;
    chat.new_chat(auth.is_authenticated());
    chat.save().await?;
    Ok(redirect(&headers, "/"))
}

pub async fn select_conversation(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    mut auth_user: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Response, AppError> {
    let mut chat = ChatStore::load(&session).await?;

    let (result, rotated) = chat
        .select_conversation(&state.chat_service, &auth_user.credentials, &chat_id)
        .await
        .into_parts();
    auth_user.store.update_credentials(rotated);

    match result {
        Ok(()) => {}
        Err(e) if e.requires_login() => {
            return session_expired(&session, &mut auth_user.store, &headers).await
        }
        Err(e) => tracing::warn!(chat_id = %chat_id, error = %e, "Failed to load conversation"),
    }

    auth_user.store.save().await?;
    chat.save().await?;
    Ok(Redirect::to("/").into_response())
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    mut auth_user: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Response, AppError> {
    let mut chat = ChatStore::load(&session).await?;

    let (result, rotated) = chat
        .delete_conversation(&state.chat_service, &auth_user.credentials, &chat_id)
        .await
        .into_parts();
    auth_user.store.update_credentials(rotated);

    match result {
        Ok(()) => {}
        Err(e) if e.requires_login() => {
            return session_expired(&session, &mut auth_user.store, &headers).await
        }
        Err(e) => {
            auth_user.store.save().await?;
            return Err(e.into());
        }
    }

    auth_user.store.save().await?;
    chat.save().await?;
    Ok(redirect(&headers, "/"))
}
