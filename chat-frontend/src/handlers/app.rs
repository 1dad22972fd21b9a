use super::session_expired;
use crate::models::{ConversationSummary, Message};
use crate::stores::{AuthStore, ChatStore};
use crate::AppState;
use askama::Template;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use tower_sessions::Session;

#[derive(Template)]
#[template(path = "pages/chat.html")]
pub struct ChatTemplate {
    pub authenticated: bool,
    pub user_name: String,
    pub user_initials: String,
    pub conversations: Vec<ConversationSummary>,
    pub current_id: String,
    pub current_title: String,
    pub messages: Vec<Message>,
    pub error: String,
}

impl ChatTemplate {
    pub fn new(auth: &AuthStore, chat: &ChatStore) -> Self {
        let authenticated = auth.is_authenticated();
        let (user_name, user_initials) = auth
            .user()
            .map(|u| (u.name(), u.initials()))
            .unwrap_or_default();

        Self {
            authenticated,
            user_name,
            user_initials,
            conversations: chat.conversations().to_vec(),
            current_id: chat.current_id().unwrap_or_default().to_string(),
            current_title: chat
                .current_conversation()
                .map(|c| c.title.clone())
                .unwrap_or_default(),
            messages: chat.messages(authenticated).to_vec(),
            error: String::new(),
        }
    }
}

pub async fn index(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut auth = AuthStore::load(&session).await?;
    let mut chat = ChatStore::load(&session).await?;
    chat.discard_guest_messages();

    if let (Some(user), Some(credentials)) = (auth.user().cloned(), auth.credentials()) {
        let (result, rotated) = chat
            .load_conversations(&state.chat_service, &credentials, &user.conversation_owner())
            .await
            .into_parts();
        auth.update_credentials(rotated);

        match result {
            Ok(()) => {}
            Err(e) if e.requires_login() => {
                return session_expired(&session, &mut auth, &headers).await
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load conversations"),
        }
    }

    auth.save().await?;
    chat.save().await?;
    Ok(ChatTemplate::new(&auth, &chat).into_response())
}

pub async fn health_check() -> &'static str {
    "OK"
}
