use super::session_error;
use crate::http::{ApiError, Credentials};
use crate::models::chat::DEFAULT_CONVERSATION_TITLE;
use crate::models::{Conversation, ConversationSummary, Message, Prompt, Sender};
use crate::services::{CallResult, ChatService, ConversationContext, WithCredentials};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use tower_sessions::Session;

pub const CHAT_STORAGE_KEY: &str = "chat-storage";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatState {
    conversations: Vec<ConversationSummary>,
    current_conversation: Option<Conversation>,
    temp_messages: Vec<Message>,
}

/// Conversation list, selected conversation and the guest's scratch
/// messages.
pub struct ChatStore {
    session: Session,
    state: ChatState,
}

impl ChatStore {
    pub async fn load(session: &Session) -> Result<Self, AppError> {
        let state = session
            .get(CHAT_STORAGE_KEY)
            .await
            .map_err(session_error)?
            .unwrap_or_default();
        Ok(Self {
            session: session.clone(),
            state,
        })
    }

    pub async fn save(&self) -> Result<(), AppError> {
        self.session
            .insert(CHAT_STORAGE_KEY, &self.state)
            .await
            .map_err(session_error)
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.state.conversations
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.state.current_conversation.as_ref()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_conversation().map(|c| c.id.as_str())
    }

    /// Messages to display, oldest first.
    pub fn messages(&self, authenticated: bool) -> &[Message] {
        match (&self.state.current_conversation, authenticated) {
            (Some(conversation), true) => &conversation.messages,
            _ => &self.state.temp_messages,
        }
    }

    pub fn discard_guest_messages(&mut self) {
        self.state.temp_messages.clear();
    }

    pub fn new_chat(&mut self, authenticated: bool) {
        if authenticated {
            self.state.current_conversation = None;
        }
        self.state.temp_messages.clear();
    }

    /// Forget everything, for when the visitor signs out.
    pub fn reset(&mut self) {
        self.state = ChatState::default();
    }

    /// Append the user's message, ask the backend, append the answer.
    ///
    /// Guests (no `context`) only ever touch the scratch messages.
    /// Returns the credentials the call ended with.
    pub async fn send_message(
        &mut self,
        service: &ChatService,
        prompt: &Prompt,
        context: Option<ConversationContext>,
    ) -> Result<Option<Credentials>, ApiError> {
        let image = prompt
            .attachment
            .as_ref()
            .filter(|file| file.is_image())
            .map(|file| file.data_url());
        let user_message = Message::new(Sender::User, prompt.display_text(), image);

        let Some(mut context) = context else {
            self.state.temp_messages.push(user_message);
            let outcome = service.send_message(prompt, None).await?;
            self.state
                .temp_messages
                .push(Message::new(Sender::Assistant, outcome.reply.render(), None));
            return Ok(None);
        };

        context.chat_id = self.current_id().map(String::from);
        let outcome = service.send_message(prompt, Some(&context)).await?;
        let answer = Message::new(Sender::Assistant, outcome.reply.render(), None);

        if let Some(conversation) = self.state.current_conversation.as_mut() {
            conversation.messages.push(user_message);
            conversation.messages.push(answer);
            let id = conversation.id.clone();
            if let Some(summary) = self.state.conversations.iter_mut().find(|s| s.id == id) {
                summary.message_count += 2;
            }
            return Ok(outcome.credentials);
        }

        match outcome.conversation_id {
            Some(id) => {
                tracing::info!(chat_id = %id, "Conversation started");
                let conversation = Conversation {
                    id: id.clone(),
                    title: DEFAULT_CONVERSATION_TITLE.to_string(),
                    messages: vec![user_message, answer],
                };
                self.state.conversations.retain(|s| s.id != id);
                self.state.conversations.insert(
                    0,
                    ConversationSummary {
                        id,
                        title: conversation.title.clone(),
                        updated_at: Some(conversation.messages[1].created_at),
                        message_count: conversation.messages.len(),
                    },
                );
                self.state.temp_messages.clear();
                self.state.current_conversation = Some(conversation);
            }
            // no conversation id means the send failed; show it as scratch
            None => {
                self.state.temp_messages.push(user_message);
                self.state.temp_messages.push(answer);
            }
        }

        Ok(outcome.credentials)
    }

    pub async fn load_conversations(
        &mut self,
        service: &ChatService,
        credentials: &Credentials,
        user_id: &str,
    ) -> CallResult<()> {
        let (result, rotated) = service
            .list_conversations(credentials, user_id)
            .await
            .into_parts();
        let result = result.map(|conversations| self.state.conversations = conversations);
        WithCredentials::new(result, rotated)
    }

    pub async fn select_conversation(
        &mut self,
        service: &ChatService,
        credentials: &Credentials,
        chat_id: &str,
    ) -> CallResult<()> {
        let (result, rotated) = service
            .conversation_history(credentials, chat_id)
            .await
            .into_parts();
        let result = result.map(|conversation| {
            self.state.temp_messages.clear();
            self.state.current_conversation = Some(conversation);
        });
        WithCredentials::new(result, rotated)
    }

    pub async fn delete_conversation(
        &mut self,
        service: &ChatService,
        credentials: &Credentials,
        chat_id: &str,
    ) -> CallResult<()> {
        let (result, rotated) = service
            .delete_conversation(credentials, chat_id)
            .await
            .into_parts();
        if result.is_ok() {
            self.state.conversations.retain(|s| s.id != chat_id);
            if self.current_id() == Some(chat_id) {
                self.state.current_conversation = None;
            }
        }
        WithCredentials::new(result, rotated)
    }
}
