use super::{send_authenticated, CallResult};
use crate::http::{ApiError, ApiRequest, ApiTransport, Credentials, HttpClientFactory, MultipartBody};
use crate::models::chat::{ConversationHistory, ConversationList, GENERIC_CHAT_ERROR};
use crate::models::{ChatReply, Conversation, ConversationReply, ConversationSummary, Prompt};
use std::sync::Arc;

/// Who is sending and where the message belongs. Guests have none.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub credentials: Credentials,
    pub user_id: String,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub reply: ChatReply,
    /// Conversation the backend filed the exchange under.
    pub conversation_id: Option<String>,
    /// Credentials after the call. A refresh may have rotated them even
    /// when the reply is an error.
    pub credentials: Option<Credentials>,
}

impl SendOutcome {
    fn failed() -> Self {
        Self {
            reply: ChatReply::Error(GENERIC_CHAT_ERROR.to_string()),
            conversation_id: None,
            credentials: None,
        }
    }
}

#[derive(Clone)]
pub struct ChatService {
    factory: Arc<HttpClientFactory>,
}

fn prompt_form(prompt: &Prompt) -> MultipartBody {
    let mut form = MultipartBody::new();
    if let Some(text) = &prompt.text {
        form = form.text("message", text.clone());
    }
    if let Some(file) = &prompt.attachment {
        form = form.file(
            "file",
            file.file_name.clone(),
            file.content_type.clone(),
            file.bytes.clone(),
        );
    }
    form
}

fn join_path(base: &str, id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id)
}

impl ChatService {
    pub fn new(factory: Arc<HttpClientFactory>) -> Self {
        Self { factory }
    }

    /// Send a prompt and resolve the backend's answer into a [`ChatReply`].
    ///
    /// Backend failures are folded into `ChatReply::Error`. The only error
    /// returned is one that needs the visitor to sign in again.
    pub async fn send_message(
        &self,
        prompt: &Prompt,
        context: Option<&ConversationContext>,
    ) -> Result<SendOutcome, ApiError> {
        let (result, credentials) = match context {
            None => (self.send_guest(prompt).await, None),
            Some(context) => self.send_in_conversation(prompt, context).await.into_parts(),
        };

        match result {
            Ok(outcome) => Ok(SendOutcome {
                credentials,
                ..outcome
            }),
            Err(e) if e.requires_login() && context.is_some() => Err(e),
            Err(e) => {
                tracing::error!(error = %e, "Chat request failed");
                Ok(SendOutcome {
                    credentials,
                    ..SendOutcome::failed()
                })
            }
        }
    }

    async fn send_guest(&self, prompt: &Prompt) -> Result<SendOutcome, ApiError> {
        let client = self.factory.create(None)?;
        let request =
            ApiRequest::post(self.factory.endpoints().prompt.clone()).multipart(prompt_form(prompt));
        let response = client.send(request).await?;
        let body: serde_json::Value = response.json()?;

        Ok(SendOutcome {
            reply: ChatReply::from_prompt_body(&body),
            conversation_id: None,
            credentials: None,
        })
    }

    async fn send_in_conversation(
        &self,
        prompt: &Prompt,
        context: &ConversationContext,
    ) -> CallResult<SendOutcome> {
        let mut form = MultipartBody::new().text("user_id", context.user_id.clone());
        if let Some(text) = &prompt.text {
            form = form.text("message", text.clone());
        }
        if let Some(chat_id) = &context.chat_id {
            form = form.text("chat_id", chat_id.clone());
        }
        if let Some(file) = &prompt.attachment {
            form = form.file(
                "file",
                file.file_name.clone(),
                file.content_type.clone(),
                file.bytes.clone(),
            );
        }

        let request = ApiRequest::post(self.factory.endpoints().conversation_message.clone())
            .multipart(form);

        send_authenticated(&self.factory, &context.credentials, request)
            .await
            .and_then(|response| {
                let reply: ConversationReply = response.json()?;

                tracing::debug!(
                    chat_id = %reply.chat_id,
                    context_used = reply.context_used,
                    was_summarized = reply.was_summarized,
                    "Conversation reply received"
                );

                let text = reply.message.trim();
                let chat_reply = if text.is_empty() {
                    ChatReply::Error(GENERIC_CHAT_ERROR.to_string())
                } else {
                    ChatReply::RagResponse(text.to_string())
                };

                Ok(SendOutcome {
                    reply: chat_reply,
                    conversation_id: Some(reply.chat_id),
                    credentials: None,
                })
            })
    }

    pub async fn list_conversations(
        &self,
        credentials: &Credentials,
        user_id: &str,
    ) -> CallResult<Vec<ConversationSummary>> {
        let path = join_path(&self.factory.endpoints().conversation_list, user_id);
        send_authenticated(&self.factory, credentials, ApiRequest::get(path))
            .await
            .and_then(|response| Ok(response.json::<ConversationList>()?.chats))
    }

    pub async fn conversation_history(
        &self,
        credentials: &Credentials,
        chat_id: &str,
    ) -> CallResult<Conversation> {
        let path = join_path(&self.factory.endpoints().conversation_history, chat_id);
        send_authenticated(&self.factory, credentials, ApiRequest::get(path))
            .await
            .and_then(|response| {
                let history: ConversationHistory = response.json()?;
                Ok(Conversation::from(history))
            })
    }

    pub async fn delete_conversation(
        &self,
        credentials: &Credentials,
        chat_id: &str,
    ) -> CallResult<()> {
        let path = join_path(&self.factory.endpoints().conversation_delete, chat_id);
        send_authenticated(&self.factory, credentials, ApiRequest::delete(path))
            .await
            .and_then(|_| {
                tracing::info!(chat_id = %chat_id, "Conversation deleted");
                Ok(())
            })
    }
}
