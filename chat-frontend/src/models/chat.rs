use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp::lenient_timestamp;

pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";
pub const GENERIC_CHAT_ERROR: &str = "Sorry, I couldn't process your message. Please try again.";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Map the backend's message roles (`human`, `ai`, `system`).
    pub fn from_role(role: &str) -> Self {
        match role {
            "human" | "user" => Sender::User,
            _ => Sender::Assistant,
        }
    }
}

/// One chat bubble. Messages are append-only; insertion order is display
/// order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub content: String,
    /// `data:` URL of an attached image, when the user uploaded one.
    #[serde(default)]
    pub image: Option<String>,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>, image: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            image,
            sender,
            created_at: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn image_src(&self) -> &str {
        self.image.as_deref().unwrap_or_default()
    }

    pub fn time_label(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
}

/// Sidebar entry from `GET /api/chat/list/{user_id}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConversationSummary {
    #[serde(alias = "_id", alias = "chat_id")]
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: usize,
}

fn default_title() -> String {
    DEFAULT_CONVERSATION_TITLE.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ConversationList {
    #[serde(default)]
    pub chats: Vec<ConversationSummary>,
}

/// Stored message as the backend returns it in a history.
#[derive(Debug, Deserialize)]
pub struct StoredMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `GET /api/chat/history/{chat_id}`.
#[derive(Debug, Deserialize)]
pub struct ConversationHistory {
    pub chat_id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

impl From<ConversationHistory> for Conversation {
    fn from(history: ConversationHistory) -> Self {
        let messages = history
            .messages
            .into_iter()
            .filter(|m| m.role != "system")
            .map(|m| Message {
                id: Uuid::new_v4().to_string(),
                content: m.content,
                image: None,
                sender: Sender::from_role(&m.role),
                created_at: m.timestamp.unwrap_or_else(Utc::now),
            })
            .collect();

        Conversation {
            id: history.chat_id,
            title: history.title,
            messages,
        }
    }
}

/// An uploaded file on its way to the backend.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn data_url(&self) -> String {
        use base64::{engine::general_purpose, Engine as _};
        format!(
            "data:{};base64,{}",
            self.content_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// What the user submits: text, a file, or both.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub text: Option<String>,
    pub attachment: Option<Attachment>,
}

impl Prompt {
    pub fn new(text: Option<String>, attachment: Option<Attachment>) -> Self {
        let text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { text, attachment }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.attachment.is_none()
    }

    /// Text for the user's bubble; an image-only prompt has none.
    pub fn display_text(&self) -> String {
        match (&self.text, &self.attachment) {
            (Some(text), _) => text.clone(),
            (None, Some(file)) => format!("[{}]", file.file_name),
            (None, None) => String::new(),
        }
    }
}

/// The backend's answer, resolved once at the service boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    /// The image classifier recognised something, optionally with a RAG
    /// description of it.
    Prediction {
        label: String,
        probability: Option<f64>,
        description: Option<String>,
    },
    /// A conversational answer.
    RagResponse(String),
    /// Nothing usable came back.
    Error(String),
}

#[derive(Debug, Deserialize, Default)]
struct PromptPayload {
    #[serde(default)]
    prediction: Option<String>,
    #[serde(default)]
    probability: Option<f64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    response_rag: Option<String>,
}

impl ChatReply {
    /// Interpret a `/prompt` body. A `{data: {...}}` envelope is unwrapped.
    pub fn from_prompt_body(body: &serde_json::Value) -> Self {
        let inner = body.get("data").filter(|d| d.is_object()).unwrap_or(body);
        let payload: PromptPayload = serde_json::from_value(inner.clone()).unwrap_or_default();

        match payload {
            PromptPayload {
                prediction: Some(label),
                probability,
                description,
                response_rag,
            } => ChatReply::Prediction {
                label,
                probability,
                description: description.or(response_rag),
            },
            PromptPayload {
                response_rag: Some(text),
                ..
            } => ChatReply::RagResponse(text),
            _ => ChatReply::Error(GENERIC_CHAT_ERROR.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ChatReply::Error(_))
    }

    /// Text for the assistant's bubble.
    pub fn render(&self) -> String {
        match self {
            ChatReply::Prediction {
                label,
                probability,
                description,
            } => {
                let mut text = match probability {
                    Some(p) => format!("Detected: {} ({:.1}% confidence)", label, p * 100.0),
                    None => format!("Detected: {}", label),
                };
                if let Some(description) = description {
                    text.push_str("\n\n");
                    text.push_str(description);
                }
                text
            }
            ChatReply::RagResponse(text) => text.clone(),
            ChatReply::Error(message) => message.clone(),
        }
    }
}

/// `POST /api/chat/message` response.
#[derive(Debug, Deserialize, Clone)]
pub struct ConversationReply {
    pub chat_id: String,
    pub message: String,
    #[serde(default)]
    pub context_used: u32,
    #[serde(default)]
    pub was_summarized: bool,
}
