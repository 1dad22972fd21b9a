pub mod chat;
pub mod timestamp;
pub mod user;

pub use chat::{
    Attachment, ChatReply, Conversation, ConversationReply, ConversationSummary, Message, Prompt,
    Sender,
};
pub use user::{User, UserId};
