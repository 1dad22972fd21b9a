use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::timestamp::lenient_timestamp;

/// Backend user ids are integers in some deployments and Mongo ObjectIds
/// in others.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{}", id),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

/// The current user as returned by `GET /user/me`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    #[serde(default, alias = "_id")]
    pub id: Option<UserId>,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Key used for the user's conversations on the backend. Falls back to
    /// the email when the backend does not expose an id.
    pub fn conversation_owner(&self) -> String {
        self.id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| self.email.clone())
    }

    pub fn name(&self) -> String {
        match self.username.as_deref() {
            Some(username) if !username.trim().is_empty() => username.to_string(),
            _ => self.email.split('@').next().unwrap_or("User").to_string(),
        }
    }

    pub fn initials(&self) -> String {
        let initials: String = self.name().chars().take(2).collect();
        if initials.is_empty() {
            "U".to_string()
        } else {
            initials.to_uppercase()
        }
    }

    pub fn member_since(&self) -> String {
        self.created_at
            .map(|t| t.format("%B %-d, %Y").to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
