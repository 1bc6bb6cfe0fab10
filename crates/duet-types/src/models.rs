use serde::{Deserialize, Serialize};

/// A user as returned to clients. Never carries the password hash or token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

/// Display identity attached to conversation and message listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user: UserProfile,
    pub user_id: String,
}

/// A two-party thread. Member order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub members: Vec<String>,
}

impl Conversation {
    /// The first member that is not `user_id`.
    pub fn other_member(&self, user_id: &str) -> Option<&str> {
        self.members
            .iter()
            .map(String::as_str)
            .find(|member| *member != user_id)
    }
}

/// One row of a user's conversation list: who the thread is with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user: UserProfile,
    pub conversation_id: String,
}

/// A message enriched with its sender's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub user: UserProfile,
    pub message: String,
}
