//! Document and record types for the store.
//!
//! Records are the typed shape of each collection's documents. They are kept
//! separate from the duet-types API models so the storage layer can carry
//! fields (password hash, token) that never leave the server.

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use duet_types::models::{Conversation, PublicUser, UserProfile};

/// A schemaless JSON object as held by the store.
pub type Document = Map<String, Value>;

pub const ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";

/// Field names used in filters and patches.
pub mod fields {
    pub const EMAIL: &str = "email";
    pub const TOKEN: &str = "token";
    pub const MEMBERS: &str = "members";
    pub const CONVERSATION_ID: &str = "conversationId";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Conversations,
    Messages,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Conversations => "conversations",
            Self::Messages => "messages",
        }
    }
}

/// Query predicate understood by every store engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Id(String),
    /// Top-level string field equals the value.
    Eq(&'static str, String),
    /// Top-level array field contains the value.
    Contains(&'static str, String),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<String>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn contains(field: &'static str, value: impl Into<String>) -> Self {
        Self::Contains(field, value.into())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Id(id) => doc.get(ID).and_then(Value::as_str) == Some(id.as_str()),
            Self::Eq(field, value) => doc.get(*field).and_then(Value::as_str) == Some(value.as_str()),
            Self::Contains(field, value) => doc
                .get(*field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|item| item.as_str() == Some(value.as_str()))),
        }
    }
}

/// Assign the store-owned fields of a freshly inserted document.
pub fn stamp(mut doc: Document) -> Document {
    doc.insert(ID.into(), Value::String(uuid::Uuid::new_v4().to_string()));
    doc.insert(
        CREATED_AT.into(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    doc
}

/// Drop store-owned keys from a patch so updates can never rewrite them.
pub fn sanitize_patch(mut patch: Document) -> Document {
    patch.remove(ID);
    patch.remove(CREATED_AT);
    patch
}

/// Apply a merge patch in place: `null` removes a key, anything else replaces it.
pub fn merge(doc: &mut Document, patch: Document) {
    for (key, value) in patch {
        if value.is_null() {
            doc.remove(&key);
        } else {
            doc.insert(key, value);
        }
    }
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("Expected a JSON object, got {}", other)),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

// -- Records --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub full_name: String,
    pub email: String,
    /// Password hash, never the plaintext.
    pub password: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub members: Vec<String>,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            members: record.members,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
}
