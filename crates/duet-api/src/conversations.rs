use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use futures_util::future::try_join_all;
use tracing::{info, warn};

use duet_db::models::{ConversationRecord, fields, from_document, to_document};
use duet_db::{Collection, Filter, SharedStore};
use duet_types::api::{ConversationCreatedResponse, CreateConversationRequest};
use duet_types::models::{Conversation, ConversationSummary};

use crate::auth::{AppState, text};
use crate::directory::UserDirectory;
use crate::error::{ChatError, require};

/// Pairwise conversations. Nothing prevents two conversations for the same
/// pair; each create is a new thread.
#[derive(Clone)]
pub struct ConversationStore {
    store: SharedStore,
    directory: UserDirectory,
}

impl ConversationStore {
    pub fn new(store: SharedStore, directory: UserDirectory) -> Self {
        Self { store, directory }
    }

    /// Returns the new conversation's id. Member ids are not checked against
    /// the user directory.
    pub async fn create(&self, sender_id: &str, receiver_id: &str) -> Result<String, ChatError> {
        require(&[sender_id, receiver_id])?;
        if sender_id == receiver_id {
            return Err(ChatError::Validation(
                "A conversation needs two different members".into(),
            ));
        }

        let doc = to_document(&ConversationRecord {
            id: String::new(),
            members: vec![sender_id.to_string(), receiver_id.to_string()],
        })?;
        let stored =
            duet_db::call(&self.store, move |s| s.insert(Collection::Conversations, doc)).await?;
        let record: ConversationRecord = from_document(stored)?;

        info!(conversation_id = %record.id, "Created conversation");
        Ok(record.id)
    }

    pub async fn find_by_member(&self, user_id: &str) -> Result<Vec<Conversation>, ChatError> {
        let filter = Filter::contains(fields::MEMBERS, user_id);
        let docs =
            duet_db::call(&self.store, move |s| s.find_many(Collection::Conversations, &filter))
                .await?;

        docs.into_iter()
            .map(|doc| -> Result<Conversation, ChatError> {
                Ok(from_document::<ConversationRecord>(doc)?.into())
            })
            .collect()
    }

    /// Every conversation `user_id` belongs to, labelled with the other
    /// member's identity. An unknown user simply has no conversations.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<ConversationSummary>, ChatError> {
        let conversations = self.find_by_member(user_id).await?;

        try_join_all(conversations.into_iter().map(|conversation| async move {
            let Some(other) = conversation.other_member(user_id) else {
                warn!(conversation_id = %conversation.id, "Conversation has no other member");
                return Err(ChatError::integrity(format!(
                    "conversation {} has no other member",
                    conversation.id
                )));
            };
            let user = self.directory.profile(other).await?;
            Ok(ConversationSummary {
                user,
                conversation_id: conversation.id.clone(),
            })
        }))
        .await
    }
}

pub async fn create_conversation(
    State(state): State<AppState>,
    payload: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> Result<Json<ConversationCreatedResponse>, ChatError> {
    let Json(req) = payload?;
    let conversation_id = state
        .conversations
        .create(text(&req.sender_id), text(&req.receiver_id))
        .await?;

    Ok(Json(ConversationCreatedResponse {
        message: "Conversation created successfully".into(),
        conversation_id,
    }))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ConversationSummary>>, ChatError> {
    Ok(Json(state.conversations.list_for_user(&user_id).await?))
}
