use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use futures_util::future::try_join_all;
use tracing::{debug, warn};

use duet_db::models::{MessageRecord, fields, from_document, to_document};
use duet_db::{Collection, Filter, SharedStore};
use duet_types::api::{PostMessageRequest, PostMessageResponse};
use duet_types::models::ThreadMessage;

use crate::auth::{AppState, text};
use crate::conversations::ConversationStore;
use crate::directory::UserDirectory;
use crate::error::{ChatError, NO_TARGET, require};

/// Placeholder id clients use for a thread that has not been created yet.
pub const NEW_CONVERSATION: &str = "new";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub conversation_id: String,
    pub message_id: String,
    /// True when the post opened the conversation.
    pub created_conversation: bool,
}

#[derive(Clone)]
pub struct MessageStore {
    store: SharedStore,
    conversations: ConversationStore,
    directory: UserDirectory,
}

impl MessageStore {
    pub fn new(
        store: SharedStore,
        conversations: ConversationStore,
        directory: UserDirectory,
    ) -> Self {
        Self {
            store,
            conversations,
            directory,
        }
    }

    /// Append a message. Without a conversation id the message opens a new
    /// conversation with `receiver_id`; with one, `receiver_id` is ignored.
    ///
    /// Implicit creation is two writes. If the message insert fails the
    /// conversation is left behind empty.
    pub async fn post(
        &self,
        conversation_id: Option<&str>,
        sender_id: &str,
        body: &str,
        receiver_id: Option<&str>,
    ) -> Result<PostedMessage, ChatError> {
        require(&[sender_id, body])?;

        let conversation_id = conversation_id.filter(|id| !id.trim().is_empty());
        let receiver_id = receiver_id.filter(|id| !id.trim().is_empty());

        let (conversation_id, created_conversation) = match (conversation_id, receiver_id) {
            (Some(id), _) => (id.to_string(), false),
            (None, Some(receiver)) => (self.conversations.create(sender_id, receiver).await?, true),
            (None, None) => return Err(ChatError::Validation(NO_TARGET.into())),
        };

        let message_id = match self.insert(&conversation_id, sender_id, body).await {
            Ok(id) => id,
            Err(e) => {
                if created_conversation {
                    warn!(
                        conversation_id = %conversation_id,
                        "Message insert failed after creating conversation, leaving it empty"
                    );
                }
                return Err(e);
            }
        };

        debug!(message_id = %message_id, conversation_id = %conversation_id, "Stored message");
        Ok(PostedMessage {
            conversation_id,
            message_id,
            created_conversation,
        })
    }

    /// Messages of one conversation in store order, each with its sender's
    /// identity. The `new` placeholder is always empty.
    pub async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ThreadMessage>, ChatError> {
        if conversation_id == NEW_CONVERSATION {
            return Ok(Vec::new());
        }

        let filter = Filter::eq(fields::CONVERSATION_ID, conversation_id);
        let docs =
            duet_db::call(&self.store, move |s| s.find_many(Collection::Messages, &filter)).await?;
        let records = docs
            .into_iter()
            .map(from_document::<MessageRecord>)
            .collect::<anyhow::Result<Vec<_>>>()?;

        try_join_all(records.into_iter().map(|record| async move {
            let user = self.directory.profile(&record.sender_id).await?;
            Ok::<_, ChatError>(ThreadMessage {
                user,
                message: record.message,
            })
        }))
        .await
    }

    async fn insert(
        &self,
        conversation_id: &str,
        sender_id: &str,
        body: &str,
    ) -> Result<String, ChatError> {
        let doc = to_document(&MessageRecord {
            id: String::new(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            message: body.to_string(),
            created_at: String::new(),
        })?;
        let stored = duet_db::call(&self.store, move |s| s.insert(Collection::Messages, doc)).await?;
        Ok(from_document::<MessageRecord>(stored)?.id)
    }
}

pub async fn post_message(
    State(state): State<AppState>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<Json<PostMessageResponse>, ChatError> {
    let Json(req) = payload?;
    let posted = state
        .messages
        .post(
            req.conversation_id.as_deref(),
            text(&req.sender_id),
            text(&req.message),
            req.receiver_id.as_deref(),
        )
        .await?;

    Ok(Json(PostMessageResponse {
        message: "Message sent successfully".into(),
        message_id: posted.message_id,
        conversation_id: posted.created_conversation.then_some(posted.conversation_id),
    }))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<ThreadMessage>>, ChatError> {
    Ok(Json(state.messages.list_by_conversation(&conversation_id).await?))
}
