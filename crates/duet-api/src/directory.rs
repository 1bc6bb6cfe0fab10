use std::sync::Arc;

use axum::{Json, extract::State};
use serde_json::Value;
use tracing::{info, warn};

use duet_crypto::{CredentialHasher, HashError};
use duet_db::models::{UserRecord, fields, from_document, to_document};
use duet_db::{Collection, Document, Filter, SharedStore};
use duet_types::models::{UserProfile, UserSummary};

use crate::auth::AppState;
use crate::error::{ChatError, USER_EXISTS, require};

/// Owns user records: registration, credential checks and lookups.
#[derive(Clone)]
pub struct UserDirectory {
    store: SharedStore,
    hasher: Arc<CredentialHasher>,
}

impl UserDirectory {
    pub fn new(store: SharedStore, hasher: Arc<CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    /// Returns the new user's id.
    ///
    /// The email check and the insert are separate store calls, so two
    /// concurrent registrations for one email can both succeed.
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, ChatError> {
        require(&[full_name, email, password])?;

        if self.find_by_email(email).await?.is_some() {
            return Err(ChatError::Conflict(USER_EXISTS.into()));
        }

        let password = self.hash(password).await?;
        let doc = to_document(&UserRecord {
            id: String::new(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            password,
            token: None,
        })?;

        let stored = duet_db::call(&self.store, move |s| s.insert(Collection::Users, doc)).await?;
        let user: UserRecord = from_document(stored)?;

        info!(user_id = %user.id, "Registered user");
        Ok(user.id)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, ChatError> {
        require(&[email, password])?;

        let user = self
            .find_by_email(email)
            .await?
            .ok_or(ChatError::InvalidCredentials)?;

        if !self.verify(password, &user.password).await? {
            return Err(ChatError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Every user with credentials projected out, in store order.
    pub async fn list_all(&self) -> Result<Vec<UserSummary>, ChatError> {
        let docs =
            duet_db::call(&self.store, |s| s.find_many(Collection::Users, &Filter::All)).await?;

        docs.into_iter()
            .map(|doc| -> Result<UserSummary, ChatError> {
                let user: UserRecord = from_document(doc)?;
                Ok(UserSummary {
                    user: user.profile(),
                    user_id: user.id,
                })
            })
            .collect()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ChatError> {
        let filter = Filter::eq(fields::EMAIL, email);
        self.find_one(filter).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, ChatError> {
        self.find_one(Filter::Id(id.to_string())).await
    }

    /// Display identity for a referenced user. A dangling reference is an
    /// integrity fault, not an empty result.
    pub async fn profile(&self, id: &str) -> Result<UserProfile, ChatError> {
        match self.find_by_id(id).await? {
            Some(user) => Ok(user.profile()),
            None => {
                warn!(user_id = %id, "Referenced user does not exist");
                Err(ChatError::integrity(format!("user {} not found", id)))
            }
        }
    }

    /// Replace the stored token. Last writer wins.
    pub async fn store_token(&self, id: &str, token: &str) -> Result<(), ChatError> {
        let mut patch = Document::new();
        patch.insert(fields::TOKEN.into(), Value::String(token.to_string()));
        let target = id.to_string();
        let updated = duet_db::call(&self.store, move |s| {
            s.update_fields(Collection::Users, &target, patch)
        })
        .await?;

        if !updated {
            return Err(ChatError::integrity(format!("user {} vanished during login", id)));
        }
        Ok(())
    }

    async fn find_one(&self, filter: Filter) -> Result<Option<UserRecord>, ChatError> {
        let doc = duet_db::call(&self.store, move |s| s.find_one(Collection::Users, &filter)).await?;
        Ok(doc.map(from_document::<UserRecord>).transpose()?)
    }

    async fn hash(&self, password: &str) -> Result<String, ChatError> {
        let hasher = Arc::clone(&self.hasher);
        let plaintext = password.to_string();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| HashError::Hashing(format!("hashing task failed: {}", e)))??;
        Ok(digest)
    }

    async fn verify(&self, password: &str, digest: &str) -> Result<bool, ChatError> {
        let hasher = Arc::clone(&self.hasher);
        let plaintext = password.to_string();
        let digest = digest.to_string();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| HashError::Hashing(format!("verify task failed: {}", e)))??;
        Ok(valid)
    }
}

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, ChatError> {
    Ok(Json(state.directory.list_all().await?))
}
