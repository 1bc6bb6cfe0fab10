use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{debug, info};

use duet_crypto::{CredentialHasher, TokenIssuer};
use duet_db::SharedStore;
use duet_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, StatusMessage};
use duet_types::models::PublicUser;

use crate::conversations::ConversationStore;
use crate::directory::UserDirectory;
use crate::error::ChatError;
use crate::messages::MessageStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub auth: AuthService,
    pub directory: UserDirectory,
    pub conversations: ConversationStore,
    pub messages: MessageStore,
}

impl AppStateInner {
    /// Wire every service against one store and one token issuer.
    pub fn new(store: SharedStore, tokens: TokenIssuer) -> Result<Self, ChatError> {
        let hasher = Arc::new(CredentialHasher::new()?);
        let directory = UserDirectory::new(store.clone(), hasher);
        let conversations = ConversationStore::new(store.clone(), directory.clone());
        let messages = MessageStore::new(store, conversations.clone(), directory.clone());
        let auth = AuthService::new(directory.clone(), tokens);

        Ok(Self {
            auth,
            directory,
            conversations,
            messages,
        })
    }
}

/// Credential exchange: registration, login and token checks.
#[derive(Clone)]
pub struct AuthService {
    directory: UserDirectory,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(directory: UserDirectory, tokens: TokenIssuer) -> Self {
        Self { directory, tokens }
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<String, ChatError> {
        self.directory
            .register(text(&req.full_name), text(&req.email), text(&req.password))
            .await
    }

    /// Verify credentials, issue a fresh token and record it on the user.
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ChatError> {
        let user = self
            .directory
            .authenticate(text(&req.email), text(&req.password))
            .await?;

        let token = self
            .tokens
            .issue(&user.id, &user.email)
            .map_err(ChatError::TokenSigning)?;

        self.directory.store_token(&user.id, &token).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse {
            user: user.public(),
            token,
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ChatError> {
        self.tokens.verify(token).map_err(|e| {
            debug!("Rejected token: {}", e);
            ChatError::Unauthorized
        })
    }
}

/// Absent fields validate the same as empty ones.
pub(crate) fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<StatusMessage>, ChatError> {
    let Json(req) = payload?;
    state.auth.register(&req).await?;
    Ok(Json(StatusMessage::new("User registered successfully")))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ChatError> {
    let Json(req) = payload?;
    Ok(Json(state.auth.login(&req).await?))
}

/// The caller's own identity, resolved from the token's user id.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<PublicUser>, ChatError> {
    let user = state
        .directory
        .find_by_id(&claims.user_id)
        .await?
        .ok_or(ChatError::Unauthorized)?;
    Ok(Json(user.public()))
}
