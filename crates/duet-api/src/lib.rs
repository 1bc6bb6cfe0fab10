pub mod auth;
pub mod conversations;
pub mod directory;
pub mod error;
pub mod messages;
pub mod middleware;

#[cfg(test)]
mod testing;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use duet_types::api::HealthResponse;

pub use auth::{AppState, AppStateInner};
pub use error::ChatError;

/// All HTTP routes. Only `/api/me` requires a token; the chat routes trust
/// the ids in their payloads.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(welcome))
        .route("/api/health", get(health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/conversations", post(conversations::create_conversation))
        .route("/api/conversations/{user_id}", get(conversations::list_conversations))
        .route("/api/message", post(messages::post_message))
        .route("/api/message/{conversation_id}", get(messages::list_messages))
        .route("/api/users", get(directory::list_users));

    let protected_routes = Router::new()
        .route("/api/me", get(auth::me))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn welcome() -> &'static str {
    "Welcome"
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
