use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use duet_api::{AppStateInner, router};
use duet_crypto::{DEFAULT_TOKEN_TTL_SECS, TokenIssuer};
use duet_db::{Collection, Filter, MemoryStore, Store};

fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let tokens = TokenIssuer::new("integration-secret", DEFAULT_TOKEN_TTL_SECS);
    let state = Arc::new(AppStateInner::new(store.clone(), tokens).unwrap());
    (router(state), store)
}

fn count(store: &MemoryStore, collection: Collection) -> usize {
    store.find_many(collection, &Filter::All).unwrap().len()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn register(app: &Router, name: &str, email: &str, password: &str) {
    let (status, body) = post(
        app,
        "/api/register",
        json!({"fullName": name, "email": email, "password": password}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

async fn login(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = post(app, "/api/login", json!({"email": email, "password": password})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn register_login_and_duplicate() {
    let (app, store) = app();

    let (status, body) = post(
        &app,
        "/api/register",
        json!({"fullName": "Alice", "email": "a@x.com", "password": "pw1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User registered successfully");

    let session = login(&app, "a@x.com", "pw1").await;
    assert_eq!(session["user"]["fullName"], "Alice");
    assert_eq!(session["user"]["email"], "a@x.com");
    assert!(session["user"]["id"].is_string());
    assert!(session["user"].get("password").is_none());
    assert!(session["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, body) = post(
        &app,
        "/api/register",
        json!({"fullName": "Alice2", "email": "a@x.com", "password": "pw2"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");
    assert_eq!(count(&store, Collection::Users), 1);
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let (app, _) = app();
    register(&app, "Alice", "a@x.com", "pw1").await;

    let wrong_password = post(&app, "/api/login", json!({"email": "a@x.com", "password": "nope"})).await;
    let unknown_email = post(&app, "/api/login", json!({"email": "b@x.com", "password": "pw1"})).await;

    assert_eq!(wrong_password.0, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.1["message"], "User email or password is incorrect");
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let (app, store) = app();

    let (status, body) = post(&app, "/api/register", json!({"email": "a@x.com"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please fill in all required fields");

    let (status, _) = post(&app, "/api/login", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/api/conversations", json!({"senderId": "u1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(count(&store, Collection::Users), 0);
    assert_eq!(count(&store, Collection::Conversations), 0);
}

#[tokio::test]
async fn implicit_conversation_then_reply() {
    let (app, store) = app();
    register(&app, "Alice", "a@x.com", "pw1").await;
    register(&app, "Bob", "b@x.com", "pw2").await;
    let alice = login(&app, "a@x.com", "pw1").await["user"]["id"].clone();
    let bob = login(&app, "b@x.com", "pw2").await["user"]["id"].clone();

    let (status, first) = post(
        &app,
        "/api/message",
        json!({"senderId": alice, "message": "hi", "receiverId": bob}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Message sent successfully");
    assert!(first["messageId"].is_string());
    let conversation_id = first["conversationId"].as_str().unwrap().to_string();
    assert_eq!(count(&store, Collection::Conversations), 1);
    assert_eq!(count(&store, Collection::Messages), 1);

    let (status, reply) = post(
        &app,
        "/api/message",
        json!({"conversationId": conversation_id, "senderId": bob, "body": "hey"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reply.get("conversationId").is_none());
    assert_eq!(count(&store, Collection::Conversations), 1);
    assert_eq!(count(&store, Collection::Messages), 2);

    let (status, thread) = get(&app, &format!("/api/message/{conversation_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        thread,
        json!([
            {"user": {"email": "a@x.com", "fullName": "Alice"}, "message": "hi"},
            {"user": {"email": "b@x.com", "fullName": "Bob"}, "message": "hey"},
        ])
    );

    let (status, listed) = get(&app, &format!("/api/conversations/{}", alice.as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        listed,
        json!([{"user": {"email": "b@x.com", "fullName": "Bob"}, "conversationId": conversation_id}])
    );
}

#[tokio::test]
async fn post_without_target_creates_nothing() {
    let (app, store) = app();
    let (status, body) = post(&app, "/api/message", json!({"senderId": "u1", "message": "hi"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Must supply either a conversation or a receiver");
    assert_eq!(count(&store, Collection::Conversations), 0);
    assert_eq!(count(&store, Collection::Messages), 0);
}

#[tokio::test]
async fn new_conversation_placeholder_is_empty() {
    let (app, _) = app();
    let (status, body) = get(&app, "/api/message/new").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn explicit_conversation_create() {
    let (app, _) = app();
    let (status, body) = post(
        &app,
        "/api/conversations",
        json!({"senderId": "u1", "receiverId": "u2"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Conversation created successfully");
    assert!(body["conversationId"].is_string());

    let (status, _) = post(
        &app,
        "/api/conversations",
        json!({"senderId": "u1", "receiverId": "u1"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn users_listing_hides_credentials() {
    let (app, _) = app();
    register(&app, "Alice", "a@x.com", "pw1").await;
    register(&app, "Bob", "b@x.com", "pw2").await;
    login(&app, "a@x.com", "pw1").await;

    let (status, body) = get(&app, "/api/users").await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    for entry in users {
        assert!(entry["userId"].is_string());
        let user = entry["user"].as_object().unwrap();
        assert_eq!(user.len(), 2);
        assert!(user.contains_key("email") && user.contains_key("fullName"));
    }
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let (app, _) = app();
    register(&app, "Alice", "a@x.com", "pw1").await;
    let session = login(&app, "a@x.com", "pw1").await;
    let token = session["token"].as_str().unwrap();

    let req = Request::get("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, session["user"]);

    let (status, _) = get(&app, "/api/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::get("/api/me")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn welcome_and_health() {
    let (app, _) = app();
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Welcome".into()));

    let (status, body) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn malformed_bodies_get_json_validation_errors() {
    let (app, store) = app();

    let (status, body) = post(
        &app,
        "/api/message",
        json!({"senderId": 5, "message": "hi", "receiverId": "u2"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Request body must be a JSON object with string fields");

    let (status, body) = post(&app, "/api/register", Value::Null).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let req = Request::post("/api/login")
        .body(Body::from(r#"{"email":"a@x.com","password":"pw1"}"#))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let req = Request::post("/api/conversations")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    assert_eq!(count(&store, Collection::Users), 0);
    assert_eq!(count(&store, Collection::Conversations), 0);
    assert_eq!(count(&store, Collection::Messages), 0);
}

#[tokio::test]
async fn blank_conversation_id_is_absent() {
    let (app, store) = app();
    let (status, body) = post(
        &app,
        "/api/message",
        json!({"senderId": "u1", "message": "hi", "conversationId": "   "}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Must supply either a conversation or a receiver");
    assert_eq!(count(&store, Collection::Messages), 0);
}
