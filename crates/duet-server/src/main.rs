mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use duet_api::AppStateInner;
use duet_crypto::TokenIssuer;
use duet_db::{Database, MemoryStore, SharedStore};

use config::{Config, StorageEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "duet=debug,duet_api=debug,duet_db=info,tower_http=debug".into()
            }),
        )
        .init();

    if config.has_placeholder_secret() {
        warn!("JWT_SECRET_KEY is unset or a placeholder. Tokens are signed with a public key.");
        warn!("Set JWT_SECRET_KEY in your .env file before deploying.");
    }

    // Init store
    let (store, db): (SharedStore, Option<Arc<Database>>) = match config.storage {
        StorageEngine::Sqlite => {
            let db = Arc::new(Database::open(&config.db_path)?);
            let store: SharedStore = db.clone();
            (store, Some(db))
        }
        StorageEngine::Memory => {
            info!("Using in-memory store, data is lost on exit");
            let store: SharedStore = Arc::new(MemoryStore::new());
            (store, None)
        }
    };

    let tokens = TokenIssuer::new(config.jwt_secret.clone(), config.token_ttl_secs);
    let state = Arc::new(AppStateInner::new(store, tokens)?);

    let app = duet_api::router(state.clone())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Duet server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Services hold store handles; release them before closing the database.
    drop(state);
    if let Some(db) = db {
        match Arc::try_unwrap(db) {
            Ok(db) => db.close()?,
            Err(_) => warn!("Database still in use at shutdown, skipping close"),
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
