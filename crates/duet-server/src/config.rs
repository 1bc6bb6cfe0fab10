use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use duet_crypto::DEFAULT_TOKEN_TTL_SECS;

/// Signing secret used when `JWT_SECRET_KEY` is unset. Only fit for local
/// development.
pub const FALLBACK_JWT_SECRET: &str = "THIS_IS_A_JWT_SECRET_KEY";

const PLACEHOLDER_SECRETS: &[&str] = &[FALLBACK_JWT_SECRET, "change-me", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngine {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageEngine,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub request_timeout: Duration,
}

impl Config {
    /// Read config from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("DUET_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("DUET_PORT")
            .or_else(|| lookup("PORT"))
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("DUET_PORT must be a port number")?;

        let storage = match lookup("DUET_STORAGE").as_deref() {
            None | Some("sqlite") => StorageEngine::Sqlite,
            Some("memory") => StorageEngine::Memory,
            Some(other) => bail!("Unknown DUET_STORAGE engine: {}", other),
        };
        let db_path: PathBuf = lookup("DUET_DB_PATH").unwrap_or_else(|| "duet.db".into()).into();

        let jwt_secret = lookup("JWT_SECRET_KEY").unwrap_or_else(|| FALLBACK_JWT_SECRET.into());
        let token_ttl_secs = match lookup("DUET_TOKEN_TTL_SECS") {
            Some(v) => v.parse().context("DUET_TOKEN_TTL_SECS must be a number of seconds")?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        let timeout_secs: u64 = match lookup("DUET_REQUEST_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .context("DUET_REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            None => 30,
        };

        Ok(Self {
            host,
            port,
            storage,
            db_path,
            jwt_secret,
            token_ttl_secs,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn has_placeholder_secret(&self) -> bool {
        PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}
