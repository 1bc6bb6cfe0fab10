use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use duet_types::api::Claims;

/// Token lifetime in seconds. Deliberately 84600 (23.5 hours), not a full day.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 84_600;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Signs and verifies identity tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn issue(&self, user_id: &str, email: &str) -> Result<String, TokenError> {
        issue(user_id, email, &self.secret, self.ttl_secs)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.secret)
    }
}

/// Sign a token for `user_id`/`email` expiring `ttl_secs` from now.
pub fn issue(user_id: &str, email: &str, secret: &str, ttl_secs: u64) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Signing("secret is empty".into()));
    }

    let iat = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        iat,
        exp: iat + ttl_secs as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Check signature and expiry, returning the embedded claims.
pub fn verify(token: &str, secret: &str) -> Result<Claims, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Invalid("secret is empty".into()));
    }

    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| TokenError::Invalid(e.to_string()))
}
