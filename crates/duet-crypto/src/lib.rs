/// Duet credential primitives.
///
/// - `password`: salted one-way hashing of user passwords (Argon2id, fixed cost).
/// - `token`: signed, time-bounded identity tokens (HS256 JWT).
///
/// Both are synchronous; the services move hashing onto the blocking pool.
pub mod password;
pub mod token;

pub use password::{CredentialHasher, HashError};
pub use token::{DEFAULT_TOKEN_TTL_SECS, TokenError, TokenIssuer};
