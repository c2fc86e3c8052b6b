//! Credential service: password hashing and bearer token signing.
//!
//! Passwords are stored as argon2id PHC strings with a random salt per
//! password. Tokens are HS256 JWTs signed with the configured secret.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the credential service
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Password could not be hashed or the stored hash is unreadable
    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token generation failed: {0}")]
    Generation(String),
}

impl From<argon2::password_hash::Error> for CredentialError {
    fn from(error: argon2::password_hash::Error) -> Self {
        CredentialError::Hashing(error.to_string())
    }
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only an unparseable stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(stored_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Claims embedded in every bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    /// Issued-at timestamp
    pub iat: i64,
    /// Expiry timestamp
    pub exp: i64,
}

/// Issues and validates bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, expiration_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration: Duration::hours(expiration_hours),
        }
    }

    /// Sign a token for the given user, valid for the configured lifetime.
    pub fn issue(
        &self,
        user_id: i32,
        username: &str,
        is_admin: bool,
    ) -> Result<String, CredentialError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            is_admin,
            iat: now.timestamp(),
            exp: (now + self.expiration).timestamp(),
        };
        self.sign(&claims)
    }

    /// Sign arbitrary claims. `issue` is the normal entry point.
    pub fn sign(&self, claims: &Claims) -> Result<String, CredentialError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| CredentialError::Generation(e.to_string()))
    }

    /// Verify signature and expiry and return the decoded claims.
    pub fn validate(&self, token: &str) -> Result<Claims, CredentialError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CredentialError::ExpiredToken,
                ErrorKind::InvalidSignature => CredentialError::InvalidSignature,
                _ => CredentialError::InvalidToken(e.to_string()),
            })?;
        Ok(token_data.claims)
    }

    /// Extract the token from an `Authorization: Bearer <token>` header value.
    /// The scheme is matched without regard to case.
    pub fn extract_from_header(header: &str) -> Option<&str> {
        let (scheme, token) = header.trim_start().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("Bearer") {
            return None;
        }
        Some(token.trim()).filter(|token| !token.is_empty())
    }
}
