//! Session tokens.
//!
//! Issues and resolves the HS256 bearer tokens that carry a user id.
//!
//! ## Claims
//! ```text
//! {
//!   "user_id": 42,          ← the only claim the ledger reads
//!   "iat": 1760000000,
//!   "jti": "6f1c...",
//!   "exp": 1760003600       ← present only when a TTL is configured
//! }
//! ```

use std::collections::HashSet;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use coinshop_core::UserId;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Ledger user id
    pub user_id: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Expiration (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Signs and verifies session tokens with one shared secret.
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: Option<i64>,
}

impl SessionIssuer {
    /// Creates an issuer. With `ttl_secs = None` tokens never expire.
    pub fn new(secret: &str, ttl_secs: Option<i64>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if ttl_secs.is_none() {
            validation.validate_exp = false;
            validation.required_spec_claims = HashSet::new();
        }

        SessionIssuer {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Issues a token asserting `user_id`.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now();

        let claims = Claims {
            user_id: user_id.get(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            exp: self
                .ttl_secs
                .map(|ttl| (now + Duration::seconds(ttl)).timestamp()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verifies `token` and returns the user id it asserts.
    ///
    /// Bad signature, malformed token, expired token and a missing or
    /// non-integer `user_id` all give `InvalidToken`.
    pub fn resolve(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(UserId::new(data.claims.user_id))
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// The `Bearer ` prefix is optional. Returns `None` for an empty token.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .unwrap_or(auth_header)
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
