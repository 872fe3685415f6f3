//! Signed session tokens.
//!
//! The calling account is never taken from a client-supplied header value.
//! A caller presents a bearer token issued here, and the account identifier
//! is read from its verified subject.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::error::AppError;
use crate::types::AccountId;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (account identifier).
    pub sub: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

/// Errors that can occur during session token operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Authorization value is missing or not a bearer token.
    #[error("missing bearer token")]
    MissingToken,

    /// Token subject is not a usable account identifier.
    #[error("token subject is empty")]
    EmptySubject,
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EncodingError(msg) => Self::Internal(msg),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

/// Session service for token operations.
#[derive(Clone)]
pub struct SessionService {
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("ttl", &self.ttl)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl SessionService {
    /// Creates a new session service with the given configuration.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let ttl = i64::try_from(config.token_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::days(1));
        Self {
            ttl,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    /// Issues a token identifying `account`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EncodingError` if token generation fails.
    pub fn issue(&self, account: &AccountId) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: account.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SessionError::EncodingError(e.to_string()))
    }

    /// Verifies a token and returns the account it was issued for.
    pub fn verify(&self, token: &str) -> Result<AccountId, SessionError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::DecodingError(e.to_string()),
            })?;

        AccountId::parse(&claims.sub).ok_or(SessionError::EmptySubject)
    }

    /// Resolves the caller from an `Authorization` header value.
    ///
    /// Accepts `Bearer <token>`; anything else is rejected.
    pub fn resolve_caller(&self, authorization: Option<&str>) -> Result<AccountId, AppError> {
        let token = authorization
            .and_then(|value| value.trim().strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(SessionError::MissingToken)?;

        self.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "Rejected session token");
            err.into()
        })
    }
}
