//! Signed bearer tokens carrying a session id.
//!
//! The JWT only wraps the opaque session id; the session store stays the
//! authority, so revoking a session revokes every token minted for it.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use common::{AppError, AppResult};
use domain::{Session, SessionId, TOKEN_TYPE_BEARER};

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: u64,
    /// Session id
    pub sid: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful login
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    /// Signed session token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Seconds until the session expires
    pub expires_in: i64,
}

/// HS256 encoder/decoder for session tokens.
pub struct SessionTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionTokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Mint a token that expires with the session.
    pub fn issue(&self, session: &Session) -> AppResult<TokenResponse> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: session.user_id().value(),
            sid: session.id().as_str().to_string(),
            exp: session.expires_at().timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;

        Ok(TokenResponse {
            access_token: token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: remaining_secs(session, now),
        })
    }

    /// Verify signature and expiry, returning the embedded session id.
    ///
    /// Every failure is reported as [`AppError::InvalidSession`].
    pub fn session_id(&self, token: &str) -> AppResult<SessionId> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            AppError::InvalidSession
        })?;

        SessionId::new(data.claims.sid).map_err(|_| AppError::InvalidSession)
    }
}

/// Whole seconds left on the session, rounded up so a fresh session
/// reports its full TTL.
fn remaining_secs(session: &Session, now: DateTime<Utc>) -> i64 {
    let millis = (session.expires_at() - now).num_milliseconds().max(0);
    (millis + 999) / 1000
}
