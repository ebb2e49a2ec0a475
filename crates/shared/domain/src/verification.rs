//! Single-use, expiring tokens bound to a user.
//!
//! Email verification and password reset share one shape; the purpose is a
//! type parameter so the two kinds can't be mixed up at call sites.

use chrono::{DateTime, Duration, Utc};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::user_id::UserId;

/// What a token is for.
pub trait TokenPurpose: Send + Sync + 'static {
    /// Short label used in logs
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailVerificationPurpose;

impl TokenPurpose for EmailVerificationPurpose {
    const NAME: &'static str = "email_verification";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordResetPurpose;

impl TokenPurpose for PasswordResetPurpose {
    const NAME: &'static str = "password_reset";
}

/// Token lifecycle is `issued -> consumed | expired`; there is no renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken<P: TokenPurpose> {
    token: String,
    user_id: UserId,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    _purpose: PhantomData<P>,
}

pub type EmailVerification = VerificationToken<EmailVerificationPurpose>;
pub type PasswordReset = VerificationToken<PasswordResetPurpose>;

impl<P: TokenPurpose> VerificationToken<P> {
    /// Mint a fresh random token valid for `ttl`.
    pub fn issue(user_id: UserId, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            created_at,
            expires_at: created_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            _purpose: PhantomData,
        }
    }

    pub fn reconstruct(
        token: String,
        user_id: UserId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            user_id,
            created_at,
            expires_at,
            _purpose: PhantomData,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn purpose(&self) -> &'static str {
        P::NAME
    }
}
