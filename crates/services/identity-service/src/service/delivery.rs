//! Outbound delivery of verification and reset tokens.

use async_trait::async_trait;

use common::AppResult;
use domain::Email;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Hands freshly minted tokens to the user, typically by email.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TokenDelivery: Send + Sync {
    async fn send_email_verification(&self, to: &Email, token: &str) -> AppResult<()>;

    async fn send_password_reset(&self, to: &Email, token: &str) -> AppResult<()>;
}

/// Development delivery: records the send in the log. The token value
/// itself only appears at `debug`.
pub struct LogTokenDelivery;

#[async_trait]
impl TokenDelivery for LogTokenDelivery {
    async fn send_email_verification(&self, to: &Email, token: &str) -> AppResult<()> {
        tracing::info!(domain = to.domain(), "Email verification issued");
        tracing::debug!(to = %to, token, "Email verification token");
        Ok(())
    }

    async fn send_password_reset(&self, to: &Email, token: &str) -> AppResult<()> {
        tracing::info!(domain = to.domain(), "Password reset issued");
        tracing::debug!(to = %to, token, "Password reset token");
        Ok(())
    }
}
