//! Identity service configuration.

use std::env;
use std::str::FromStr;

use common::{
    AppError, AppResult, CacheConfig, DatabaseConfig, JwtConfig, RateLimitConfig, ServiceConfig,
    SessionBackend, SessionConfig, VerificationConfig,
};
use domain::MIN_JWT_SECRET_LENGTH;

/// Identity service configuration.
#[derive(Debug, Clone, Default)]
pub struct IdentityServiceConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub session: SessionConfig,
    pub verification: VerificationConfig,
}

impl IdentityServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails if `JWT_SECRET` is missing or shorter than 32 bytes, or if
    /// `SESSION_BACKEND` names an unknown backend.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let storage_timeout_ms = parse_or("STORAGE_TIMEOUT_MS", 2000);

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::validation("JWT_SECRET must be set"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        let backend = match env::var("SESSION_BACKEND") {
            Ok(raw) => SessionBackend::from_str(&raw).map_err(AppError::validation)?,
            Err(_) => SessionBackend::default(),
        };

        Ok(Self {
            service: ServiceConfig {
                host: env::var("HOST").unwrap_or(defaults.service.host),
                port: parse_or("PORT", defaults.service.port),
                ..defaults.service
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_or("DB_MAX_CONNECTIONS", defaults.database.max_connections),
                min_connections: parse_or("DB_MIN_CONNECTIONS", defaults.database.min_connections),
                timeout_ms: storage_timeout_ms,
            },
            cache: CacheConfig {
                url: env::var("REDIS_URL").unwrap_or(defaults.cache.url),
                timeout_ms: storage_timeout_ms,
            },
            jwt: JwtConfig { secret: jwt_secret },
            rate_limit: RateLimitConfig {
                requests_per_second: parse_or(
                    "RATE_LIMIT_RPS",
                    defaults.rate_limit.requests_per_second,
                ),
                burst: parse_or("RATE_LIMIT_BURST", defaults.rate_limit.burst),
            },
            session: SessionConfig {
                ttl_secs: parse_or("SESSION_EXPIRY_SECS", defaults.session.ttl_secs),
                backend,
                cookie_name: env::var("SESSION_COOKIE_NAME")
                    .unwrap_or(defaults.session.cookie_name),
                cookie_secure: env::var("SESSION_COOKIE_SECURE")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(defaults.session.cookie_secure),
            },
            verification: VerificationConfig {
                email_verification_ttl_secs: parse_or(
                    "EMAIL_VERIFICATION_TTL_SECS",
                    defaults.verification.email_verification_ttl_secs,
                ),
                password_reset_ttl_secs: parse_or(
                    "PASSWORD_RESET_TTL_SECS",
                    defaults.verification.password_reset_ttl_secs,
                ),
            },
        })
    }

    /// Config for in-process runs with no external storage
    pub fn ephemeral(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt: JwtConfig {
                secret: jwt_secret.into(),
            },
            ..Self::default()
        }
    }

    /// Get JWT secret as bytes.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt.secret.as_bytes()
    }

    /// Upper bound for a single storage round-trip.
    pub fn storage_timeout(&self) -> std::time::Duration {
        self.database.timeout().max(self.cache.timeout())
    }
}

/// Parse an env var, falling back to `default` when unset or malformed.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back() {
        assert_eq!(parse_or("IDENTITY_TEST_SURELY_UNSET_VAR", 42u16), 42);
    }

    #[test]
    fn test_ephemeral_uses_defaults() {
        let config = IdentityServiceConfig::ephemeral("x".repeat(32));
        assert_eq!(config.session.ttl_secs, 3600);
        assert_eq!(config.jwt_secret_bytes().len(), 32);
        assert_eq!(config.service.port, 8080);
    }
}
