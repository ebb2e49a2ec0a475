//! Redis connection shared by the session store and health checks.
//!
//! Every round-trip goes through [`Cache::run`], which bounds it by the
//! configured storage timeout.

use redis::{aio::ConnectionManager, Client, RedisError};
use std::future::Future;
use std::time::Duration;

use common::{AppError, AppResult, CacheConfig};

/// Key prefix for session records
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Key prefix for the per-user set of session ids
pub const USER_SESSIONS_KEY_PREFIX: &str = "user_sessions:";

/// Redis connection with a per-call timeout.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
    timeout: Duration,
}

impl Cache {
    /// Connect to Redis.
    pub async fn try_connect(config: &CacheConfig) -> Result<Self, RedisError> {
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis connected");

        Ok(Self {
            connection,
            timeout: config.timeout(),
        })
    }

    /// Get the connection manager for direct Redis operations.
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Await a Redis operation, giving up after the storage timeout.
    ///
    /// A timeout becomes [`AppError::ServiceUnavailable`]; Redis failures
    /// become [`AppError::Cache`].
    pub async fn run<T, F>(&self, operation: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result.map_err(cache_error),
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "Redis call timed out");
                Err(AppError::service_unavailable("redis"))
            }
        }
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = self
            .run(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}

pub fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, session_id)
}

pub fn user_sessions_key(user_id: u64) -> String {
    format!("{}{}", USER_SESSIONS_KEY_PREFIX, user_id)
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::Cache(e)
}
