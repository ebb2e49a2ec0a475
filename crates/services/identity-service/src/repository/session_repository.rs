//! Session repository contract with Redis and Postgres implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};

use super::corrupt_record;
use super::entities::session::{self, Entity as SessionEntity};
use crate::infra::{session_key, user_sessions_key, Cache};
use common::{AppError, AppResult};
use domain::{Session, SessionId, UserId};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Session repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a session; fails if it is already expired
    async fn save(&self, session: &Session) -> AppResult<()>;

    /// Never returns an expired session
    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>>;

    /// Remove one session; absent ids are fine
    async fn delete(&self, id: &SessionId) -> AppResult<()>;

    /// Purge expired sessions, returning how many went
    async fn delete_expired(&self) -> AppResult<u64>;

    /// Remove every session belonging to the user, returning how many went
    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64>;
}

fn expired_on_save(session: &Session) -> AppError {
    tracing::warn!(user_id = %session.user_id(), "Refusing to store an expired session");
    AppError::internal("session already expired")
}

// =============================================================================
// Redis
// =============================================================================

/// Writes the session, indexes it under its user and stretches the index
/// TTL so it outlives its longest-lived member.
///
/// KEYS[1] session key, KEYS[2] user index key
/// ARGV[1] payload, ARGV[2] ttl seconds, ARGV[3] session id
const SAVE_SESSION_SCRIPT: &str = r#"
redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
redis.call('SADD', KEYS[2], ARGV[3])
local ttl = tonumber(ARGV[2])
if redis.call('TTL', KEYS[2]) < ttl then
    redis.call('EXPIRE', KEYS[2], ttl)
end
return 1
"#;

/// Stored under `session:{id}`
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    user_id: u64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Redis-backed sessions.
///
/// Expiry is enforced by key TTLs. A per-user set `user_sessions:{id}`
/// lets [`SessionRepository::delete_by_user_id`] avoid scanning the
/// keyspace. Index members may outlive their session key; they are
/// harmless and dropped with the index.
pub struct RedisSessionStore {
    cache: Cache,
}

impl RedisSessionStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    async fn load(&self, id: &SessionId) -> AppResult<Option<SessionRecord>> {
        let mut conn = self.cache.connection();
        let raw: Option<String> = self
            .cache
            .run(redis::cmd("GET").arg(session_key(id.as_str())).query_async(&mut conn))
            .await?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| {
                AppError::internal(format!("Session deserialization error: {}", e))
            })
        })
        .transpose()
    }
}

#[async_trait]
impl SessionRepository for RedisSessionStore {
    async fn save(&self, session: &Session) -> AppResult<()> {
        let ttl = session
            .remaining_ttl()
            .ok_or_else(|| expired_on_save(session))?;
        // Round up so the key never dies before expires_at
        let ttl_secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);

        let record = SessionRecord {
            user_id: session.user_id().value(),
            created_at: session.created_at(),
            expires_at: session.expires_at(),
        };
        let payload = serde_json::to_string(&record)
            .map_err(|e| AppError::internal(format!("Session serialization error: {}", e)))?;

        let mut conn = self.cache.connection();
        let _: i64 = self
            .cache
            .run(
                redis::cmd("EVAL")
                    .arg(SAVE_SESSION_SCRIPT)
                    .arg(2)
                    .arg(session_key(session.id().as_str()))
                    .arg(user_sessions_key(session.user_id().value()))
                    .arg(payload)
                    .arg(ttl_secs)
                    .arg(session.id().as_str())
                    .query_async(&mut conn),
            )
            .await?;

        tracing::debug!(user_id = %session.user_id(), ttl_secs, "Session stored");
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>> {
        let Some(record) = self.load(id).await? else {
            return Ok(None);
        };

        let user_id = UserId::new(record.user_id).map_err(|e| corrupt_record("session", e))?;
        let session =
            Session::reconstruct(id.clone(), user_id, record.created_at, record.expires_at);

        // Key TTL should have evicted it already; don't trust that alone
        if session.is_expired() {
            if let Err(e) = self.delete(id).await {
                tracing::debug!(error = %e, "Failed to drop stale session key");
            }
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn delete(&self, id: &SessionId) -> AppResult<()> {
        let record = self.load(id).await?;

        let mut pipe = redis::pipe();
        pipe.atomic().del(session_key(id.as_str())).ignore();
        if let Some(record) = record {
            pipe.srem(user_sessions_key(record.user_id), id.as_str()).ignore();
        }

        let mut conn = self.cache.connection();
        let _: () = self.cache.run(pipe.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn delete_expired(&self) -> AppResult<u64> {
        // Key TTLs already do this
        Ok(0)
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        let index = user_sessions_key(user_id.value());
        let mut conn = self.cache.connection();

        let members: Vec<String> = self
            .cache
            .run(redis::cmd("SMEMBERS").arg(&index).query_async(&mut conn))
            .await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        if !members.is_empty() {
            let keys: Vec<String> = members.iter().map(|id| session_key(id)).collect();
            pipe.del(keys);
        }
        pipe.del(&index).ignore();

        let removed: Vec<u64> = self.cache.run(pipe.query_async(&mut conn)).await?;
        let removed = removed.first().copied().unwrap_or(0);

        tracing::info!(user_id = %user_id, removed, "Sessions revoked");
        Ok(removed)
    }
}

// =============================================================================
// Postgres
// =============================================================================

/// Postgres-backed sessions, for deployments without Redis.
pub struct SqlSessionStore {
    db: DatabaseConnection,
}

impl SqlSessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepository for SqlSessionStore {
    async fn save(&self, session: &Session) -> AppResult<()> {
        if session.is_expired() {
            return Err(expired_on_save(session));
        }

        session::ActiveModel {
            id: Set(session.id().as_str().to_string()),
            user_id: Set(session.user_id().value() as i64),
            created_at: Set(session.created_at()),
            expires_at: Set(session.expires_at()),
        }
        .insert(&self.db)
        .await
        .map_err(AppError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>> {
        let model = SessionEntity::find_by_id(id.as_str().to_string())
            .filter(session::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        model
            .map(|m| Session::try_from(m).map_err(|e| corrupt_record("session", e)))
            .transpose()
    }

    async fn delete(&self, id: &SessionId) -> AppResult<()> {
        SessionEntity::delete_by_id(id.as_str().to_string())
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn delete_expired(&self) -> AppResult<u64> {
        let result = SessionEntity::delete_many()
            .filter(session::Column::ExpiresAt.lte(Utc::now()))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected)
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        let result = SessionEntity::delete_many()
            .filter(session::Column::UserId.eq(user_id.value() as i64))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected)
    }
}
