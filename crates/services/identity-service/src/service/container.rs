//! Service container - wires repositories into services.
//!
//! `Services::connect` builds the Postgres/Redis stack, `Services::in_memory`
//! builds a self-contained one for tests and `serve --ephemeral`.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppResult, SessionBackend};

use super::{
    AuthService, Authenticator, LogTokenDelivery, SessionTokenCodec, TokenDelivery, UserManager,
    UserService, VerificationManager, VerificationService,
};
use crate::config::IdentityServiceConfig;
use crate::events::{EventHandler, InProcessEventBus, LoggingEventHandler};
use crate::infra::{Cache, Database};
use crate::repository::{
    EmailVerificationRepository, InMemoryEmailVerificationStore, InMemoryPasswordResetStore,
    InMemorySessionStore, InMemoryUserStore, PasswordResetRepository, RedisSessionStore,
    SessionRepository, SqlEmailVerificationStore, SqlPasswordResetStore, SqlSessionStore,
    UserRepository, UserStore,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn verification(&self) -> Arc<dyn VerificationService>;

    /// Codec for the signed bearer form of a session id
    fn tokens(&self) -> Arc<SessionTokenCodec>;

    /// Ok when every backing store answers
    async fn ready(&self) -> AppResult<()>;
}

/// External stores the services depend on, for readiness probes.
#[derive(Clone, Default)]
pub struct Backends {
    pub database: Option<Database>,
    pub cache: Option<Cache>,
}

impl Backends {
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(db) = &self.database {
            db.ping().await?;
        }
        if let Some(cache) = &self.cache {
            cache.ping().await?;
        }
        Ok(())
    }
}

/// Storage a [`Services`] instance is assembled from.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub email_verifications: Arc<dyn EmailVerificationRepository>,
    pub password_resets: Arc<dyn PasswordResetRepository>,
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    user_service: Arc<dyn UserService>,
    verification_service: Arc<dyn VerificationService>,
    tokens: Arc<SessionTokenCodec>,
    events: Arc<InProcessEventBus>,
    backends: Backends,
}

impl Services {
    /// Assemble services over already-built repositories
    pub fn from_repositories(
        repos: Repositories,
        delivery: Arc<dyn TokenDelivery>,
        events: Arc<InProcessEventBus>,
        backends: Backends,
        config: &IdentityServiceConfig,
    ) -> Self {
        let auth_service = Arc::new(Authenticator::new(
            repos.users.clone(),
            repos.sessions.clone(),
            config.session.ttl_secs,
            config.storage_timeout(),
        ));
        let user_service = Arc::new(UserManager::new(
            repos.users.clone(),
            repos.sessions.clone(),
        ));
        let verification_service = Arc::new(VerificationManager::new(
            repos.users,
            repos.email_verifications,
            repos.password_resets,
            delivery,
            &config.verification,
        ));

        Self {
            auth_service,
            user_service,
            verification_service,
            tokens: Arc::new(SessionTokenCodec::new(config.jwt_secret_bytes())),
            events,
            backends,
        }
    }

    /// Services backed by process memory only. Nothing survives a restart.
    pub fn in_memory(config: &IdentityServiceConfig) -> Self {
        let events = Arc::new(default_event_bus());
        let repos = Repositories {
            users: Arc::new(InMemoryUserStore::new(events.clone())),
            sessions: Arc::new(InMemorySessionStore::new()),
            email_verifications: Arc::new(InMemoryEmailVerificationStore::new()),
            password_resets: Arc::new(InMemoryPasswordResetStore::new()),
        };

        Self::from_repositories(
            repos,
            Arc::new(LogTokenDelivery),
            events,
            Backends::default(),
            config,
        )
    }

    /// Connect to Postgres (running pending migrations) and, for the Redis
    /// session backend, to Redis.
    pub async fn connect(config: &IdentityServiceConfig) -> AppResult<Self> {
        let database = Database::connect(&config.database).await?;
        let db = database.get_connection();
        let events = Arc::new(default_event_bus());

        let (sessions, cache): (Arc<dyn SessionRepository>, _) = match config.session.backend {
            SessionBackend::Redis => {
                let cache = Cache::try_connect(&config.cache).await?;
                (Arc::new(RedisSessionStore::new(cache.clone())), Some(cache))
            }
            SessionBackend::Database => (Arc::new(SqlSessionStore::new(db.clone())), None),
        };
        tracing::info!(backend = ?config.session.backend, "Session store ready");

        let repos = Repositories {
            users: Arc::new(UserStore::new(db.clone(), events.clone())),
            sessions,
            email_verifications: Arc::new(SqlEmailVerificationStore::new(db.clone())),
            password_resets: Arc::new(SqlPasswordResetStore::new(db)),
        };

        Ok(Self::from_repositories(
            repos,
            Arc::new(LogTokenDelivery),
            events,
            Backends {
                database: Some(database),
                cache,
            },
            config,
        ))
    }

    /// Bus the user repositories publish to; subscribe extra handlers here.
    pub fn events(&self) -> Arc<InProcessEventBus> {
        self.events.clone()
    }
}

fn default_event_bus() -> InProcessEventBus {
    let handlers: Vec<Arc<dyn EventHandler>> = vec![Arc::new(LoggingEventHandler)];
    InProcessEventBus::with_handlers(handlers)
}

#[async_trait]
impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn verification(&self) -> Arc<dyn VerificationService> {
        self.verification_service.clone()
    }

    fn tokens(&self) -> Arc<SessionTokenCodec> {
        self.tokens.clone()
    }

    async fn ready(&self) -> AppResult<()> {
        self.backends.ping().await
    }
}
