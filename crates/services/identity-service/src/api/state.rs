//! Application state shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use common::SessionConfig;

use super::middleware::ClientRateLimiter;
use crate::config::IdentityServiceConfig;
use crate::service::{AuthService, ServiceContainer, UserService, VerificationService};

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<dyn ServiceContainer>,
    /// Cookie name and attributes
    pub session: Arc<SessionConfig>,
    pub rate_limiter: Arc<ClientRateLimiter>,
    /// Upper bound for readiness probes
    pub storage_timeout: Duration,
}

impl AppState {
    pub fn new(services: Arc<dyn ServiceContainer>, config: &IdentityServiceConfig) -> Self {
        Self {
            services,
            session: Arc::new(config.session.clone()),
            rate_limiter: Arc::new(ClientRateLimiter::new(&config.rate_limit)),
            storage_timeout: config.storage_timeout(),
        }
    }

    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.services.auth()
    }

    pub fn users(&self) -> Arc<dyn UserService> {
        self.services.users()
    }

    pub fn verification(&self) -> Arc<dyn VerificationService> {
        self.services.verification()
    }
}
