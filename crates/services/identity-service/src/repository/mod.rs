//! Repository layer for data access.
//!
//! Each contract has a Postgres (sea-orm) implementation and an in-memory
//! one; sessions additionally have a Redis implementation.

pub mod entities;
mod memory;
mod session_repository;
mod user_repository;
mod verification_repository;

pub use memory::{
    InMemoryEmailVerificationStore, InMemoryPasswordResetStore, InMemorySessionStore,
    InMemoryUserStore,
};
pub use session_repository::{RedisSessionStore, SessionRepository, SqlSessionStore};
pub use user_repository::{UserRepository, UserStore};
pub use verification_repository::{
    EmailVerificationRepository, PasswordResetRepository, SqlEmailVerificationStore,
    SqlPasswordResetStore,
};

#[cfg(any(test, feature = "test-utils"))]
pub use session_repository::MockSessionRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use verification_repository::{MockEmailVerificationRepository, MockPasswordResetRepository};

use common::AppError;
use domain::DomainError;

/// A stored row that no longer parses into its domain type.
pub(crate) fn corrupt_record(entity: &str, err: DomainError) -> AppError {
    tracing::error!(entity, error = %err, "Stored record failed validation");
    AppError::internal(format!("corrupt {} record: {}", entity, err))
}
