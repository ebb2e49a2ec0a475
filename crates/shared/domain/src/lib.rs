//! Domain layer - identity aggregates, value objects and domain events.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Storage, transport and event delivery live in the service crates.

pub mod constants;
pub mod email;
pub mod error;
pub mod events;
pub mod password;
pub mod role;
pub mod session;
pub mod user;
pub mod user_id;
pub mod username;
pub mod verification;

pub use constants::*;
pub use email::Email;
pub use error::{DomainError, DomainResult};
pub use events::UserEvent;
pub use password::Password;
pub use role::UserRole;
pub use session::{Session, SessionId};
pub use user::{User, UserResponse};
pub use user_id::UserId;
pub use username::Username;
pub use verification::{
    EmailVerification, EmailVerificationPurpose, PasswordReset, PasswordResetPurpose,
    TokenPurpose, VerificationToken,
};
