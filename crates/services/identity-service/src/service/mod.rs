//! Application services.

mod auth_service;
mod container;
mod delivery;
mod session_token;
mod user_service;
mod verification_service;

pub use auth_service::{AuthService, Authenticator};
pub use container::{Backends, Repositories, ServiceContainer, Services};
pub use delivery::{LogTokenDelivery, TokenDelivery};
pub use session_token::{SessionClaims, SessionTokenCodec, TokenResponse};
pub use user_service::{clamp_pagination, UserManager, UserPage, UserService};
pub use verification_service::{VerificationManager, VerificationService};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
#[cfg(any(test, feature = "test-utils"))]
pub use delivery::MockTokenDelivery;
