//! API middleware.

mod auth;
mod rate_limit;

pub use auth::{
    admin_middleware, auth_middleware, presented_session_token, require_admin, CurrentUser,
};
pub use rate_limit::{
    client_identifier, rate_limit_middleware, ClientRateLimiter, RateLimitError,
};
