//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Default role assigned to new users
pub const ROLE_USER: &str = "user";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "admin";

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement (characters)
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Username length bounds (characters, after trimming)
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;

// =============================================================================
// Lifetimes
// =============================================================================

/// Default session lifetime in seconds
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Email verification tokens stay valid for a day
pub const DEFAULT_EMAIL_VERIFICATION_TTL_SECS: u64 = 24 * 3600;

/// Password reset tokens stay valid for an hour
pub const DEFAULT_PASSWORD_RESET_TTL_SECS: u64 = 3600;

// =============================================================================
// Listing
// =============================================================================

/// Page size used when the caller passes a non-positive limit
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Largest page a single list call may return
pub const MAX_PAGE_LIMIT: u64 = 100;

// =============================================================================
// Authentication
// =============================================================================

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";
