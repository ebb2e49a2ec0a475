//! OpenAPI documentation, served through Swagger UI.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    admin_handler, auth_handler, health_handler, me_handler, password_handler,
    verification_handler, MessageResponse,
};
use crate::service::TokenResponse;
use domain::{UserResponse, UserRole};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Identity Service",
        version = "0.1.0",
        description = "User accounts, sessions, email verification and password reset"
    ),
    paths(
        auth_handler::signup,
        auth_handler::login,
        auth_handler::logout,
        auth_handler::logout_all,
        me_handler::get_me,
        me_handler::change_password,
        verification_handler::request_verification,
        verification_handler::verify_email,
        password_handler::request_reset,
        password_handler::confirm_reset,
        admin_handler::list_users,
        admin_handler::get_user,
        admin_handler::update_user,
        admin_handler::delete_user,
        health_handler::liveness,
        health_handler::readiness,
    ),
    components(
        schemas(
            UserRole,
            UserResponse,
            TokenResponse,
            MessageResponse,
            auth_handler::SignupRequest,
            auth_handler::LoginRequest,
            auth_handler::LoginResponse,
            auth_handler::LogoutAllResponse,
            me_handler::ChangePasswordRequest,
            password_handler::PasswordResetRequest,
            password_handler::PasswordResetConfirm,
            admin_handler::UserListResponse,
            admin_handler::UpdateUserRequest,
            health_handler::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Signup, login and logout"),
        (name = "Me", description = "The authenticated caller"),
        (name = "Verification", description = "Email verification"),
        (name = "Password", description = "Password reset"),
        (name = "Admin", description = "User management"),
        (name = "Health", description = "Probes")
    )
)]
pub struct ApiDoc;

/// Registers the two ways a session can be presented
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /auth/login"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("session_id"))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/signup",
            "/auth/login",
            "/auth/logout",
            "/auth/logout-all",
            "/me",
            "/me/password",
            "/verification/request",
            "/verification/verify",
            "/password/reset/request",
            "/password/reset/confirm",
            "/admin/users",
            "/admin/users/{id}",
            "/health/live",
            "/health/ready",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
