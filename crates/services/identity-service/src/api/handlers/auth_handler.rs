//! Signup, login and logout handlers.

use axum::{
    extract::{Extension, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use common::AppResult;
use domain::UserResponse;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{presented_session_token, CurrentUser};
use crate::api::session_cookie::{expired_session_cookie, session_cookie};
use crate::api::AppState;
use crate::service::TokenResponse;

/// Signup request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 3, max = 254, message = "Invalid email address"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "password123", min_length = 8)]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Login response; the same session is also set as a cookie
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: TokenResponse,
}

/// Sessions ended by logout-all
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutAllResponse {
    pub revoked: u64,
}

/// Routes needing no session
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Routes that must sit behind the auth middleware
pub fn auth_session_routes() -> Router<AppState> {
    Router::new().route("/logout-all", post(logout_all))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "Authentication",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .users()
        .register_user(&payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Open a session
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened; cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let (session, user) = state.auth().login(&payload.email, &payload.password).await?;
    let token = state.services.tokens().issue(&session)?;
    let cookie = session_cookie(&state.session, session.id().as_str(), token.expires_in);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            user: UserResponse::from(user),
            token,
        }),
    ))
}

/// End the presented session. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    responses((status = 204, description = "Logged out; cookie cleared"))
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    match presented_session_token(&headers, &state) {
        Ok(Some(token)) => state.auth().logout(&token).await?,
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %e, "Logout with unreadable credentials"),
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, expired_session_cookie(&state.session))],
    ))
}

/// End every session of the caller
#[utoipa::path(
    post,
    path = "/auth/logout-all",
    tag = "Authentication",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    responses(
        (status = 200, description = "All sessions ended", body = LogoutAllResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let revoked = state.auth().logout_all(current_user.id).await?;

    Ok((
        [(SET_COOKIE, expired_session_cookie(&state.session))],
        Json(LogoutAllResponse { revoked }),
    ))
}
