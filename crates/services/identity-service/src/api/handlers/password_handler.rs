//! Password reset handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use common::AppResult;

use super::MessageResponse;
use crate::api::extractors::ValidatedJson;
use crate::api::AppState;

/// Same body whether or not the account exists
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an active account exists for that address, a reset link has been sent";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetConfirm {
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(min_length = 8)]
    pub new_password: String,
}

pub fn password_routes() -> Router<AppState> {
    Router::new()
        .route("/reset/request", post(request_reset))
        .route("/reset/confirm", post(confirm_reset))
}

/// Start a password reset
#[utoipa::path(
    post,
    path = "/password/reset/request",
    tag = "Password",
    request_body = PasswordResetRequest,
    responses((status = 202, description = "Accepted", body = MessageResponse))
)]
pub async fn request_reset(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PasswordResetRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state
        .verification()
        .request_password_reset(&payload.email)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)),
    ))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/password/reset/confirm",
    tag = "Password",
    request_body = PasswordResetConfirm,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn confirm_reset(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PasswordResetConfirm>,
) -> AppResult<Json<MessageResponse>> {
    state
        .verification()
        .reset_password(&payload.token, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password has been reset")))
}
