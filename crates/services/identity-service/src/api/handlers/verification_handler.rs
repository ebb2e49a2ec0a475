//! Email verification handlers.

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use common::AppResult;

use super::MessageResponse;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    /// Token from the verification email
    pub token: String,
}

/// Routes needing no session
pub fn verification_routes() -> Router<AppState> {
    Router::new().route("/verify", get(verify_email))
}

/// Routes that must sit behind the auth middleware
pub fn verification_session_routes() -> Router<AppState> {
    Router::new().route("/request", post(request_verification))
}

/// Send a verification token to the caller's address
#[utoipa::path(
    post,
    path = "/verification/request",
    tag = "Verification",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    responses(
        (status = 202, description = "Verification token issued", body = MessageResponse),
        (status = 400, description = "Email already verified"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn request_verification(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state
        .verification()
        .request_email_verification(current_user.id)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new("Verification email sent")),
    ))
}

/// Consume a verification token
#[utoipa::path(
    get,
    path = "/verification/verify",
    tag = "Verification",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<MessageResponse>> {
    state.verification().verify_email(&query.token).await?;
    Ok(Json(MessageResponse::new("Email verified")))
}
