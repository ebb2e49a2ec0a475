//! Self-service handlers for the authenticated caller.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use common::{AppError, AppResult};
use domain::UserResponse;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;

/// Password change request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(min_length = 8)]
    pub new_password: String,
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_me))
        .route("/password", put(change_password))
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/me",
    tag = "Me",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users().get_user(current_user.id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Change own password; the current one must be supplied
#[utoipa::path(
    put,
    path = "/me/password",
    tag = "Me",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Current password is wrong")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let user = state.users().get_user(current_user.id).await?;
    if !user.authenticate(&payload.current_password) {
        return Err(AppError::InvalidCredentials);
    }

    state
        .users()
        .change_password(current_user.id, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
