//! Admin user management handlers. Mounted behind the admin middleware.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use common::{AppError, AppResult};
use domain::{UserId, UserResponse, DEFAULT_PAGE_LIMIT};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Page size, 1..=100 (default 20)
    pub limit: Option<i64>,
    /// Rows to skip (default 0)
    pub offset: Option<i64>,
}

/// A page of users
#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Partial update; absent fields are left alone
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[schema(example = "admin")]
    pub role: Option<String>,
    pub active: Option<bool>,
    /// Only `true` is accepted
    pub email_verified: Option<bool>,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

fn user_id(raw: u64) -> AppResult<UserId> {
    Ok(UserId::new(raw)?)
}

/// List users, newest first
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "A page of users", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Json<UserListResponse>> {
    let page = state
        .users()
        .list_users(
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT as i64),
            query.offset.unwrap_or(0),
        )
        .await?;

    Ok(Json(UserListResponse {
        users: page.users.iter().map(UserResponse::from).collect(),
        total: page.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    tag = "Admin",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users().get_user(user_id(id)?).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Change role, activation or verification state
#[utoipa::path(
    patch,
    path = "/admin/users/{id}",
    tag = "Admin",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = u64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<u64>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let id = user_id(id)?;
    if payload.email_verified == Some(false) {
        return Err(AppError::validation("email_verified can only be set to true"));
    }

    let users = state.users();
    let mut user = users.get_user(id).await?;

    if let Some(role) = payload.role.as_deref() {
        user = users.change_role(id, role).await?;
    }
    if let Some(active) = payload.active {
        user = users.set_active(id, active).await?;
    }
    if payload.email_verified == Some(true) {
        user = users.verify_email(id).await?;
    }

    tracing::info!(user_id = %id, acting_user = %current_user.id, "User updated by admin");
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user. Admins cannot delete themselves.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "Admin",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Cannot delete your own account")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> AppResult<StatusCode> {
    state
        .users()
        .delete_user(user_id(id)?, current_user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
