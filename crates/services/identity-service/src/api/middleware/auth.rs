//! Session authentication middleware.
//!
//! The session id comes from the session cookie or from the `sid` claim of
//! an `Authorization: Bearer` JWT. The cookie is tried first; a stale cookie
//! falls through to the bearer token.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use common::{AppError, AppResult};
use domain::{Email, Session, SessionId, User, UserId, UserRole, BEARER_TOKEN_PREFIX};

use crate::api::session_cookie::read_session_cookie;
use crate::api::AppState;

/// Authenticated caller, inserted into request extensions.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: UserId,
    pub session_id: SessionId,
    pub email: Email,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Session id presented with the request, if any. Cookie first.
///
/// A malformed or badly signed bearer token is an error; no credentials at
/// all is `Ok(None)`.
pub fn presented_session_token(headers: &HeaderMap, state: &AppState) -> AppResult<Option<String>> {
    match read_session_cookie(headers, &state.session) {
        Some(sid) => Ok(Some(sid)),
        None => bearer_session_token(headers, state),
    }
}

/// Session id carried by an `Authorization: Bearer` JWT.
fn bearer_session_token(headers: &HeaderMap, state: &AppState) -> AppResult<Option<String>> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
        .ok_or(AppError::Unauthorized)?;

    let sid = state.services.tokens().session_id(token.trim())?;
    Ok(Some(sid.as_str().to_string()))
}

/// Validate the cookie session, then the bearer session if the cookie's is
/// no longer live.
async fn authenticate(headers: &HeaderMap, state: &AppState) -> AppResult<(Session, User)> {
    if let Some(sid) = read_session_cookie(headers, &state.session) {
        match state.auth().validate_session(&sid).await {
            Err(AppError::InvalidSession) => {
                tracing::debug!("Session cookie is stale, trying bearer token");
            }
            resolved => return resolved,
        }
        return match bearer_session_token(headers, state) {
            Ok(Some(sid)) => state.auth().validate_session(&sid).await,
            _ => Err(AppError::InvalidSession),
        };
    }

    let sid = bearer_session_token(headers, state)?.ok_or(AppError::Unauthorized)?;
    state.auth().validate_session(&sid).await
}

/// Reject the request unless it carries a live session of an active user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (session, user) = authenticate(request.headers(), &state).await?;
    if !user.is_active() {
        tracing::info!(user_id = %user.id(), "Request from deactivated account");
        return Err(AppError::AccountDeactivated);
    }

    request.extensions_mut().insert(CurrentUser {
        id: user.id(),
        session_id: session.id().clone(),
        email: user.email().clone(),
        role: user.role(),
    });

    Ok(next.run(request).await)
}

/// Must run inside [`auth_middleware`].
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::Unauthorized)?;
    require_admin(user)?;

    Ok(next.run(request).await)
}

/// Require admin role, returns Forbidden error if not admin.
pub fn require_admin(user: &CurrentUser) -> AppResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1).unwrap(),
            session_id: SessionId::new("sid").unwrap(),
            email: Email::new("a@x.com").unwrap(),
            role,
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&current(UserRole::Admin)).is_ok());
        assert!(matches!(
            require_admin(&current(UserRole::User)),
            Err(AppError::Forbidden)
        ));
    }
}
