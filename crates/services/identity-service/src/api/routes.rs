//! Application route configuration.

use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    admin_routes, auth_routes, auth_session_routes, health_routes, me_routes, password_routes,
    verification_routes, verification_session_routes,
};
use super::middleware::{admin_middleware, auth_middleware, rate_limit_middleware};
use super::openapi::ApiDoc;
use super::AppState;

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let authenticated = middleware::from_fn_with_state(state.clone(), auth_middleware);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(
            "/auth",
            auth_routes().merge(auth_session_routes().route_layer(authenticated.clone())),
        )
        .nest("/me", me_routes().route_layer(authenticated.clone()))
        .nest(
            "/verification",
            verification_routes()
                .merge(verification_session_routes().route_layer(authenticated.clone())),
        )
        .nest("/password", password_routes())
        .nest(
            "/admin",
            admin_routes()
                .route_layer(middleware::from_fn(admin_middleware))
                .route_layer(authenticated),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        // Probes stay outside the rate limit
        .nest("/health", health_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
