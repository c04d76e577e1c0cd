//! Route definitions for the API.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use super::middleware::auth::{auth_middleware, guarded};
use super::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use super::middleware::tracing::correlation_id_middleware;
use super::SharedState;
use crate::models::permission::Permission;

/// Window of the auth rate limiter, in seconds.
const AUTH_RATE_WINDOW_SECS: u64 = 60;

/// Create the main API router.
///
/// Must be called from within a tokio runtime; the rate limiter's cleanup
/// task is spawned here.
pub fn create_router(state: SharedState) -> Router {
    let openapi = super::openapi::build_openapi();

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", openapi))
        .nest("/api", api_routes(&state))
        .layer(middleware::from_fn(correlation_id_middleware))
        .with_state(state)
}

fn api_routes(state: &SharedState) -> Router<SharedState> {
    let auth_rate_limiter = Arc::new(RateLimiter::new(
        state.config.login_rate_limit,
        AUTH_RATE_WINDOW_SECS,
    ));
    auth_rate_limiter.spawn_cleanup();

    Router::new()
        .nest(
            "/auth",
            handlers::auth::public_router().layer(middleware::from_fn_with_state(
                auth_rate_limiter,
                rate_limit_middleware,
            )),
        )
        .nest(
            "/auth",
            handlers::auth::protected_router().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .route(
            "/dashboard",
            guarded(
                get(handlers::dashboard::get_dashboard),
                state,
                Permission::DashboardView,
            ),
        )
        .nest("/personnel", handlers::personnel::router(state))
        .nest("/materials", handlers::materials::router(state))
        .nest("/roles", handlers::roles::router(state))
        .nest(
            "/tasks",
            handlers::tasks::router().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
}
