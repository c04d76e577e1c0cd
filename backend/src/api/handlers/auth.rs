//! Authentication handlers.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::extract::Json;
use crate::api::middleware::auth::AuthExtension;
use crate::api::openapi::ErrorResponse;
use crate::api::SharedState;
use crate::error::Result;
use crate::services::auth_service::{Registration, Session, UserProfile};

/// Public auth routes (rate limited, no token)
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Auth routes that need a token
pub fn protected_router() -> Router<SharedState> {
    Router::new().route("/me", get(get_current_user))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Role name; defaults to the configured default role
    pub role: Option<String>,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Validation error or unknown role", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let profile = state
        .auth
        .register(Registration {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            role: payload.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token and profile", body = Session),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Session>> {
    let session = state
        .auth
        .authenticate(&payload.email, &payload.password)
        .await?;
    Ok(Json(session))
}

/// Current user with fresh permissions
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.auth.current_user(auth.user_id).await?))
}

#[derive(OpenApi)]
#[openapi(
    paths(register, login, get_current_user),
    components(schemas(LoginRequest, RegisterRequest, Session, UserProfile))
)]
pub struct AuthApiDoc;
