//! Authentication and permission middleware.
//!
//! Every protected request carries `Authorization: Bearer <token>`. The token
//! only identifies the user; the user and role are loaded from the store on
//! each request so role edits apply to the very next call.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};

use crate::api::SharedState;
use crate::error::{AppError, TokenProblem};
use crate::models::permission::Permission;
use crate::services::auth_service::{AuthService, Principal};

/// Extension that holds the authenticated caller
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    /// Role name, if the user has one
    pub role: Option<String>,
    pub permissions: Vec<String>,
}

impl From<&Principal> for AuthExtension {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.user.id,
            email: principal.user.email.clone(),
            name: principal.user.name.clone(),
            role: principal.role.as_ref().map(|r| r.name.clone()),
            permissions: principal.permissions(),
        }
    }
}

/// Token extraction result
#[derive(Debug, PartialEq)]
enum ExtractedToken<'a> {
    Bearer(&'a str),
    /// No Authorization header
    None,
    /// Header present but not a usable bearer credential
    Invalid,
}

fn extract_token(request: &Request) -> ExtractedToken<'_> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return ExtractedToken::None;
    };
    let Ok(value) = header.to_str() else {
        return ExtractedToken::Invalid;
    };
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => ExtractedToken::Bearer(token.trim()),
        _ => ExtractedToken::Invalid,
    }
}

/// Resolve the request's bearer token to a user id. Runs before any await so
/// the request is never borrowed across one.
fn session_user_id(auth: &AuthService, request: &Request) -> Result<i64, AppError> {
    match extract_token(request) {
        ExtractedToken::Bearer(token) => auth.resolve_session(token),
        ExtractedToken::None => Err(AppError::Unauthenticated(TokenProblem::Missing)),
        ExtractedToken::Invalid => Err(AppError::Unauthenticated(TokenProblem::Invalid)),
    }
}

/// Authentication middleware function - requires a valid token
pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match session_user_id(&state.auth, &request) {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };
    match state.auth.load_principal(user_id).await {
        Ok(principal) => {
            request
                .extensions_mut()
                .insert(AuthExtension::from(&principal));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// State for [`require_permission`]: the permission a route declared.
#[derive(Clone)]
pub struct PermissionGate {
    pub state: SharedState,
    pub permission: Permission,
}

/// Permission middleware - requires a valid token and an exact permission match
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match session_user_id(&gate.state.auth, &request) {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };
    let principal = match gate.state.auth.load_principal(user_id).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    if !principal.grants(gate.permission) {
        tracing::debug!(
            user_id = principal.user.id,
            permission = %gate.permission,
            "Permission denied"
        );
        return AppError::Forbidden(format!("Missing permission '{}'", gate.permission))
            .into_response();
    }

    request
        .extensions_mut()
        .insert(AuthExtension::from(&principal));
    next.run(request).await
}

/// Attach a permission requirement to a method router.
pub fn guarded(
    route: MethodRouter<SharedState>,
    state: &SharedState,
    permission: Permission,
) -> MethodRouter<SharedState> {
    route.route_layer(middleware::from_fn_with_state(
        PermissionGate {
            state: Arc::clone(state),
            permission,
        },
        require_permission,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use crate::api::AppState;
    use crate::config::Config;
    use crate::models::role::NewRole;
    use crate::models::user::NewUser;
    use crate::store::{MemoryStore, Store};

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/tasks");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        let req = request_with(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&req), ExtractedToken::Bearer("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header_is_distinguished() {
        assert_eq!(extract_token(&request_with(None)), ExtractedToken::None);
    }

    #[test]
    fn test_other_schemes_are_invalid() {
        assert_eq!(
            extract_token(&request_with(Some("Basic dXNlcjpwYXNz"))),
            ExtractedToken::Invalid
        );
        assert_eq!(
            extract_token(&request_with(Some("Bearer "))),
            ExtractedToken::Invalid
        );
        assert_eq!(
            extract_token(&request_with(Some("bearer abc"))),
            ExtractedToken::Invalid
        );
    }

    async fn guarded_app() -> (Router, SharedState) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(Config::for_memory("gate-secret"), store));
        let router = Router::new()
            .route(
                "/roles",
                guarded(get(|| async { "listed" }), &state, Permission::RolesView),
            )
            .route(
                "/me",
                get(|| async { "me" }).route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
            )
            .with_state(state.clone());
        (router, state)
    }

    async fn user_with(state: &SharedState, email: &str, permissions: &[&str]) -> String {
        let role = state
            .store
            .insert_role(NewRole {
                name: format!("role-{}", email),
                label: "Gate".into(),
                description: String::new(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
                is_system: false,
            })
            .await
            .unwrap();
        let user = state
            .store
            .insert_user(NewUser {
                email: email.into(),
                name: "Gate user".into(),
                password_hash: "unused".into(),
                role_id: Some(role.id),
            })
            .await
            .unwrap();
        state.auth.issue_token(user.id).unwrap().0
    }

    async fn call(router: &Router, uri: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_gate_rejects_missing_and_invalid_tokens() {
        let (router, _) = guarded_app().await;

        let (status, body) = call(&router, "/roles", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("TOKEN_MISSING"));

        let (status, body) = call(&router, "/me", Some("not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("TOKEN_INVALID"));
    }

    #[tokio::test]
    async fn test_gate_checks_role_permissions() {
        let (router, state) = guarded_app().await;
        let viewer = user_with(&state, "viewer@test.local", &["roles.view"]).await;
        let worker = user_with(&state, "worker@test.local", &["dashboard.view"]).await;

        assert_eq!(
            call(&router, "/roles", Some(&viewer)).await,
            (StatusCode::OK, "listed".to_string())
        );

        let (status, body) = call(&router, "/roles", Some(&worker)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("FORBIDDEN"));

        assert_eq!(
            call(&router, "/me", Some(&worker)).await,
            (StatusCode::OK, "me".to_string())
        );
    }
}
