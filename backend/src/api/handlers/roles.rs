//! Role management handlers.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::dto::MessageResponse;
use crate::api::extract::{Json, Path};
use crate::api::middleware::auth::guarded;
use crate::api::openapi::ErrorResponse;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::permission::Permission;
use crate::models::role::Role;
use crate::services::role_service::{CreateRole, RoleService, UpdateRole};

/// Reads need `roles.view`, writes need `roles.edit`.
pub fn router(state: &SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/",
            guarded(get(list_roles), state, Permission::RolesView).merge(guarded(
                post(create_role),
                state,
                Permission::RolesEdit,
            )),
        )
        .route(
            "/:id",
            guarded(get(get_role), state, Permission::RolesView).merge(guarded(
                put(update_role).delete(delete_role),
                state,
                Permission::RolesEdit,
            )),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    /// Machine key: lowercase letters, digits, `_` and `-`
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub label: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// List roles ordered by id
#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "roles",
    responses(
        (status = 200, description = "All roles", body = Vec<Role>),
        (status = 403, description = "Missing roles.view", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_roles(State(state): State<SharedState>) -> Result<Json<Vec<Role>>> {
    let service = RoleService::new(state.store.clone());
    Ok(Json(service.list().await?))
}

/// Get a role
#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role", body = Role),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_role(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Role>> {
    let service = RoleService::new(state.store.clone());
    Ok(Json(service.get(id).await?))
}

/// Create a role
#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Invalid name, label or permission", body = ErrorResponse),
        (status = 409, description = "Role name already exists", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_role(
    State(state): State<SharedState>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>)> {
    let service = RoleService::new(state.store.clone());
    let role = service
        .create(CreateRole {
            name: payload.name,
            label: payload.label,
            description: payload.description,
            permissions: payload.permissions,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// Update a role's label, description or permissions
#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = i64, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated role", body = Role),
        (status = 400, description = "Invalid label or permission", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<Role>> {
    let service = RoleService::new(state.store.clone());
    let role = service
        .update(
            id,
            UpdateRole {
                label: payload.label,
                description: payload.description,
                permissions: payload.permissions,
            },
        )
        .await?;
    Ok(Json(role))
}

/// Delete a role
#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "System role, or role still assigned (with count)", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_role(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let service = RoleService::new(state.store.clone());
    service.delete(id).await?;
    Ok(Json(MessageResponse::deleted()))
}

#[derive(OpenApi)]
#[openapi(
    paths(list_roles, get_role, create_role, update_role, delete_role),
    components(schemas(Role, CreateRoleRequest, UpdateRoleRequest, Permission))
)]
pub struct RolesApiDoc;
