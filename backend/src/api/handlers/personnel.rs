//! Personnel handlers.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::dto::MessageResponse;
use crate::api::extract::{Json, Path};
use crate::api::middleware::auth::{guarded, AuthExtension};
use crate::api::openapi::ErrorResponse;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::permission::Permission;
use crate::models::role::RoleRef;
use crate::services::personnel_service::{
    CreatePersonnel, PersonnelRecord, PersonnelService, UpdatePersonnel,
};

/// Reads need `personnel.view`, writes need `personnel.edit`.
pub fn router(state: &SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/",
            guarded(get(list_personnel), state, Permission::PersonnelView).merge(guarded(
                post(create_personnel),
                state,
                Permission::PersonnelEdit,
            )),
        )
        .route(
            "/:id",
            guarded(get(get_personnel), state, Permission::PersonnelView).merge(guarded(
                put(update_personnel).delete(delete_personnel),
                state,
                Permission::PersonnelEdit,
            )),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePersonnelRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Role name
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePersonnelRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// New password; omit to keep the current one
    pub password: Option<String>,
    /// Role name
    pub role: Option<String>,
}

/// List personnel
#[utoipa::path(
    get,
    path = "/api/personnel",
    tag = "personnel",
    responses(
        (status = 200, description = "All personnel", body = Vec<PersonnelRecord>),
        (status = 403, description = "Missing personnel.view", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_personnel(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PersonnelRecord>>> {
    let service = PersonnelService::new(state.store.clone());
    Ok(Json(service.list().await?))
}

/// Get a personnel record
#[utoipa::path(
    get,
    path = "/api/personnel/{id}",
    tag = "personnel",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Personnel record", body = PersonnelRecord),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_personnel(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<PersonnelRecord>> {
    let service = PersonnelService::new(state.store.clone());
    Ok(Json(service.get(id).await?))
}

/// Create a personnel record
#[utoipa::path(
    post,
    path = "/api/personnel",
    tag = "personnel",
    request_body = CreatePersonnelRequest,
    responses(
        (status = 201, description = "Personnel record created", body = PersonnelRecord),
        (status = 400, description = "Validation error or unknown role", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_personnel(
    State(state): State<SharedState>,
    Json(payload): Json<CreatePersonnelRequest>,
) -> Result<(StatusCode, Json<PersonnelRecord>)> {
    let service = PersonnelService::new(state.store.clone());
    let record = service
        .create(CreatePersonnel {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            role: payload.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Update a personnel record
#[utoipa::path(
    put,
    path = "/api/personnel/{id}",
    tag = "personnel",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdatePersonnelRequest,
    responses(
        (status = 200, description = "Updated record", body = PersonnelRecord),
        (status = 400, description = "Validation error or unknown role", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_personnel(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePersonnelRequest>,
) -> Result<Json<PersonnelRecord>> {
    let service = PersonnelService::new(state.store.clone());
    let record = service
        .update(
            id,
            UpdatePersonnel {
                name: payload.name,
                email: payload.email,
                password: payload.password,
                role: payload.role,
            },
        )
        .await?;
    Ok(Json(record))
}

/// Delete a personnel record
#[utoipa::path(
    delete,
    path = "/api/personnel/{id}",
    tag = "personnel",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Attempt to delete own account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "User still has assigned tasks (with count)", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_personnel(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let service = PersonnelService::new(state.store.clone());
    service.delete(auth.user_id, id).await?;
    Ok(Json(MessageResponse::deleted()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_personnel,
        get_personnel,
        create_personnel,
        update_personnel,
        delete_personnel,
    ),
    components(schemas(
        PersonnelRecord,
        RoleRef,
        CreatePersonnelRequest,
        UpdatePersonnelRequest,
        MessageResponse,
    ))
)]
pub struct PersonnelApiDoc;
