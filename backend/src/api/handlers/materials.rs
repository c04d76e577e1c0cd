//! Warehouse material handlers.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::dto::{double_option, MessageResponse};
use crate::api::extract::{Json, Path};
use crate::api::middleware::auth::guarded;
use crate::api::openapi::ErrorResponse;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::material::Material;
use crate::models::permission::Permission;
use crate::services::material_service::{CreateMaterial, MaterialService, UpdateMaterial};

/// Reads need `warehouse.view`, writes need `warehouse.edit`.
pub fn router(state: &SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/",
            guarded(get(list_materials), state, Permission::WarehouseView).merge(guarded(
                post(create_material),
                state,
                Permission::WarehouseEdit,
            )),
        )
        .route(
            "/:id",
            guarded(get(get_material), state, Permission::WarehouseView).merge(guarded(
                put(update_material).delete(delete_material),
                state,
                Permission::WarehouseEdit,
            )),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MaterialRequest {
    pub name: Option<String>,
    /// On update, `null` clears the description
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub quantity: Option<i32>,
    /// Unit of measure, `pcs` when omitted
    pub unit: Option<String>,
}

/// List materials
#[utoipa::path(
    get,
    path = "/api/materials",
    tag = "materials",
    responses(
        (status = 200, description = "All materials", body = Vec<Material>),
        (status = 403, description = "Missing warehouse.view", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_materials(State(state): State<SharedState>) -> Result<Json<Vec<Material>>> {
    let service = MaterialService::new(state.store.clone());
    Ok(Json(service.list().await?))
}

/// Get a material
#[utoipa::path(
    get,
    path = "/api/materials/{id}",
    tag = "materials",
    params(("id" = i64, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material", body = Material),
        (status = 404, description = "Material not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_material(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Material>> {
    let service = MaterialService::new(state.store.clone());
    Ok(Json(service.get(id).await?))
}

/// Create a material
#[utoipa::path(
    post,
    path = "/api/materials",
    tag = "materials",
    request_body = MaterialRequest,
    responses(
        (status = 201, description = "Material created", body = Material),
        (status = 400, description = "Missing name or negative quantity", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_material(
    State(state): State<SharedState>,
    Json(payload): Json<MaterialRequest>,
) -> Result<(StatusCode, Json<Material>)> {
    let service = MaterialService::new(state.store.clone());
    let material = service
        .create(CreateMaterial {
            name: payload.name.unwrap_or_default(),
            description: payload.description.flatten(),
            quantity: payload.quantity,
            unit: payload.unit,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(material)))
}

/// Update a material
#[utoipa::path(
    put,
    path = "/api/materials/{id}",
    tag = "materials",
    params(("id" = i64, Path, description = "Material ID")),
    request_body = MaterialRequest,
    responses(
        (status = 200, description = "Updated material", body = Material),
        (status = 400, description = "Empty name or negative quantity", body = ErrorResponse),
        (status = 404, description = "Material not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_material(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(payload): Json<MaterialRequest>,
) -> Result<Json<Material>> {
    let service = MaterialService::new(state.store.clone());
    let material = service
        .update(
            id,
            UpdateMaterial {
                name: payload.name,
                description: payload.description,
                quantity: payload.quantity,
                unit: payload.unit,
            },
        )
        .await?;
    Ok(Json(material))
}

/// Delete a material; tasks that used it keep existing without one
#[utoipa::path(
    delete,
    path = "/api/materials/{id}",
    tag = "materials",
    params(("id" = i64, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material deleted", body = MessageResponse),
        (status = 404, description = "Material not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_material(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let service = MaterialService::new(state.store.clone());
    service.delete(id).await?;
    Ok(Json(MessageResponse::deleted()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_materials,
        get_material,
        create_material,
        update_material,
        delete_material,
    ),
    components(schemas(Material, MaterialRequest))
)]
pub struct MaterialsApiDoc;
