//! Task handlers. Any authenticated user may manage tasks.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::api::dto::{double_option, MessageResponse};
use crate::api::extract::{Json, Path, Query};
use crate::api::openapi::ErrorResponse;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::task::{TaskDetail, TaskStatus};
use crate::models::user::UserSummary;
use crate::services::task_service::{CreateTask, IdRef, TaskService, UpdateTask};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TaskListQuery {
    /// Only tasks assigned to this user
    pub user_id: Option<i64>,
    /// `pending`, `in_progress` or `completed`
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    pub deadline: Option<String>,
    /// Assignee id, as a number or numeric string
    #[serde(rename = "userId")]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<IdRef>,
    /// Material id, as a number or numeric string; empty or null for none
    #[serde(rename = "materialId")]
    #[schema(value_type = Option<String>)]
    pub material_id: Option<IdRef>,
}

/// Absent fields are left unchanged; `null` clears description, deadline or material.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub deadline: Option<Option<String>>,
    #[serde(rename = "userId")]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<IdRef>,
    #[serde(rename = "materialId", default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub material_id: Option<Option<IdRef>>,
}

/// List tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Tasks with assignee and material", body = Vec<TaskDetail>),
        (status = 400, description = "Unknown status filter", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(
    State(state): State<SharedState>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<TaskDetail>>> {
    let service = TaskService::new(state.store.clone());
    let tasks = service.list(query.user_id, query.status.as_deref()).await?;
    Ok(Json(tasks))
}

/// Get a task
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task", body = TaskDetail),
        (status = 404, description = "Task not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<TaskDetail>> {
    let service = TaskService::new(state.store.clone());
    Ok(Json(service.get(id).await?))
}

/// Create a task
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskDetail),
        (status = 400, description = "Validation error or invalid reference", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    State(state): State<SharedState>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskDetail>)> {
    let service = TaskService::new(state.store.clone());
    let task = service
        .create(CreateTask {
            title: payload.title.unwrap_or_default(),
            description: payload.description,
            status: payload.status,
            deadline: payload.deadline,
            user_id: payload.user_id,
            material_id: payload.material_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Update a task
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = TaskDetail),
        (status = 400, description = "Validation error or invalid reference", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskDetail>> {
    let service = TaskService::new(state.store.clone());
    let task = service
        .update(
            id,
            UpdateTask {
                title: payload.title,
                description: payload.description,
                status: payload.status,
                deadline: payload.deadline,
                user_id: payload.user_id,
                material_id: payload.material_id,
            },
        )
        .await?;
    Ok(Json(task))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let service = TaskService::new(state.store.clone());
    service.delete(id).await?;
    Ok(Json(MessageResponse::deleted()))
}

#[derive(OpenApi)]
#[openapi(
    paths(list_tasks, get_task, create_task, update_task, delete_task),
    components(schemas(
        TaskDetail,
        TaskStatus,
        UserSummary,
        CreateTaskRequest,
        UpdateTaskRequest,
    ))
)]
pub struct TasksApiDoc;
