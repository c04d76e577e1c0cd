//! Dashboard handler.

use axum::{extract::State, Json};
use utoipa::OpenApi;

use crate::api::openapi::ErrorResponse;
use crate::api::SharedState;
use crate::error::Result;
use crate::services::dashboard_service::{DashboardService, DashboardSummary};

/// Headline counts
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Counts of personnel, materials and tasks", body = DashboardSummary),
        (status = 403, description = "Missing dashboard.view", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_dashboard(State(state): State<SharedState>) -> Result<Json<DashboardSummary>> {
    let service = DashboardService::new(state.store.clone());
    Ok(Json(service.summary().await?))
}

#[derive(OpenApi)]
#[openapi(paths(get_dashboard), components(schemas(DashboardSummary)))]
pub struct DashboardApiDoc;
