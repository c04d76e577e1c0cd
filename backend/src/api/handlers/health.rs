//! Health check endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::SharedState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: CheckStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness plus a store round trip
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let store = match state.store.ping().await {
        Ok(()) => CheckStatus {
            status: "healthy".to_string(),
            message: None,
        },
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            CheckStatus {
                status: "unhealthy".to_string(),
                message: Some("Store unreachable".to_string()),
            }
        }
    };

    let healthy = store.status == "healthy";
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store,
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response))
}

#[derive(OpenApi)]
#[openapi(paths(health_check), components(schemas(HealthResponse, CheckStatus)))]
pub struct HealthApiDoc;
