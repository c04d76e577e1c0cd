//! OpenAPI specification generated from handler annotations via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Root OpenAPI document. Handler modules contribute their own
/// `#[derive(OpenApi)]` structs which are merged in by [`build_openapi`].
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CrewDesk API",
        description = "Personnel, warehouse and task tracking with role-based permissions.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and session"),
        (name = "dashboard", description = "Summary counts"),
        (name = "personnel", description = "User accounts"),
        (name = "materials", description = "Warehouse stock"),
        (name = "tasks", description = "Task assignment and tracking"),
        (name = "roles", description = "Roles and permission sets"),
        (name = "health", description = "Health checks"),
    ),
    components(schemas(ErrorResponse))
)]
pub struct ApiDoc;

/// Error body returned by every endpoint on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "NOT_FOUND", "ROLE_IN_USE")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Number of blocking references, for `ROLE_IN_USE` and some `CONFLICT` errors
    pub count: Option<i64>,
}

/// Adds the Bearer JWT security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the merged OpenAPI document from all handler modules.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(super::handlers::auth::AuthApiDoc::openapi());
    doc.merge(super::handlers::dashboard::DashboardApiDoc::openapi());
    doc.merge(super::handlers::personnel::PersonnelApiDoc::openapi());
    doc.merge(super::handlers::materials::MaterialsApiDoc::openapi());
    doc.merge(super::handlers::tasks::TasksApiDoc::openapi());
    doc.merge(super::handlers::roles::RolesApiDoc::openapi());
    doc.merge(super::handlers::health::HealthApiDoc::openapi());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_is_valid() {
        let spec = build_openapi();
        assert_eq!(spec.info.title, "CrewDesk API");

        for path in [
            "/api/auth/login",
            "/api/auth/register",
            "/api/auth/me",
            "/api/dashboard",
            "/api/personnel",
            "/api/personnel/{id}",
            "/api/materials",
            "/api/materials/{id}",
            "/api/tasks",
            "/api/tasks/{id}",
            "/api/roles",
            "/api/roles/{id}",
            "/health",
        ] {
            assert!(spec.paths.paths.contains_key(path), "Missing path {path}");
        }

        let has_bearer = spec
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"));
        assert!(has_bearer, "Bearer auth security scheme is missing.");

        let json = serde_json::to_string(&spec).expect("Spec should serialize to JSON");
        assert!(json.contains("ROLE_IN_USE"));
    }

    #[test]
    fn test_every_crud_path_has_all_operations() {
        let spec = build_openapi();
        for path in ["/api/personnel/{id}", "/api/materials/{id}", "/api/tasks/{id}", "/api/roles/{id}"] {
            let item = &spec.paths.paths[path];
            assert!(item.get.is_some(), "{path} missing GET");
            assert!(item.put.is_some(), "{path} missing PUT");
            assert!(item.delete.is_some(), "{path} missing DELETE");
        }
    }
}
