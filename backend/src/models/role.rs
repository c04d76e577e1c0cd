//! Role model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::permission::Permission;

/// Role entity
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: i64,
    /// Machine key, unique and immutable after creation
    pub name: String,
    /// Human-readable label
    pub label: String,
    pub description: String,
    pub permissions: Vec<String>,
    /// System roles can never be deleted
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Exact membership test against the role's permission set.
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.iter().any(|p| p == permission.as_str())
    }
}

/// Short role reference embedded in user representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoleRef {
    pub id: i64,
    pub name: String,
    pub label: String,
}

impl From<&Role> for RoleRef {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            label: role.label.clone(),
        }
    }
}

/// Fields of a role being created.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub label: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub is_system: bool,
}

/// Mutable fields of a role. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub label: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_with(permissions: &[&str]) -> Role {
        Role {
            id: 1,
            name: "worker".into(),
            label: "Worker".into(),
            description: String::new(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
            is_system: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_grants_exact_member() {
        let role = role_with(&["dashboard.view", "personnel.view"]);
        assert!(role.grants(Permission::PersonnelView));
        assert!(role.grants(Permission::DashboardView));
        assert!(!role.grants(Permission::PersonnelEdit));
    }

    #[test]
    fn test_grants_ignores_similar_strings() {
        let role = role_with(&["personnel.viewer", "personnel", "personnel.*", "PERSONNEL.VIEW"]);
        assert!(!role.grants(Permission::PersonnelView));
    }
}
