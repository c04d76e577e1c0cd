//! Role registry.
//!
//! Owns role validation and the delete guards: system roles are permanent and
//! a role still assigned to users cannot be removed.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::permission::Permission;
use crate::models::role::{NewRole, Role, RoleChanges};
use crate::store::Store;

/// Input for creating a role.
#[derive(Debug, Clone, Default)]
pub struct CreateRole {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// Input for updating a role. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateRole {
    pub label: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Role service
pub struct RoleService {
    store: Arc<dyn Store>,
}

impl RoleService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All roles ordered by id.
    pub async fn list(&self) -> Result<Vec<Role>> {
        self.store.list_roles().await
    }

    pub async fn get(&self, id: i64) -> Result<Role> {
        self.store
            .get_role(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))
    }

    /// Create a non-system role.
    pub async fn create(&self, input: CreateRole) -> Result<Role> {
        self.create_role(input, false).await
    }

    /// Create a role that can never be deleted. Only used when seeding.
    pub async fn create_system(&self, input: CreateRole) -> Result<Role> {
        self.create_role(input, true).await
    }

    async fn create_role(&self, input: CreateRole, is_system: bool) -> Result<Role> {
        let name = input.name.trim().to_string();
        validate_role_name(&name)?;
        let label = validate_label(&input.label)?;
        let permissions = normalize_permissions(input.permissions)?;

        let role = self
            .store
            .insert_role(NewRole {
                name,
                label,
                description: input.description.unwrap_or_default(),
                permissions,
                is_system,
            })
            .await?;

        tracing::info!(role_id = role.id, role = %role.name, is_system, "Role created");
        Ok(role)
    }

    /// Update label, description or permissions. Name and system flag are immutable.
    pub async fn update(&self, id: i64, input: UpdateRole) -> Result<Role> {
        let changes = RoleChanges {
            label: input.label.as_deref().map(validate_label).transpose()?,
            description: input.description,
            permissions: input.permissions.map(normalize_permissions).transpose()?,
        };

        let role = self
            .store
            .update_role(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))?;

        tracing::info!(role_id = role.id, role = %role.name, "Role updated");
        Ok(role)
    }

    /// Delete a role unless it is a system role or still assigned.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let role = self.get(id).await?;
        if role.is_system {
            return Err(AppError::SystemRoleProtected(role.name));
        }

        let assigned = self.store.count_users_with_role(id).await?;
        if assigned > 0 {
            return Err(AppError::RoleInUse(assigned));
        }

        match self.store.delete_role(id).await {
            Ok(true) => {
                tracing::info!(role_id = id, role = %role.name, "Role deleted");
                Ok(())
            }
            Ok(false) => Err(AppError::NotFound(format!("Role {} not found", id))),
            // A user was assigned between the count and the delete.
            Err(AppError::Conflict { .. }) => {
                let assigned = self.store.count_users_with_role(id).await?;
                Err(AppError::RoleInUse(assigned.max(1)))
            }
            Err(e) => Err(e),
        }
    }
}

/// Lowercase machine key: `[a-z0-9_-]+`.
fn validate_role_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AppError::Validation("Role name is required".into()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(format!(
            "Role name '{}' may only contain lowercase letters, digits, '_' and '-'",
            name
        )));
    }
    Ok(())
}

fn validate_label(label: &str) -> Result<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(AppError::Validation("Role label is required".into()));
    }
    Ok(label.to_string())
}

/// Reject strings outside the vocabulary and drop duplicates, keeping first-seen order.
fn normalize_permissions(permissions: Vec<String>) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(permissions.len());
    for permission in permissions {
        if Permission::parse(&permission).is_none() {
            return Err(AppError::Validation(format!(
                "Unknown permission '{}'",
                permission
            )));
        }
        if !normalized.contains(&permission) {
            normalized.push(permission);
        }
    }
    Ok(normalized)
}
