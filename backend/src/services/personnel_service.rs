//! Personnel service.
//!
//! Personnel records are user accounts managed by staff with `personnel.edit`.
//! Roles are addressed by name on input and embedded as [`RoleRef`] on output.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::models::role::{Role, RoleRef};
use crate::models::user::{NewUser, User, UserChanges};
use crate::services::auth_service::{validate_email, validate_name, validate_password, AuthService};
use crate::store::Store;

/// Personnel representation returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PersonnelRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Option<RoleRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersonnelRecord {
    fn new(user: User, role: Option<&Role>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: role.map(RoleRef::from),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreatePersonnel {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Role name
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePersonnel {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Personnel service
pub struct PersonnelService {
    store: Arc<dyn Store>,
}

impl PersonnelService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<PersonnelRecord>> {
        let roles: HashMap<i64, Role> = self
            .store
            .list_roles()
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        Ok(self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|user| {
                let role = user.role_id.and_then(|id| roles.get(&id));
                PersonnelRecord::new(user, role)
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<PersonnelRecord> {
        let user = self
            .store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        self.record(user).await
    }

    pub async fn create(&self, input: CreatePersonnel) -> Result<PersonnelRecord> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_string();
        validate_name(&name)?;
        validate_email(&email)?;
        validate_password(&input.password)?;

        let role = match input.role.as_deref() {
            Some(role_name) => Some(self.resolve_role(role_name).await?),
            None => None,
        };

        let user = self
            .store
            .insert_user(NewUser {
                email,
                name,
                password_hash: AuthService::hash_password(&input.password)?,
                role_id: role.as_ref().map(|r| r.id),
            })
            .await?;

        tracing::info!(user_id = user.id, "Personnel record created");
        Ok(PersonnelRecord::new(user, role.as_ref()))
    }

    pub async fn update(&self, id: i64, input: UpdatePersonnel) -> Result<PersonnelRecord> {
        let name = input.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            validate_name(name)?;
        }
        let email = input.email.map(|e| e.trim().to_string());
        if let Some(email) = &email {
            validate_email(email)?;
        }
        let password_hash = match input.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(AuthService::hash_password(password)?)
            }
            None => None,
        };
        let role_id = match input.role.as_deref() {
            Some(role_name) => Some(self.resolve_role(role_name).await?.id),
            None => None,
        };

        let user = self
            .store
            .update_user(
                id,
                UserChanges {
                    email,
                    name,
                    password_hash,
                    role_id,
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        tracing::info!(user_id = id, "Personnel record updated");
        self.record(user).await
    }

    /// Delete a user. Callers cannot delete themselves, and users with
    /// assigned tasks are kept.
    pub async fn delete(&self, caller_id: i64, id: i64) -> Result<()> {
        if caller_id == id {
            return Err(AppError::Validation(
                "You cannot delete your own account".into(),
            ));
        }

        let tasks = self.store.count_tasks_for_user(id).await?;
        if tasks > 0 {
            return Err(AppError::Conflict {
                message: "User still has assigned tasks".into(),
                count: Some(tasks),
            });
        }

        if !self.store.delete_user(id).await? {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        tracing::info!(user_id = id, "Personnel record deleted");
        Ok(())
    }

    async fn resolve_role(&self, name: &str) -> Result<Role> {
        let name = name.trim();
        self.store
            .find_role_by_name(name)
            .await?
            .ok_or_else(|| AppError::UnknownRole(name.to_string()))
    }

    async fn record(&self, user: User) -> Result<PersonnelRecord> {
        let role = match user.role_id {
            Some(role_id) => self.store.get_role(role_id).await?,
            None => None,
        };
        Ok(PersonnelRecord::new(user, role.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::NewRole;
    use crate::models::task::{NewTask, TaskStatus};
    use crate::store::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, PersonnelService) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_role(NewRole {
                name: "worker".into(),
                label: "Worker".into(),
                description: String::new(),
                permissions: vec![],
                is_system: false,
            })
            .await
            .unwrap();
        (store.clone(), PersonnelService::new(store))
    }

    fn person(email: &str, role: Option<&str>) -> CreatePersonnel {
        CreatePersonnel {
            name: "Sam".into(),
            email: email.into(),
            password: "secret1".into(),
            role: role.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_create_resolves_role_by_name() {
        let (_, svc) = setup().await;
        let record = svc.create(person("sam@example.com", Some("worker"))).await.unwrap();
        assert_eq!(record.role.as_ref().unwrap().name, "worker");
        assert_eq!(svc.get(record.id).await.unwrap(), record);

        let err = svc
            .create(person("max@example.com", Some("ghost")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownRole(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (_, svc) = setup().await;
        svc.create(person("sam@example.com", None)).await.unwrap();
        let err = svc.create(person("sam@example.com", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let (_, svc) = setup().await;
        let record = svc.create(person("sam@example.com", None)).await.unwrap();
        let err = svc.delete(record.id, record.id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_with_tasks_reports_count() {
        let (store, svc) = setup().await;
        let record = svc.create(person("sam@example.com", None)).await.unwrap();
        store
            .insert_task(NewTask {
                title: "Sweep".into(),
                description: None,
                status: TaskStatus::Pending,
                deadline: None,
                user_id: record.id,
                material_id: None,
            })
            .await
            .unwrap();

        let err = svc.delete(0, record.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { count: Some(1), .. }));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let (_, svc) = setup().await;
        let err = svc
            .update(
                77,
                UpdatePersonnel {
                    name: Some("Nobody".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
