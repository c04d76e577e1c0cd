//! In-memory store.
//!
//! Mirrors the Postgres schema constraints (unique email, unique role name,
//! restrict on referenced users, set-null on deleted materials) so the API
//! behaves the same against either backend.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Store, StoreCounts};
use crate::error::{AppError, Result};
use crate::models::material::{Material, MaterialChanges, NewMaterial};
use crate::models::role::{NewRole, Role, RoleChanges};
use crate::models::task::{NewTask, Task, TaskChanges, TaskDetail, TaskFilter};
use crate::models::user::{NewUser, User, UserChanges, UserSummary};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, Role>,
    materials: BTreeMap<i64, Material>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_role_id: i64,
    next_material_id: i64,
    next_task_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn detail(&self, task: &Task) -> TaskDetail {
        let user = self.users.get(&task.user_id).map(UserSummary::from);
        let material = task
            .material_id
            .and_then(|id| self.materials.get(&id))
            .cloned();
        TaskDetail::from_parts(task.clone(), user, material)
    }

    fn check_task_references(&self, user_id: i64, material_id: Option<i64>) -> Result<()> {
        if !self.users.contains_key(&user_id) {
            return Err(AppError::InvalidReference(
                "Assignee or material does not exist".into(),
            ));
        }
        if let Some(material_id) = material_id {
            if !self.materials.contains_key(&material_id) {
                return Err(AppError::InvalidReference(
                    "Assignee or material does not exist".into(),
                ));
            }
        }
        Ok(())
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::conflict("Email already exists"));
        }
        if let Some(role_id) = user.role_id {
            if !tables.roles.contains_key(&role_id) {
                return Err(AppError::UnknownRole(format!("role id {}", role_id)));
            }
        }

        let now = Utc::now();
        let id = next_id(&mut tables.next_user_id);
        let user = User {
            id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role_id: user.role_id,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email {
            if tables.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::conflict("Email already exists"));
            }
        }
        if let Some(role_id) = changes.role_id {
            if !tables.roles.contains_key(&role_id) {
                return Err(AppError::UnknownRole(format!("role id {}", role_id)));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role_id) = changes.role_id {
            user.role_id = Some(role_id);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.tasks.values().any(|t| t.user_id == id) {
            return Err(AppError::conflict("User still has assigned tasks"));
        }
        Ok(tables.users.remove(&id).is_some())
    }

    async fn count_users_with_role(&self, role_id: i64) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.role_id == Some(role_id))
            .count() as i64)
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.tables.read().await.roles.values().cloned().collect())
    }

    async fn get_role(&self, id: i64) -> Result<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().find(|r| r.name == name).cloned())
    }

    async fn insert_role(&self, role: NewRole) -> Result<Role> {
        let mut tables = self.tables.write().await;
        if tables.roles.values().any(|r| r.name == role.name) {
            return Err(AppError::DuplicateName(role.name));
        }

        let now = Utc::now();
        let id = next_id(&mut tables.next_role_id);
        let role = Role {
            id,
            name: role.name,
            label: role.label,
            description: role.description,
            permissions: role.permissions,
            is_system: role.is_system,
            created_at: now,
            updated_at: now,
        };
        tables.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: i64, changes: RoleChanges) -> Result<Option<Role>> {
        let mut tables = self.tables.write().await;
        let Some(role) = tables.roles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(label) = changes.label {
            role.label = label;
        }
        if let Some(description) = changes.description {
            role.description = description;
        }
        if let Some(permissions) = changes.permissions {
            role.permissions = permissions;
        }
        role.updated_at = Utc::now();
        Ok(Some(role.clone()))
    }

    async fn delete_role(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.role_id == Some(id)) {
            return Err(AppError::conflict("Role is assigned to users"));
        }
        Ok(tables.roles.remove(&id).is_some())
    }

    async fn list_materials(&self) -> Result<Vec<Material>> {
        Ok(self.tables.read().await.materials.values().cloned().collect())
    }

    async fn get_material(&self, id: i64) -> Result<Option<Material>> {
        Ok(self.tables.read().await.materials.get(&id).cloned())
    }

    async fn insert_material(&self, material: NewMaterial) -> Result<Material> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let id = next_id(&mut tables.next_material_id);
        let material = Material {
            id,
            name: material.name,
            description: material.description,
            quantity: material.quantity,
            unit: material.unit,
            created_at: now,
            updated_at: now,
        };
        tables.materials.insert(id, material.clone());
        Ok(material)
    }

    async fn update_material(
        &self,
        id: i64,
        changes: MaterialChanges,
    ) -> Result<Option<Material>> {
        let mut tables = self.tables.write().await;
        let Some(material) = tables.materials.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            material.name = name;
        }
        if let Some(description) = changes.description {
            material.description = description;
        }
        if let Some(quantity) = changes.quantity {
            material.quantity = quantity;
        }
        if let Some(unit) = changes.unit {
            material.unit = unit;
        }
        material.updated_at = Utc::now();
        Ok(Some(material.clone()))
    }

    async fn delete_material(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.materials.remove(&id).is_none() {
            return Ok(false);
        }
        for task in tables.tasks.values_mut() {
            if task.material_id == Some(id) {
                task.material_id = None;
            }
        }
        Ok(true)
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<TaskDetail>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|t| filter.user_id.map_or(true, |id| t.user_id == id))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .map(|t| tables.detail(t))
            .collect())
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskDetail>> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.get(&id).map(|t| tables.detail(t)))
    }

    async fn insert_task(&self, task: NewTask) -> Result<i64> {
        let mut tables = self.tables.write().await;
        tables.check_task_references(task.user_id, task.material_id)?;

        let now = Utc::now();
        let id = next_id(&mut tables.next_task_id);
        tables.tasks.insert(
            id,
            Task {
                id,
                title: task.title,
                description: task.description,
                status: task.status,
                deadline: task.deadline,
                user_id: task.user_id,
                material_id: task.material_id,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.tasks.get(&id) else {
            return Ok(false);
        };
        let user_id = changes.user_id.unwrap_or(current.user_id);
        let material_id = changes.material_id.unwrap_or(current.material_id);
        tables.check_task_references(user_id, material_id)?;

        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(deadline) = changes.deadline {
            task.deadline = deadline;
        }
        task.user_id = user_id;
        task.material_id = material_id;
        task.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_task(&self, id: i64) -> Result<bool> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn count_tasks_for_user(&self, user_id: i64) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.values().filter(|t| t.user_id == user_id).count() as i64)
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let tables = self.tables.read().await;
        let mut tasks_by_status = HashMap::new();
        for task in tables.tasks.values() {
            *tasks_by_status.entry(task.status).or_insert(0) += 1;
        }
        Ok(StoreCounts {
            users: tables.users.len() as i64,
            roles: tables.roles.len() as i64,
            materials: tables.materials.len() as i64,
            tasks: tables.tasks.len() as i64,
            tasks_by_status,
        })
    }
}
