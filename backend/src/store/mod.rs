//! Persistence backends.
//!
//! Services talk to a [`Store`]; the Postgres backend is used in production,
//! the in-memory backend for local runs and tests.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::material::{Material, MaterialChanges, NewMaterial};
use crate::models::role::{NewRole, Role, RoleChanges};
use crate::models::task::{NewTask, TaskChanges, TaskDetail, TaskFilter, TaskStatus};
use crate::models::user::{NewUser, User, UserChanges};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Row counts used by the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreCounts {
    pub users: i64,
    pub roles: i64,
    pub materials: i64,
    pub tasks: i64,
    pub tasks_by_status: HashMap<TaskStatus, i64>,
}

/// Store trait.
///
/// Every method is a single statement against the backend. Uniqueness
/// violations surface as `Conflict` (users) or `DuplicateName` (roles).
#[async_trait]
pub trait Store: Send + Sync {
    /// Check the backend is reachable
    async fn ping(&self) -> Result<()>;

    // Users

    async fn list_users(&self) -> Result<Vec<User>>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn insert_user(&self, user: NewUser) -> Result<User>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>>;
    /// Returns false when no such user exists
    async fn delete_user(&self, id: i64) -> Result<bool>;
    async fn count_users_with_role(&self, role_id: i64) -> Result<i64>;

    // Roles

    /// All roles ordered by id
    async fn list_roles(&self) -> Result<Vec<Role>>;
    async fn get_role(&self, id: i64) -> Result<Option<Role>>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;
    async fn insert_role(&self, role: NewRole) -> Result<Role>;
    async fn update_role(&self, id: i64, changes: RoleChanges) -> Result<Option<Role>>;
    async fn delete_role(&self, id: i64) -> Result<bool>;

    // Materials

    async fn list_materials(&self) -> Result<Vec<Material>>;
    async fn get_material(&self, id: i64) -> Result<Option<Material>>;
    async fn insert_material(&self, material: NewMaterial) -> Result<Material>;
    async fn update_material(&self, id: i64, changes: MaterialChanges)
        -> Result<Option<Material>>;
    /// Tasks pointing at the material lose their reference
    async fn delete_material(&self, id: i64) -> Result<bool>;

    // Tasks

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<TaskDetail>>;
    async fn get_task(&self, id: i64) -> Result<Option<TaskDetail>>;
    /// Returns the new task id
    async fn insert_task(&self, task: NewTask) -> Result<i64>;
    /// Returns false when no such task exists
    async fn update_task(&self, id: i64, changes: TaskChanges) -> Result<bool>;
    async fn delete_task(&self, id: i64) -> Result<bool>;
    async fn count_tasks_for_user(&self, user_id: i64) -> Result<i64>;

    async fn counts(&self) -> Result<StoreCounts>;
}
