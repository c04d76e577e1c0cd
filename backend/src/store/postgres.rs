//! PostgreSQL store backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{Store, StoreCounts};
use crate::error::{AppError, Result};
use crate::models::material::{Material, MaterialChanges, NewMaterial};
use crate::models::role::{NewRole, Role, RoleChanges};
use crate::models::task::{NewTask, Task, TaskChanges, TaskDetail, TaskFilter, TaskStatus};
use crate::models::user::{NewUser, User, UserChanges, UserSummary};

const USER_COLUMNS: &str = "id, email, name, password_hash, role_id, created_at, updated_at";
const ROLE_COLUMNS: &str =
    "id, name, label, description, permissions, is_system, created_at, updated_at";
const MATERIAL_COLUMNS: &str = "id, name, description, quantity, unit, created_at, updated_at";

const TASK_DETAIL_SELECT: &str = r#"
    SELECT
        t.id, t.title, t.description, t.status, t.deadline, t.user_id, t.material_id,
        t.created_at, t.updated_at,
        u.name AS user_name, u.email AS user_email,
        m.name AS material_name, m.description AS material_description,
        m.quantity AS material_quantity, m.unit AS material_unit,
        m.created_at AS material_created_at, m.updated_at AS material_updated_at
    FROM tasks t
    JOIN users u ON u.id = t.user_id
    LEFT JOIN materials m ON m.id = t.material_id
"#;

/// Flat row produced by [`TASK_DETAIL_SELECT`].
#[derive(Debug, FromRow)]
struct TaskJoinRow {
    #[sqlx(flatten)]
    task: Task,
    user_name: String,
    user_email: String,
    material_name: Option<String>,
    material_description: Option<String>,
    material_quantity: Option<i32>,
    material_unit: Option<String>,
    material_created_at: Option<DateTime<Utc>>,
    material_updated_at: Option<DateTime<Utc>>,
}

impl From<TaskJoinRow> for TaskDetail {
    fn from(row: TaskJoinRow) -> Self {
        let user = UserSummary {
            id: row.task.user_id,
            name: row.user_name,
            email: row.user_email,
        };
        let material = match (
            row.task.material_id,
            row.material_name,
            row.material_quantity,
            row.material_unit,
            row.material_created_at,
            row.material_updated_at,
        ) {
            (Some(id), Some(name), Some(quantity), Some(unit), Some(created_at), Some(updated_at)) => {
                Some(Material {
                    id,
                    name,
                    description: row.material_description,
                    quantity,
                    unit,
                    created_at,
                    updated_at,
                })
            }
            _ => None,
        };
        TaskDetail::from_parts(row.task, Some(user), material)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_foreign_key_violation())
        .unwrap_or(false)
}

/// Postgres store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, role_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("Email already exists")
            } else if is_foreign_key_violation(&e) {
                AppError::UnknownRole(format!("role id {:?}", user.role_id))
            } else {
                AppError::from(e)
            }
        })?;
        Ok(user)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                password_hash = COALESCE($4, password_hash),
                role_id = COALESCE($5, role_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.name)
        .bind(&changes.password_hash)
        .bind(changes.role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("Email already exists")
            } else if is_foreign_key_violation(&e) {
                AppError::UnknownRole(format!("role id {:?}", changes.role_id))
            } else {
                AppError::from(e)
            }
        })?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::conflict("User still has assigned tasks")
                } else {
                    AppError::from(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users_with_role(&self, role_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn get_role(&self, id: i64) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn insert_role(&self, role: NewRole) -> Result<Role> {
        let created = sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (name, label, description, permissions, is_system)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(&role.name)
        .bind(&role.label)
        .bind(&role.description)
        .bind(&role.permissions)
        .bind(role.is_system)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateName(role.name.clone())
            } else {
                AppError::from(e)
            }
        })?;
        Ok(created)
    }

    async fn update_role(&self, id: i64, changes: RoleChanges) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE roles
            SET
                label = COALESCE($2, label),
                description = COALESCE($3, description),
                permissions = COALESCE($4, permissions),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.label)
        .bind(&changes.description)
        .bind(&changes.permissions)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn delete_role(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                // A user was assigned between the usage check and the delete.
                if is_foreign_key_violation(&e) {
                    AppError::conflict("Role is assigned to users")
                } else {
                    AppError::from(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_materials(&self) -> Result<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }

    async fn get_material(&self, id: i64) -> Result<Option<Material>> {
        let material = sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(material)
    }

    async fn insert_material(&self, material: NewMaterial) -> Result<Material> {
        let material = sqlx::query_as::<_, Material>(&format!(
            r#"
            INSERT INTO materials (name, description, quantity, unit)
            VALUES ($1, $2, $3, $4)
            RETURNING {MATERIAL_COLUMNS}
            "#
        ))
        .bind(&material.name)
        .bind(&material.description)
        .bind(material.quantity)
        .bind(&material.unit)
        .fetch_one(&self.pool)
        .await?;
        Ok(material)
    }

    async fn update_material(
        &self,
        id: i64,
        changes: MaterialChanges,
    ) -> Result<Option<Material>> {
        let (set_description, description) = split_nullable(changes.description);
        let material = sqlx::query_as::<_, Material>(&format!(
            r#"
            UPDATE materials
            SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                quantity = COALESCE($5, quantity),
                unit = COALESCE($6, unit),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MATERIAL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(set_description)
        .bind(description)
        .bind(changes.quantity)
        .bind(&changes.unit)
        .fetch_optional(&self.pool)
        .await?;
        Ok(material)
    }

    async fn delete_material(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<TaskDetail>> {
        let rows = sqlx::query_as::<_, TaskJoinRow>(&format!(
            r#"
            {TASK_DETAIL_SELECT}
            WHERE ($1::bigint IS NULL OR t.user_id = $1)
              AND ($2::text IS NULL OR t.status = $2)
            ORDER BY t.id
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TaskDetail::from).collect())
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskDetail>> {
        let row = sqlx::query_as::<_, TaskJoinRow>(&format!(
            "{TASK_DETAIL_SELECT} WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TaskDetail::from))
    }

    async fn insert_task(&self, task: NewTask) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO tasks (title, description, status, deadline, user_id, material_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.deadline)
        .bind(task.user_id)
        .bind(task.material_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::InvalidReference("Assignee or material does not exist".into())
            } else {
                AppError::from(e)
            }
        })?;
        Ok(id)
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> Result<bool> {
        let (set_description, description) = split_nullable(changes.description);
        let (set_deadline, deadline) = split_nullable(changes.deadline);
        let (set_material, material_id) = split_nullable(changes.material_id);

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                status = COALESCE($5, status),
                deadline = CASE WHEN $6 THEN $7 ELSE deadline END,
                user_id = COALESCE($8, user_id),
                material_id = CASE WHEN $9 THEN $10 ELSE material_id END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(set_description)
        .bind(description)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(set_deadline)
        .bind(deadline)
        .bind(changes.user_id)
        .bind(set_material)
        .bind(material_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::InvalidReference("Assignee or material does not exist".into())
            } else {
                AppError::from(e)
            }
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_tasks_for_user(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let (users, roles, materials, tasks): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM roles),
                (SELECT COUNT(*) FROM materials),
                (SELECT COUNT(*) FROM tasks)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut tasks_by_status = std::collections::HashMap::new();
        for (status, count) in by_status {
            let status: TaskStatus = status.parse()?;
            tasks_by_status.insert(status, count);
        }

        Ok(StoreCounts {
            users,
            roles,
            materials,
            tasks,
            tasks_by_status,
        })
    }
}

/// Split a tri-state change into the "set" flag and the new value.
fn split_nullable<T>(change: Option<Option<T>>) -> (bool, Option<T>) {
    match change {
        Some(value) => (true, value),
        None => (false, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_nullable() {
        assert_eq!(split_nullable::<i64>(None), (false, None));
        assert_eq!(split_nullable::<i64>(Some(None)), (true, None));
        assert_eq!(split_nullable(Some(Some(5))), (true, Some(5)));
    }
}
