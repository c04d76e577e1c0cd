//! Task service.
//!
//! Browser forms submit ids as strings and deadlines as bare dates, so input
//! is coerced here before it reaches the store.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::task::{NewTask, TaskChanges, TaskDetail, TaskFilter, TaskStatus};
use crate::store::Store;

/// A reference to another row as sent by clients: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IdRef {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

impl IdRef {
    /// `Ok(None)` for an empty string.
    pub fn resolve(&self, field: &str) -> Result<Option<i64>> {
        match self {
            IdRef::Number(id) => Ok(Some(*id)),
            IdRef::Text(text) if text.trim().is_empty() => Ok(None),
            IdRef::Text(text) => text.trim().parse().map(Some).map_err(|_| {
                AppError::InvalidReference(format!("{} '{}' is not a valid id", field, text))
            }),
            IdRef::Other(value) => Err(AppError::InvalidReference(format!(
                "{} {} is not a valid id",
                field, value
            ))),
        }
    }
}

impl From<i64> for IdRef {
    fn from(id: i64) -> Self {
        IdRef::Number(id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<String>,
    pub user_id: Option<IdRef>,
    pub material_id: Option<IdRef>,
}

/// Absent fields are left unchanged; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub deadline: Option<Option<String>>,
    pub user_id: Option<IdRef>,
    pub material_id: Option<Option<IdRef>>,
}

/// Task service
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: Option<i64>, status: Option<&str>) -> Result<Vec<TaskDetail>> {
        let status = status
            .filter(|s| !s.is_empty())
            .map(str::parse::<TaskStatus>)
            .transpose()?;
        self.store.list_tasks(TaskFilter { user_id, status }).await
    }

    pub async fn get(&self, id: i64) -> Result<TaskDetail> {
        self.store
            .get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))
    }

    pub async fn create(&self, input: CreateTask) -> Result<TaskDetail> {
        let title = validate_title(&input.title)?;
        let status = input
            .status
            .as_deref()
            .map(str::parse::<TaskStatus>)
            .transpose()?
            .unwrap_or_default();
        let deadline = match input.deadline.as_deref() {
            Some(raw) => parse_deadline(raw)?,
            None => None,
        };
        let user_id = match &input.user_id {
            Some(id) => id.resolve("userId")?,
            None => None,
        }
        .ok_or_else(|| AppError::Validation("Task assignee (userId) is required".into()))?;
        let material_id = match &input.material_id {
            Some(id) => id.resolve("materialId")?,
            None => None,
        };

        self.check_references(Some(user_id), material_id).await?;

        let id = self
            .store
            .insert_task(NewTask {
                title,
                description: input.description.filter(|d| !d.trim().is_empty()),
                status,
                deadline,
                user_id,
                material_id,
            })
            .await?;

        tracing::info!(task_id = id, user_id, "Task created");
        self.get(id).await
    }

    pub async fn update(&self, id: i64, input: UpdateTask) -> Result<TaskDetail> {
        let user_id = match &input.user_id {
            Some(id) => Some(id.resolve("userId")?.ok_or_else(|| {
                AppError::Validation("Task assignee (userId) cannot be cleared".into())
            })?),
            None => None,
        };
        let material_id = match &input.material_id {
            Some(Some(id)) => Some(id.resolve("materialId")?),
            Some(None) => Some(None),
            None => None,
        };
        let deadline = match &input.deadline {
            Some(Some(raw)) => Some(parse_deadline(raw)?),
            Some(None) => Some(None),
            None => None,
        };

        let changes = TaskChanges {
            title: input.title.as_deref().map(validate_title).transpose()?,
            description: input
                .description
                .map(|d| d.filter(|d| !d.trim().is_empty())),
            status: input
                .status
                .as_deref()
                .map(str::parse::<TaskStatus>)
                .transpose()?,
            deadline,
            user_id,
            material_id,
        };

        self.check_references(user_id, material_id.flatten()).await?;

        if !self.store.update_task(id, changes).await? {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }

        tracing::info!(task_id = id, "Task updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.store.delete_task(id).await? {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }
        tracing::info!(task_id = id, "Task deleted");
        Ok(())
    }

    async fn check_references(&self, user_id: Option<i64>, material_id: Option<i64>) -> Result<()> {
        if let Some(user_id) = user_id {
            if self.store.get_user(user_id).await?.is_none() {
                return Err(AppError::InvalidReference(format!(
                    "User {} does not exist",
                    user_id
                )));
            }
        }
        if let Some(material_id) = material_id {
            if self.store.get_material(material_id).await?.is_none() {
                return Err(AppError::InvalidReference(format!(
                    "Material {} does not exist",
                    material_id
                )));
            }
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Task title is required".into()));
    }
    Ok(title.to_string())
}

/// Parse a deadline into a UTC timestamp.
///
/// Accepts a bare date (midnight UTC), an RFC 3339 timestamp, or a
/// zone-less `YYYY-MM-DDTHH:MM[:SS]` read as UTC. Empty input means no deadline.
pub fn parse_deadline(raw: &str) -> Result<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(midnight.and_utc()));
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(ts.and_utc()));
        }
    }

    Err(AppError::Validation(format!("Invalid deadline '{}'", raw)))
}
