//! Task model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::material::Material;
use super::user::UserSummary;
use crate::error::AppError;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown task status '{}'", s)))
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Task row as stored.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub user_id: i64,
    pub material_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task with its assignee and material resolved, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskDetail {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "materialId")]
    pub material_id: Option<i64>,
    pub user: Option<UserSummary>,
    pub material: Option<Material>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskDetail {
    pub fn from_parts(task: Task, user: Option<UserSummary>, material: Option<Material>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            deadline: task.deadline,
            user_id: task.user_id,
            material_id: task.material_id,
            user,
            material,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub user_id: i64,
    pub material_id: Option<i64>,
}

/// Mutable task fields. The outer `Option` means "leave unchanged";
/// `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub user_id: Option<i64>,
    pub material_id: Option<Option<i64>>,
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub user_id: Option<i64>,
    pub status: Option<TaskStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }

    #[test]
    fn test_detail_uses_camel_case_references() {
        let now = Utc::now();
        let task = Task {
            id: 1,
            title: "Unload truck".into(),
            description: None,
            status: TaskStatus::InProgress,
            deadline: None,
            user_id: 4,
            material_id: Some(9),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(TaskDetail::from_parts(task, None, None)).unwrap();
        assert_eq!(json["userId"], 4);
        assert_eq!(json["materialId"], 9);
        assert_eq!(json["status"], "in_progress");
        assert!(json.get("user_id").is_none());
    }
}
