//! Dashboard summary.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Result;
use crate::models::task::TaskStatus;
use crate::store::Store;

/// Headline counts shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub personnel: i64,
    pub roles: i64,
    pub materials: i64,
    pub tasks: i64,
    /// Task count per status; every status is present
    pub tasks_by_status: BTreeMap<String, i64>,
}

pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn summary(&self) -> Result<DashboardSummary> {
        let counts = self.store.counts().await?;
        let tasks_by_status = TaskStatus::ALL
            .into_iter()
            .map(|status| {
                let n = counts.tasks_by_status.get(&status).copied().unwrap_or(0);
                (status.as_str().to_string(), n)
            })
            .collect();

        Ok(DashboardSummary {
            personnel: counts.users,
            roles: counts.roles,
            materials: counts.materials,
            tasks: counts.tasks,
            tasks_by_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::NewTask;
    use crate::models::user::NewUser;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_summary_lists_every_status() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                email: "d@example.com".into(),
                name: "D".into(),
                password_hash: "x".into(),
                role_id: None,
            })
            .await
            .unwrap();
        store
            .insert_task(NewTask {
                title: "Check doors".into(),
                description: None,
                status: TaskStatus::InProgress,
                deadline: None,
                user_id: user.id,
                material_id: None,
            })
            .await
            .unwrap();

        let summary = DashboardService::new(store).summary().await.unwrap();
        assert_eq!(summary.personnel, 1);
        assert_eq!(summary.tasks, 1);
        assert_eq!(summary.tasks_by_status["in_progress"], 1);
        assert_eq!(summary.tasks_by_status["pending"], 0);
        assert_eq!(summary.tasks_by_status["completed"], 0);
    }
}
