//! Material (warehouse stock) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Material entity
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit: String,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
}
