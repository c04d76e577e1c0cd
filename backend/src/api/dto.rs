//! Request/response types shared across handlers.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Body returned by every successful delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn deleted() -> Self {
        Self {
            message: "Deleted successfully".to_string(),
        }
    }
}

/// Distinguish an absent field from an explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: absent gives `None`, `null` gives `Some(None)`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
