//! Business logic services.

pub mod auth_service;
pub mod dashboard_service;
pub mod material_service;
pub mod personnel_service;
pub mod role_service;
pub mod task_service;
