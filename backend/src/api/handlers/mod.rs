//! HTTP request handlers.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod materials;
pub mod personnel;
pub mod roles;
pub mod tasks;
