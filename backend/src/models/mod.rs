//! Domain models.

pub mod material;
pub mod permission;
pub mod role;
pub mod task;
pub mod user;
