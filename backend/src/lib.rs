//! CrewDesk - Backend Library
//!
//! Personnel, warehouse and task tracking behind role-based permissions.

#[macro_use]
mod macros;

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
