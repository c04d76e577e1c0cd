//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::services::auth_service::AuthService;
use crate::store::Store;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let config = Arc::new(config);
        let auth = Arc::new(AuthService::new(store.clone(), config.clone()));
        Self {
            config,
            store,
            auth,
        }
    }
}

pub type SharedState = Arc<AppState>;
