//! Common test utilities for router tests
//!
//! Builds the full application router on the in-memory store, seeded the
//! same way the server seeds itself on first boot, and drives it with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crewdesk_backend::api::{routes, AppState};
use crewdesk_backend::bootstrap;
use crewdesk_backend::config::Config;
use crewdesk_backend::store::{MemoryStore, Store};

use fixtures::TestUser;

pub const JWT_SECRET: &str = "router-test-secret";

/// A seeded application plus a signed-in administrator.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn Store>,
    pub admin_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build the app after adjusting the default test configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let admin = TestUser::admin();
        let mut config = Config::for_memory(JWT_SECRET);
        config.admin_email = admin.email.clone();
        config.admin_password = Some(admin.password.clone());
        adjust(&mut config);

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        bootstrap::provision(store.clone(), &config)
            .await
            .expect("bootstrap failed");

        let state = Arc::new(AppState::new(config, store.clone()));
        let router = routes::create_router(state);

        let mut app = Self {
            router,
            store,
            admin_token: String::new(),
        };
        app.admin_token = app.login(&admin.email, &admin.password).await;
        app
    }

    /// Send a request and return the status and parsed JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    /// Send a prebuilt request.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Log in and return the bearer token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Create a role through the API as the administrator and return its id.
    pub async fn create_role(&self, name: &str, permissions: &[&str]) -> i64 {
        let (status, body) = self
            .post(
                "/api/roles",
                &self.admin_token,
                json!({ "name": name, "label": name, "permissions": permissions }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "role create failed: {body}");
        body["id"].as_i64().unwrap()
    }

    /// Create a user with the given role name and return its id.
    pub async fn create_user(&self, user: &TestUser, role: Option<&str>) -> i64 {
        let (status, body) = self
            .post(
                "/api/personnel",
                &self.admin_token,
                json!({
                    "name": user.name,
                    "email": user.email,
                    "password": user.password,
                    "role": role,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "user create failed: {body}");
        body["id"].as_i64().unwrap()
    }

    /// Create a user with the given role and return a token for them.
    pub async fn user_token(&self, user: &TestUser, role: Option<&str>) -> String {
        self.create_user(user, role).await;
        self.login(&user.email, &user.password).await
    }

    pub async fn role_id(&self, name: &str) -> i64 {
        self.store
            .find_role_by_name(name)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("role {name} missing"))
            .id
    }
}
