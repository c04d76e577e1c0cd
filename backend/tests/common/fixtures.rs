//! Test fixtures and data factories for router tests

#![allow(dead_code)]

use serde_json::{json, Value};

/// Test user credentials
pub struct TestUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl TestUser {
    pub fn admin() -> Self {
        Self {
            name: "Administrator".to_string(),
            email: "admin@test.local".to_string(),
            password: "admin-pass-123".to_string(),
        }
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            email: format!("{}@test.local", name.to_lowercase()),
            password: "password123".to_string(),
        }
    }
}

pub fn material(name: &str, quantity: i32) -> Value {
    json!({
        "name": name,
        "description": format!("{} for tests", name),
        "quantity": quantity,
        "unit": "kg",
    })
}

pub fn task(title: &str, user_id: i64) -> Value {
    json!({
        "title": title,
        "userId": user_id,
    })
}
