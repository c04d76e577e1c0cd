//! Typed HTTP client for the CrewDesk API.
//!
//! Every authenticated call takes the caller's [`Credential`] explicitly.
//! The client itself holds no session state, so one `ApiClient` can serve
//! several signed-in users at once.

pub mod navigation;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::material::Material;
use crate::models::role::Role;
use crate::models::task::TaskDetail;
use crate::services::auth_service::{Session, UserProfile};
use crate::services::dashboard_service::DashboardSummary;
use crate::services::personnel_service::PersonnelRecord;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors returned by [`ApiClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status} ({code}): {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
        count: Option<i64>,
    },

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// Error code reported by the server, if this is an API error.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the server rejected the credential itself.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

/// Bearer token obtained from [`ApiClient::login`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl From<&Session> for Credential {
    fn from(session: &Session) -> Self {
        Self(session.token.clone())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Self-registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterBody {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    count: Option<i64>,
}

#[derive(Deserialize)]
struct MessageBody {
    #[allow(dead_code)]
    message: String,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, credential: Option<&Credential>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match credential {
            Some(credential) => builder.bearer_auth(credential.token()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let error = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => ClientError::Api {
                status,
                code: body.code,
                message: body.message,
                count: body.count,
            },
            Err(_) => ClientError::Api {
                status,
                code: status.canonical_reason().unwrap_or("UNKNOWN").to_string(),
                message: text,
                count: None,
            },
        };
        tracing::debug!(%status, error = %error, "API call failed");
        Err(error)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, credential: &Credential) -> Result<T, ClientError> {
        self.send(self.request(Method::GET, path, Some(credential))).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        credential: &Credential,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(Method::POST, path, Some(credential)).json(body))
            .await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        credential: &Credential,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(Method::PUT, path, Some(credential)).json(body))
            .await
    }

    async fn delete(&self, path: &str, credential: &Credential) -> Result<(), ClientError> {
        let _: MessageBody = self
            .send(self.request(Method::DELETE, path, Some(credential)))
            .await?;
        Ok(())
    }

    // ---- session ----

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        self.send(
            self.request(Method::POST, "/auth/login", None)
                .json(&LoginBody { email, password }),
        )
        .await
    }

    pub async fn register(&self, body: &RegisterBody) -> Result<UserProfile, ClientError> {
        self.send(self.request(Method::POST, "/auth/register", None).json(body))
            .await
    }

    pub async fn me(&self, credential: &Credential) -> Result<UserProfile, ClientError> {
        self.get("/auth/me", credential).await
    }

    pub async fn dashboard(&self, credential: &Credential) -> Result<DashboardSummary, ClientError> {
        self.get("/dashboard", credential).await
    }

    // ---- roles ----

    pub async fn list_roles(&self, credential: &Credential) -> Result<Vec<Role>, ClientError> {
        self.get("/roles", credential).await
    }

    pub async fn get_role(&self, credential: &Credential, id: i64) -> Result<Role, ClientError> {
        self.get(&format!("/roles/{}", id), credential).await
    }

    pub async fn create_role<B: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        body: &B,
    ) -> Result<Role, ClientError> {
        self.post("/roles", credential, body).await
    }

    pub async fn update_role<B: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        id: i64,
        body: &B,
    ) -> Result<Role, ClientError> {
        self.put(&format!("/roles/{}", id), credential, body).await
    }

    pub async fn delete_role(&self, credential: &Credential, id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/roles/{}", id), credential).await
    }

    // ---- personnel ----

    pub async fn list_personnel(
        &self,
        credential: &Credential,
    ) -> Result<Vec<PersonnelRecord>, ClientError> {
        self.get("/personnel", credential).await
    }

    pub async fn get_personnel(
        &self,
        credential: &Credential,
        id: i64,
    ) -> Result<PersonnelRecord, ClientError> {
        self.get(&format!("/personnel/{}", id), credential).await
    }

    pub async fn create_personnel<B: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        body: &B,
    ) -> Result<PersonnelRecord, ClientError> {
        self.post("/personnel", credential, body).await
    }

    pub async fn update_personnel<B: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        id: i64,
        body: &B,
    ) -> Result<PersonnelRecord, ClientError> {
        self.put(&format!("/personnel/{}", id), credential, body).await
    }

    pub async fn delete_personnel(&self, credential: &Credential, id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/personnel/{}", id), credential).await
    }

    // ---- materials ----

    pub async fn list_materials(&self, credential: &Credential) -> Result<Vec<Material>, ClientError> {
        self.get("/materials", credential).await
    }

    pub async fn get_material(&self, credential: &Credential, id: i64) -> Result<Material, ClientError> {
        self.get(&format!("/materials/{}", id), credential).await
    }

    pub async fn create_material<B: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        body: &B,
    ) -> Result<Material, ClientError> {
        self.post("/materials", credential, body).await
    }

    pub async fn update_material<B: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        id: i64,
        body: &B,
    ) -> Result<Material, ClientError> {
        self.put(&format!("/materials/{}", id), credential, body).await
    }

    pub async fn delete_material(&self, credential: &Credential, id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/materials/{}", id), credential).await
    }

    // ---- tasks ----

    /// List tasks, optionally filtered by assignee and status.
    pub async fn list_tasks(
        &self,
        credential: &Credential,
        user_id: Option<i64>,
        status: Option<&str>,
    ) -> Result<Vec<TaskDetail>, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(user_id) = user_id {
            query.push(("user_id", user_id.to_string()));
        }
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        self.send(
            self.request(Method::GET, "/tasks", Some(credential))
                .query(&query),
        )
        .await
    }

    pub async fn get_task(&self, credential: &Credential, id: i64) -> Result<TaskDetail, ClientError> {
        self.get(&format!("/tasks/{}", id), credential).await
    }

    pub async fn create_task<B: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        body: &B,
    ) -> Result<TaskDetail, ClientError> {
        self.post("/tasks", credential, body).await
    }

    pub async fn update_task<B: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        id: i64,
        body: &B,
    ) -> Result<TaskDetail, ClientError> {
        self.put(&format!("/tasks/{}", id), credential, body).await
    }

    pub async fn delete_task(&self, credential: &Credential, id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/tasks/{}", id), credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/roles/3"), "http://localhost:8080/api/roles/3");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = ApiClient::new("localhost:8080").err().unwrap();
        assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("eyJ"));
        assert_eq!(credential.token(), "eyJhbGciOiJIUzI1NiJ9.payload.sig");
    }

    #[test]
    fn test_each_request_carries_only_its_own_credential() {
        let client = ApiClient::new("http://localhost:8080").unwrap();
        let alice = Credential::new("alice-token");
        let bob = Credential::new("bob-token");

        let first = client
            .request(Method::GET, "/auth/me", Some(&alice))
            .build()
            .unwrap();
        let second = client
            .request(Method::GET, "/auth/me", Some(&bob))
            .build()
            .unwrap();
        let anonymous = client
            .request(Method::POST, "/auth/login", None)
            .build()
            .unwrap();

        assert_eq!(first.headers()["authorization"], "Bearer alice-token");
        assert_eq!(second.headers()["authorization"], "Bearer bob-token");
        assert!(anonymous.headers().get("authorization").is_none());
    }

    #[test]
    fn test_api_error_helpers() {
        let err = ClientError::Api {
            status: StatusCode::UNAUTHORIZED,
            code: "TOKEN_INVALID".into(),
            message: "Invalid token".into(),
            count: None,
        };
        assert!(err.is_unauthenticated());
        assert_eq!(err.code(), Some("TOKEN_INVALID"));
    }
}
