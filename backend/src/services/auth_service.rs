//! Authentication service.
//!
//! Issues session tokens, resolves them back to a user id, and loads the
//! caller's current role. Tokens carry only the user id; permissions are
//! always read from the store.

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{check_expiry_days, Config};
use crate::error::{AppError, Result, TokenProblem};
use crate::models::permission::Permission;
use crate::models::role::{Role, RoleRef};
use crate::models::user::{NewUser, User};
use crate::store::Store;

const MIN_PASSWORD_LEN: usize = 6;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// User profile with the permissions of its current role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Option<RoleRef>,
    pub permissions: Vec<String>,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: UserProfile,
}

/// A self-registration request.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Role name; the configured default role is used when absent
    pub role: Option<String>,
}

/// The caller as loaded from the store on this request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub role: Option<Role>,
}

impl Principal {
    pub fn grants(&self, permission: Permission) -> bool {
        self.role.as_ref().is_some_and(|r| r.grants(permission))
    }

    pub fn permissions(&self) -> Vec<String> {
        self.role
            .as_ref()
            .map(|r| r.permissions.clone())
            .unwrap_or_default()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.user.id,
            email: self.user.email.clone(),
            name: self.user.name.clone(),
            role: self.role.as_ref().map(RoleRef::from),
            permissions: self.permissions(),
        }
    }
}

/// Authentication service
pub struct AuthService {
    store: Arc<dyn Store>,
    config: Arc<Config>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        let secret = config.jwt_secret.clone();
        Self {
            store,
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Authenticate with email and password.
    ///
    /// Unknown email and wrong password fail with the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
        let user = self
            .store
            .find_user_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let principal = self.principal_for(user).await?;
        let (token, expires_in) = self.issue_token(principal.user.id)?;
        tracing::info!(user_id = principal.user.id, "User logged in");

        Ok(Session {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: principal.profile(),
        })
    }

    /// Sign a token for the user. Returns the token and its lifetime in seconds.
    pub fn issue_token(&self, user_id: i64) -> Result<(String, u64)> {
        let now = Utc::now();
        let lifetime = Duration::days(check_expiry_days(self.config.jwt_expiry_days)?);
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))?;

        Ok((token, lifetime.num_seconds().max(0) as u64))
    }

    /// Decode a token into the user id it was issued for.
    pub fn resolve_session(&self, token: &str) -> Result<i64> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|e| {
                tracing::debug!("Rejected session token: {}", e);
                AppError::Unauthenticated(TokenProblem::Invalid)
            })
    }

    /// Load the user and its current role.
    ///
    /// A token whose user has since been deleted is treated as invalid.
    pub async fn load_principal(&self, user_id: i64) -> Result<Principal> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AppError::Unauthenticated(TokenProblem::Invalid))?;
        self.principal_for(user).await
    }

    async fn principal_for(&self, user: User) -> Result<Principal> {
        let role = match user.role_id {
            Some(role_id) => self.store.get_role(role_id).await?,
            None => None,
        };
        Ok(Principal { user, role })
    }

    /// Fresh profile for an authenticated caller.
    pub async fn current_user(&self, user_id: i64) -> Result<UserProfile> {
        Ok(self.load_principal(user_id).await?.profile())
    }

    /// Public self-registration.
    pub async fn register(&self, registration: Registration) -> Result<UserProfile> {
        let name = registration.name.trim().to_string();
        let email = registration.email.trim().to_string();
        validate_name(&name)?;
        validate_email(&email)?;
        validate_password(&registration.password)?;

        let role = match registration.role.as_deref().map(str::trim) {
            Some(role_name) if !role_name.is_empty() => Some(
                self.store
                    .find_role_by_name(role_name)
                    .await?
                    .ok_or_else(|| AppError::UnknownRole(role_name.to_string()))?,
            ),
            _ => {
                let default = self
                    .store
                    .find_role_by_name(&self.config.default_role)
                    .await?;
                if default.is_none() {
                    tracing::warn!(
                        role = %self.config.default_role,
                        "Default role missing; registering user without a role"
                    );
                }
                default
            }
        };

        let user = self
            .store
            .insert_user(NewUser {
                email,
                name,
                password_hash: Self::hash_password(&registration.password)?,
                role_id: role.as_ref().map(|r| r.id),
            })
            .await?;
        tracing::info!(user_id = user.id, "User registered");

        Ok(Principal { user, role }.profile())
    }

    /// Hash a password
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        match verify(password, hash) {
            Ok(matches) => Ok(matches),
            // A stored value that is not a bcrypt hash can never match.
            Err(bcrypt::BcryptError::InvalidHash(_)) => Ok(false),
            Err(e) => Err(AppError::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::NewRole;
    use crate::store::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Config::for_memory("unit-test-secret")),
        )
    }

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = AuthService::hash_password(password).unwrap();
        assert!(AuthService::verify_password(password, &hash).unwrap());
        assert!(!AuthService::verify_password("wrong_password", &hash).unwrap());
        assert!(!AuthService::verify_password(password, "not-a-hash").unwrap());
    }

    #[test]
    fn test_token_round_trip() {
        let svc = service();
        let (token, expires_in) = svc.issue_token(42).unwrap();
        assert_eq!(expires_in, 7 * 24 * 3600);
        assert_eq!(svc.resolve_session(&token).unwrap(), 42);
    }

    #[test]
    fn test_out_of_range_lifetime_is_a_config_error() {
        let mut config = Config::for_memory("unit-test-secret");
        config.jwt_expiry_days = 1_000_000_000_000;
        let svc = AuthService::new(Arc::new(MemoryStore::new()), Arc::new(config));
        assert!(matches!(svc.issue_token(1), Err(AppError::Config(_))));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Config::for_memory("another-secret")),
        );
        let (token, _) = other.issue_token(1).unwrap();
        assert!(matches!(
            service().resolve_session(&token),
            Err(AppError::Unauthenticated(TokenProblem::Invalid))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &svc.encoding_key).unwrap();
        assert!(svc.resolve_session(&token).is_err());
    }

    #[tokio::test]
    async fn test_register_uses_default_role_when_present() {
        let svc = service();
        svc.store
            .insert_role(NewRole {
                name: "worker".into(),
                label: "Worker".into(),
                description: String::new(),
                permissions: vec!["dashboard.view".into()],
                is_system: false,
            })
            .await
            .unwrap();

        let profile = svc
            .register(Registration {
                name: "Ann".into(),
                email: "ann@example.com".into(),
                password: "secret1".into(),
                role: None,
            })
            .await
            .unwrap();
        assert_eq!(profile.role.unwrap().name, "worker");
        assert_eq!(profile.permissions, vec!["dashboard.view".to_string()]);
    }

    #[tokio::test]
    async fn test_register_without_default_role_leaves_role_empty() {
        let profile = service()
            .register(Registration {
                name: "Bob".into(),
                email: "bob@example.com".into(),
                password: "secret1".into(),
                role: None,
            })
            .await
            .unwrap();
        assert!(profile.role.is_none());
        assert!(profile.permissions.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_role_and_short_password() {
        let svc = service();
        let err = svc
            .register(Registration {
                name: "Cy".into(),
                email: "cy@example.com".into(),
                password: "secret1".into(),
                role: Some("overlord".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownRole(name) if name == "overlord"));

        let err = svc
            .register(Registration {
                name: "Cy".into(),
                email: "cy@example.com".into(),
                password: "12345".into(),
                role: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let svc = service();
        svc.register(Registration {
            name: "Dee".into(),
            email: "dee@example.com".into(),
            password: "correct-horse".into(),
            role: None,
        })
        .await
        .unwrap();

        let unknown = svc.authenticate("nobody@example.com", "whatever").await;
        let wrong = svc.authenticate("dee@example.com", "wrong-horse").await;
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

        let session = svc
            .authenticate("dee@example.com", "correct-horse")
            .await
            .unwrap();
        assert_eq!(session.token_type, "Bearer");
        assert_eq!(svc.resolve_session(&session.token).unwrap(), session.user.id);
    }
}
