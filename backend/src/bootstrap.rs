//! First-boot provisioning: the `admin` system role, the default role and
//! the initial administrator account.

use std::sync::Arc;

use rand::Rng;

use crate::config::Config;
use crate::error::Result;
use crate::models::permission::Permission;
use crate::models::role::Role;
use crate::models::user::NewUser;
use crate::services::auth_service::AuthService;
use crate::services::role_service::{CreateRole, RoleService};
use crate::store::Store;

pub const ADMIN_ROLE: &str = "admin";

const GENERATED_PASSWORD_LEN: usize = 20;
const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789!@#$%&*";

/// What provisioning did on this boot.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub admin_role_created: bool,
    pub default_role_created: bool,
    pub admin_user_created: bool,
    /// Set when the admin password was generated rather than configured
    pub generated_password: Option<String>,
}

/// Seed roles and the admin account. Idempotent.
pub async fn provision(store: Arc<dyn Store>, config: &Config) -> Result<BootstrapReport> {
    let roles = RoleService::new(store.clone());
    let mut report = BootstrapReport::default();

    let admin_role = match store.find_role_by_name(ADMIN_ROLE).await? {
        Some(role) => role,
        None => {
            report.admin_role_created = true;
            roles
                .create_system(CreateRole {
                    name: ADMIN_ROLE.to_string(),
                    label: "Administrator".to_string(),
                    description: Some("Full access to every section".to_string()),
                    permissions: Permission::all_strings(),
                })
                .await?
        }
    };

    if config.default_role != ADMIN_ROLE
        && store.find_role_by_name(&config.default_role).await?.is_none()
    {
        roles
            .create(CreateRole {
                name: config.default_role.clone(),
                label: capitalize(&config.default_role),
                description: Some("Default role for self-registered users".to_string()),
                permissions: vec![Permission::DashboardView.to_string()],
            })
            .await?;
        report.default_role_created = true;
    }

    if store.find_user_by_email(&config.admin_email).await?.is_none() {
        report.generated_password = provision_admin_user(&*store, config, &admin_role).await?;
        report.admin_user_created = true;
    }

    Ok(report)
}

async fn provision_admin_user(
    store: &dyn Store,
    config: &Config,
    admin_role: &Role,
) -> Result<Option<String>> {
    let (password, generated) = match &config.admin_password {
        Some(password) => (password.clone(), false),
        None => (generate_password(), true),
    };

    let user = store
        .insert_user(NewUser {
            email: config.admin_email.clone(),
            name: "Administrator".to_string(),
            password_hash: AuthService::hash_password(&password)?,
            role_id: Some(admin_role.id),
        })
        .await?;
    tracing::info!(user_id = user.id, email = %user.email, "Initial admin user created");

    if generated {
        tracing::warn!(
            "\n\
            ===========================================================\n\
            \n\
              Initial admin user created.\n\
            \n\
              Email:     {}\n\
              Password:  {}\n\
            \n\
              Set ADMIN_PASSWORD to choose the password yourself.\n\
            \n\
            ===========================================================",
            config.admin_email,
            password
        );
        return Ok(Some(password));
    }
    Ok(None)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn generate_password() -> String {
    let mut rng = rand::rng();
    (0..GENERATED_PASSWORD_LEN)
        .map(|_| PASSWORD_CHARSET[rng.random_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}
