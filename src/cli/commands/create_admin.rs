//! Create an administrator from the command line.

use anyhow::Context;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthError, AuthService, RegisterRequest, SeaOrmAuthService};

pub const ADMIN_PASSWORD_ENV: &str = "DECISION_TRACKER_ADMIN_PASSWORD";

pub async fn cmd_create_admin(config: &Config, username: &str, email: &str) -> anyhow::Result<()> {
    let password = std::env::var(ADMIN_PASSWORD_ENV)
        .with_context(|| format!("{ADMIN_PASSWORD_ENV} must be set to the admin's password"))?;

    let store = Store::new(&config.general.database_path).await?;
    let service = SeaOrmAuthService::new(store, config.security.clone());

    let request = RegisterRequest {
        username: Some(username.to_string()),
        email: Some(email.to_string()),
        password: Some(password.clone()),
        confirm_password: Some(password),
        admin: true,
    };

    match service.register(request).await {
        Ok(result) => {
            println!("✓ Created administrator '{}'", result.user.username);
            println!("  Token: {}", result.auth_token);
            Ok(())
        }
        Err(AuthError::Validation(errors)) => {
            anyhow::bail!("Cannot create administrator: {errors}")
        }
        Err(e) => Err(e.into()),
    }
}
