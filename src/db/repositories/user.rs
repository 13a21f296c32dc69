use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, SqlErr,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{prelude::*, users};
use crate::models::user::{NewUser, User};

/// Result of inserting a user.
#[derive(Debug)]
pub enum CreateUserOutcome {
    Created(User),
    UsernameTaken,
    EmailTaken,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a new user. A registration that loses a race for the same
    /// username or email comes back as the matching `*Taken` outcome.
    pub async fn create(&self, new_user: NewUser) -> Result<CreateUserOutcome> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            is_staff: Set(new_user.admin),
            is_superuser: Set(new_user.admin),
            is_active: Set(true),
            date_joined: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(CreateUserOutcome::Created(User::from(model))),
            // SQLite names the violated column: "UNIQUE constraint failed: users.email".
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("email") => {
                    Ok(CreateUserOutcome::EmailTaken)
                }
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(CreateUserOutcome::UsernameTaken),
                _ => Err(e).context("Failed to insert user"),
            },
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let count = Users::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.conn)
            .await
            .context("Failed to check username availability")?;

        Ok(count > 0)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count = Users::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("Failed to check email availability")?;

        Ok(count > 0)
    }

    /// Check a password and return the matching user. Inactive users are
    /// returned too; the caller decides what a disabled account may do.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        Ok(is_valid.then(|| User::from(user)))
    }

    pub async fn set_active(&self, username: &str, active: bool) -> Result<()> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for activation change")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {username}"))?;

        let mut model: users::ActiveModel = user.into();
        model.is_active = Set(active);
        model.update(&self.conn).await?;

        Ok(())
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the argon2 crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Params are read back from the PHC string, so hashes made with any
/// configured cost verify the same way.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
