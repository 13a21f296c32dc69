//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tokio::task;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{CreateUserOutcome, Store};
use crate::db::repositories::user::hash_password;
use crate::models::user::{NewUser, User};
use crate::services::auth_service::{
    AuthError, AuthResult, AuthService, LoginRequest, RegisterRequest,
};
use crate::services::password_policy::check_password;
use crate::services::validation::{
    self, BLANK, FieldErrors, NOT_UNIQUE, REQUIRED, required_text,
};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    /// Runs every registration check and returns the cleaned fields.
    async fn validate_registration(
        &self,
        request: &RegisterRequest,
    ) -> Result<(String, String, String), AuthError> {
        let mut errors = FieldErrors::new();

        let username = required_text(&mut errors, "username", request.username.as_deref(), None);
        if let Some(name) = &username {
            if !validation::is_valid_username(name) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters, and be at most 150 characters long.",
                );
            } else if self.store.username_exists(name).await? {
                errors.add("username", NOT_UNIQUE);
            }
        }

        let email = required_text(&mut errors, "email", request.email.as_deref(), None);
        if let Some(address) = &email {
            if !validation::is_valid_email(address) {
                errors.add("email", "Enter a valid email address.");
            } else if self.store.email_exists(address).await? {
                errors.add("email", NOT_UNIQUE);
            }
        }

        // Passwords are compared verbatim, never trimmed.
        let password = match request.password.as_deref() {
            None => {
                errors.add("password", REQUIRED);
                None
            }
            Some("") => {
                errors.add("password", BLANK);
                None
            }
            Some(password) => {
                for problem in check_password(
                    password,
                    username.as_deref().unwrap_or_default(),
                    email.as_deref().unwrap_or_default(),
                    self.security.password_min_length,
                ) {
                    errors.add("password", problem);
                }
                Some(password.to_string())
            }
        };

        if request.confirm_password.is_none() {
            errors.add("confirm_password", REQUIRED);
        }

        // The match check only runs once the individual fields are valid.
        if errors.is_empty() && request.password != request.confirm_password {
            errors.add(validation::NON_FIELD_ERRORS, "Those passwords don't match.");
        }

        errors.into_result()?;

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) => Ok((username, email, password)),
            _ => Err(AuthError::Internal(
                "registration fields missing after validation".to_string(),
            )),
        }
    }

    async fn issue(&self, user: User) -> Result<AuthResult, AuthError> {
        let auth_token = self.get_or_create_token(&user).await?;
        Ok(AuthResult { auth_token, user })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<AuthResult, AuthError> {
        let (username, email, password) = self.validate_registration(&request).await?;

        let security = self.security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task panicked: {e}")))??;

        let outcome = self
            .store
            .create_user(NewUser {
                username,
                email,
                password_hash,
                admin: request.admin,
            })
            .await?;

        let user = match outcome {
            CreateUserOutcome::Created(user) => user,
            CreateUserOutcome::UsernameTaken => {
                return Err(FieldErrors::single("username", NOT_UNIQUE).into());
            }
            CreateUserOutcome::EmailTaken => {
                return Err(FieldErrors::single("email", NOT_UNIQUE).into());
            }
        };

        info!(
            username = %user.username,
            admin = user.is_staff,
            "User registered"
        );
        metrics::counter!("users_registered_total").increment(1);

        self.issue(user).await
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthResult, AuthError> {
        let mut errors = FieldErrors::new();
        let username = required_text(&mut errors, "username", request.username.as_deref(), None);
        let password = match request.password.as_deref() {
            None => {
                errors.add("password", REQUIRED);
                None
            }
            Some("") => {
                errors.add("password", BLANK);
                None
            }
            Some(password) => Some(password),
        };
        errors.into_result()?;

        let (Some(username), Some(password)) = (username, password) else {
            return Err(AuthError::InvalidCredentials);
        };

        let user = self
            .store
            .verify_user_password(&username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        info!(username = %user.username, "User logged in");

        self.issue(user).await
    }

    async fn get_or_create_token(&self, user: &User) -> Result<String, AuthError> {
        Ok(self.store.get_or_create_token(user.id.value()).await?)
    }

    async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .get_user_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }

        Ok(user)
    }
}
