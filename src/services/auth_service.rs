//! Domain service for registration, login and token authentication.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::user::User;
use crate::services::validation::FieldErrors;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Unable to login with provided credentials.")]
    InvalidCredentials,

    #[error("User account is disabled.")]
    AccountDisabled,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("User inactive or deleted.")]
    InactiveUser,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Registration payload. Every field is optional here so that missing
/// ones are reported alongside the other validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A user's token together with their public profile.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub auth_token: String,
    pub user: User,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a user and issues their token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for malformed, weak, mismatched or
    /// already-taken credentials.
    async fn register(&self, request: RegisterRequest) -> Result<AuthResult, AuthError>;

    /// Verifies credentials and returns the user's token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] or [`AuthError::AccountDisabled`].
    async fn login(&self, request: LoginRequest) -> Result<AuthResult, AuthError>;

    /// Returns the user's token, creating it on first use.
    async fn get_or_create_token(&self, user: &User) -> Result<String, AuthError>;

    /// Resolves a presented token to an active user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] or [`AuthError::InactiveUser`].
    async fn authenticate(&self, token: &str) -> Result<User, AuthError>;
}
