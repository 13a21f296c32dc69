//! Guard predicates run at the top of every service operation.

use thiserror::Error;

use crate::models::user::{Principal, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("You do not have permission to perform this action.")]
    Forbidden,
}

/// Any signed-in user.
pub fn require_authenticated(principal: &Principal) -> Result<&User, PermissionError> {
    principal.user().ok_or(PermissionError::NotAuthenticated)
}

/// Staff users only. Anonymous callers are told to authenticate rather
/// than refused outright.
pub fn require_admin(principal: &Principal) -> Result<&User, PermissionError> {
    let user = require_authenticated(principal)?;
    if user.is_staff {
        Ok(user)
    } else {
        Err(PermissionError::Forbidden)
    }
}
