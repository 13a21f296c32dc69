use serde::Serialize;

use crate::domain::UserId;
use crate::entities::users;

/// User data returned from the store (never carries the password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub date_joined: String,
    pub is_superuser: bool,
    #[serde(skip)]
    pub is_staff: bool,
    #[serde(skip)]
    pub is_active: bool,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            username: model.username,
            email: model.email,
            date_joined: model.date_joined,
            is_superuser: model.is_superuser,
            is_staff: model.is_staff,
            is_active: model.is_active,
        }
    }
}

/// Fields for a new user row, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub admin: bool,
}

/// The caller of an operation, as resolved from the request's token.
#[derive(Debug, Clone, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    User(User),
}

impl Principal {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }
}
