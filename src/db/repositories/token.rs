use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use crate::entities::{auth_tokens, prelude::*};
use crate::models::user::User;

pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_for_user(&self, user_id: i32) -> Result<Option<String>> {
        let token = AuthTokens::find()
            .filter(auth_tokens::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query token for user")?;

        Ok(token.map(|t| t.key))
    }

    /// Return the user's token, creating it on first use.
    ///
    /// `user_id` is unique, so when two callers race the loser's insert
    /// fails and it reads back the winner's key.
    pub async fn get_or_create(&self, user_id: i32) -> Result<String> {
        if let Some(key) = self.get_for_user(user_id).await? {
            return Ok(key);
        }

        let key = generate_token();
        let insert = AuthTokens::insert(auth_tokens::ActiveModel {
            key: Set(key.clone()),
            user_id: Set(user_id),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        })
        .exec(&self.conn)
        .await;

        match insert {
            Ok(_) => Ok(key),
            Err(e) => {
                debug!("Token insert for user {} lost a race: {}", user_id, e);
                self.get_for_user(user_id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("Failed to create token: {e}"))
            }
        }
    }

    /// Resolve a presented token to its owner.
    pub async fn find_user(&self, key: &str) -> Result<Option<User>> {
        let found = AuthTokens::find_by_id(key.to_string())
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query user by token")?;

        Ok(found.and_then(|(_, user)| user).map(User::from))
    }
}

/// Generate a random token (40 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 20] = rng.random();

    bytes.iter().fold(String::with_capacity(40), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_forty_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
