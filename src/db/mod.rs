use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::DecisionId;
use crate::models::decision::{Decision, DecisionInput, DecisionListQuery, DecisionPage};
use crate::models::user::{NewUser, User};

pub mod migrator;
pub mod repositories;

pub use repositories::decision::{EvaluateOutcome, ReplaceOutcome};
pub use repositories::user::CreateUserOutcome;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // An in-memory database lives and dies with its connection, so the
        // pool must keep exactly one open and never recycle it.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    fn decision_repo(&self) -> repositories::decision::DecisionRepository {
        repositories::decision::DecisionRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(&self, new_user: NewUser) -> Result<CreateUserOutcome> {
        self.user_repo().create(new_user).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        self.user_repo().username_exists(username).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        self.user_repo().email_exists(email).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn set_user_active(&self, username: &str, active: bool) -> Result<()> {
        self.user_repo().set_active(username, active).await
    }

    // Tokens

    pub async fn get_or_create_token(&self, user_id: i32) -> Result<String> {
        self.token_repo().get_or_create(user_id).await
    }

    pub async fn get_user_by_token(&self, key: &str) -> Result<Option<User>> {
        self.token_repo().find_user(key).await
    }

    // Decisions

    pub async fn list_decisions(
        &self,
        query: &DecisionListQuery,
        page: u64,
        page_size: u64,
    ) -> Result<DecisionPage> {
        self.decision_repo().list(query, page, page_size).await
    }

    pub async fn get_decision(&self, id: DecisionId) -> Result<Option<Decision>> {
        self.decision_repo().get(id).await
    }

    pub async fn create_decision(&self, input: DecisionInput) -> Result<Decision> {
        self.decision_repo().create(input).await
    }

    pub async fn replace_decision(
        &self,
        id: DecisionId,
        input: DecisionInput,
    ) -> Result<Option<ReplaceOutcome>> {
        self.decision_repo().replace(id, input).await
    }

    pub async fn delete_decision(&self, id: DecisionId) -> Result<bool> {
        self.decision_repo().delete(id).await
    }

    pub async fn evaluate_decision(
        &self,
        id: DecisionId,
        goal_met: bool,
        comments: String,
    ) -> Result<EvaluateOutcome> {
        self.decision_repo().evaluate(id, goal_met, comments).await
    }
}
