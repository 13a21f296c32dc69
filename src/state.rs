use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, DecisionService, SeaOrmAuthService, SeaOrmDecisionService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub decision_service: Arc<dyn DecisionService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let decision_service = Arc::new(SeaOrmDecisionService::new(
            store.clone(),
            config.pagination.page_size,
        )) as Arc<dyn DecisionService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            decision_service,
        })
    }
}
