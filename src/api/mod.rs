use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{AuthService, DecisionService};
use crate::state::SharedState;
use metrics_exporter_prometheus::PrometheusHandle;

pub mod auth;
pub mod decisions;
mod error;
mod observability;

pub use decisions::PageResponse;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn decision_service(&self) -> &Arc<dyn DecisionService> {
        &self.shared.decision_service
    }
}

pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state
        .config()
        .read()
        .await
        .server
        .cors_allowed_origins
        .clone();

    let decision_routes = create_decision_router(state.clone());

    let api_router = Router::new()
        .merge(decision_routes)
        .route("/authentication/register", post(auth::register))
        .route("/authentication/login", post(auth::login))
        .route("/metrics", get(observability::get_metrics))
        .route("/health", get(observability::health))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    api_router
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

/// Routes that resolve the caller's token before running.
fn create_decision_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/decisions",
            get(decisions::list_decisions).post(decisions::create_decision),
        )
        .route(
            "/decisions/{id}",
            get(decisions::get_decision)
                .put(decisions::update_decision)
                .patch(decisions::patch_decision)
                .delete(decisions::delete_decision),
        )
        .route(
            "/decisions/{id}/evaluate",
            post(decisions::evaluate_decision),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
