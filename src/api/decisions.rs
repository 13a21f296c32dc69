//! Decision API endpoints.
//!
//! Handlers resolve the path and body, then hand the caller's
//! [`Principal`] to [`DecisionService`](crate::services::DecisionService).
//! Role guards also run here first, so an anonymous caller with a broken
//! body is told to authenticate.

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode, Uri, header},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::domain::DecisionId;
use crate::models::decision::{Decision, DecisionPage};
use crate::models::user::Principal;
use crate::services::decision_service::{
    DecisionError, DecisionPayload, EvaluationPayload, ListParams,
};
use crate::services::permissions::{require_admin, require_authenticated};

impl From<DecisionError> for ApiError {
    fn from(err: DecisionError) -> Self {
        match err {
            DecisionError::NotFound(id) => Self::not_found("Decision", id),
            DecisionError::InvalidPage => Self::NotFound(err.to_string()),
            DecisionError::Validation(errors) => Self::InvalidFields(errors),
            DecisionError::Refused(refusal) => Self::validation(refusal.to_string()),
            DecisionError::Permission(err) => err.into(),
            DecisionError::Database(msg) => Self::DatabaseError(msg),
            DecisionError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Scheme the client used, as reported by a TLS-terminating proxy.
fn scheme(headers: &HeaderMap) -> &'static str {
    let forwarded = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);

    match forwarded {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    }
}

/// Link to `page` of the same listing, keeping every other query parameter.
fn page_link(headers: &HeaderMap, uri: &Uri, page: u64) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some("page"))
        .map(str::to_string)
        .collect();

    if page > 1 {
        params.push(format!("page={page}"));
    }

    let base = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|host| format!("{}://{host}{}", scheme(headers), uri.path()))
        .unwrap_or_else(|| uri.path().to_string());

    if params.is_empty() {
        base
    } else {
        format!("{base}?{}", params.join("&"))
    }
}

fn to_page_response(
    page: DecisionPage,
    headers: &HeaderMap,
    uri: &Uri,
) -> PageResponse<Decision> {
    let next = (page.page < page.num_pages).then(|| page_link(headers, uri, page.page + 1));
    let previous = (page.page > 1).then(|| page_link(headers, uri, page.page - 1));

    PageResponse {
        count: page.total,
        next,
        previous,
        results: page.items,
    }
}

/// Ids that are not integers name no decision.
fn decision_id(path: Result<Path<i32>, PathRejection>) -> Result<DecisionId, ApiError> {
    path.map(|Path(id)| DecisionId::new(id))
        .map_err(|_| ApiError::NotFound("Not found.".to_string()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = payload?;
    Ok(value)
}

/// GET /decisions
pub async fn list_decisions(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<PageResponse<Decision>>, ApiError> {
    let page = state.decision_service().list(&principal, params).await?;
    Ok(Json(to_page_response(page, &headers, &uri)))
}

/// GET /decisions/{id}
pub async fn get_decision(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Decision>, ApiError> {
    let id = decision_id(path)?;
    let decision = state.decision_service().get(&principal, id).await?;
    Ok(Json(decision))
}

/// POST /decisions
pub async fn create_decision(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<DecisionPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Decision>), ApiError> {
    require_authenticated(&principal)?;
    let payload = body(payload)?;

    let decision = state
        .decision_service()
        .create(&principal, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(decision)))
}

/// PUT /decisions/{id}
pub async fn update_decision(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<DecisionPayload>, JsonRejection>,
) -> Result<Json<Decision>, ApiError> {
    require_authenticated(&principal)?;
    let id = decision_id(path)?;
    let payload = body(payload)?;

    let decision = state
        .decision_service()
        .update(&principal, id, payload)
        .await?;
    Ok(Json(decision))
}

/// PATCH /decisions/{id}
///
/// Decisions are only ever replaced as a whole.
pub async fn patch_decision() -> ApiError {
    ApiError::MethodNotAllowed("Method \"PATCH\" not allowed.".to_string())
}

/// DELETE /decisions/{id}
pub async fn delete_decision(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    require_authenticated(&principal)?;
    let id = decision_id(path)?;

    state.decision_service().delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /decisions/{id}/evaluate
pub async fn evaluate_decision(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<EvaluationPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Decision>), ApiError> {
    require_admin(&principal)?;
    let id = decision_id(path)?;

    let payload = body(payload)?;

    let decision = state
        .decision_service()
        .evaluate(&principal, id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(decision)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn host() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("testserver"));
        headers
    }

    #[test]
    fn link_to_first_page_drops_page_param() {
        let uri: Uri = "/decisions?page=2&status=Pending".parse().unwrap();
        assert_eq!(
            page_link(&host(), &uri, 1),
            "http://testserver/decisions?status=Pending"
        );
    }

    #[test]
    fn link_keeps_other_params_and_sets_page() {
        let uri: Uri = "/decisions?search=rev&ordering=-title".parse().unwrap();
        assert_eq!(
            page_link(&host(), &uri, 3),
            "http://testserver/decisions?search=rev&ordering=-title&page=3"
        );
    }

    #[test]
    fn link_follows_forwarded_proto() {
        let uri: Uri = "/decisions?page=1".parse().unwrap();
        let mut headers = host();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            page_link(&headers, &uri, 2),
            "https://testserver/decisions?page=2"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS, http"));
        assert!(page_link(&headers, &uri, 2).starts_with("https://"));

        headers.insert("x-forwarded-proto", HeaderValue::from_static("gopher"));
        assert!(page_link(&headers, &uri, 2).starts_with("http://"));
    }

    #[test]
    fn link_without_host_is_relative() {
        let uri: Uri = "/decisions".parse().unwrap();
        assert_eq!(page_link(&HeaderMap::new(), &uri, 2), "/decisions?page=2");
    }

    #[test]
    fn page_bounds_decide_neighbours() {
        let uri: Uri = "/decisions".parse().unwrap();
        let page = |n| DecisionPage {
            page: n,
            items: vec![],
            total: 25,
            num_pages: 3,
        };

        let first = to_page_response(page(1), &HeaderMap::new(), &uri);
        assert!(first.previous.is_none());
        assert_eq!(first.next.as_deref(), Some("/decisions?page=2"));

        let last = to_page_response(page(3), &HeaderMap::new(), &uri);
        assert!(last.next.is_none());
        assert_eq!(last.previous.as_deref(), Some("/decisions?page=2"));
        assert_eq!(last.count, 25);
    }

    #[test]
    fn refusals_are_plain_validation_errors() {
        let err = ApiError::from(DecisionError::Refused(
            crate::models::decision::EvaluationRefusal::NotCompleted,
        ));
        assert!(matches!(
            err,
            ApiError::ValidationError(msg) if msg == "Only completed decisions can be evaluated."
        ));
    }
}
