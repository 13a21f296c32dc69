use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::models::user::Principal;
use crate::services::auth_service::{AuthError, AuthResult, LoginRequest, RegisterRequest};
use crate::services::validation::FieldErrors;

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::InvalidFields(errors),
            AuthError::InvalidCredentials | AuthError::AccountDisabled => {
                Self::InvalidFields(FieldErrors::non_field(err.to_string()))
            }
            AuthError::InvalidToken | AuthError::InactiveUser => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Token accepted in the `Authorization` header, under either keyword.
const TOKEN_KEYWORDS: [&str; 2] = ["token", "bearer"];

/// Pulls the token out of `Authorization: Token <key>` (or `Bearer <key>`).
///
/// Headers using some other scheme are ignored and the caller stays
/// anonymous; a recognised keyword with a malformed value is an error.
fn extract_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid token header.".to_string()))?;

    let mut parts = value.split_whitespace();
    let Some(keyword) = parts.next() else {
        return Ok(None);
    };
    if !TOKEN_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(keyword))
    {
        return Ok(None);
    }

    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key.to_string())),
        (None, _) => Err(ApiError::Unauthorized(
            "Invalid token header. No credentials provided.".to_string(),
        )),
        (Some(_), Some(_)) => Err(ApiError::Unauthorized(
            "Invalid token header. Token string should not contain spaces.".to_string(),
        )),
    }
}

/// Resolves the caller of every decision route.
///
/// Requests without a token continue as [`Principal::Anonymous`]; whether
/// that is enough is up to the operation. A token that does not resolve to
/// an active user is rejected here, before any handler runs.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match extract_token(&headers)? {
        Some(key) => {
            let user = state.auth_service().authenticate(&key).await?;
            tracing::Span::current().record("user_id", user.username.as_str());
            Principal::User(user)
        }
        None => Principal::Anonymous,
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /authentication/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResult>), ApiError> {
    let Json(request) = payload?;
    let result = state.auth_service().register(request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /authentication/login
/// Exchanges a username and password for the user's token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let result = state.auth_service().login(request).await?;
    Ok(Json(result))
}
