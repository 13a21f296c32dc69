//! Domain service for the decision lifecycle.
//!
//! Owns create/read/update/delete of decisions and the evaluation step,
//! including the rule that voids an evaluation when its decision goes back
//! to Pending or its measurable goal changes.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::domain::DecisionId;
use crate::models::decision::{Decision, DecisionPage, EvaluationRefusal};
use crate::models::user::Principal;
use crate::services::permissions::PermissionError;
use crate::services::validation::FieldErrors;

/// Errors specific to decision operations.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("Decision {0} not found")]
    NotFound(DecisionId),

    #[error("Invalid page.")]
    InvalidPage,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    Refused(EvaluationRefusal),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for DecisionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for DecisionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<FieldErrors> for DecisionError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Raw list parameters as they arrive in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
}

/// Body of a create or full update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub measurable_goal: Option<String>,
    pub status: Option<String>,
}

/// Evaluation body. The outer `Option` is `None` when the key is absent and
/// the inner one is `None` for an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationPayload {
    #[serde(default, deserialize_with = "present")]
    pub goal_met: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present")]
    pub comments: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Domain service trait for decisions.
#[async_trait::async_trait]
pub trait DecisionService: Send + Sync {
    /// Lists one page of decisions. Open to anonymous callers.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::InvalidPage`] for a page outside the result
    /// and [`DecisionError::Validation`] for an unknown status filter.
    async fn list(
        &self,
        principal: &Principal,
        params: ListParams,
    ) -> Result<DecisionPage, DecisionError>;

    /// Fetches a single decision. Open to anonymous callers.
    async fn get(&self, principal: &Principal, id: DecisionId) -> Result<Decision, DecisionError>;

    /// Creates a decision; status defaults to Pending.
    async fn create(
        &self,
        principal: &Principal,
        payload: DecisionPayload,
    ) -> Result<Decision, DecisionError>;

    /// Replaces a decision's fields and applies evaluation invalidation.
    async fn update(
        &self,
        principal: &Principal,
        id: DecisionId,
        payload: DecisionPayload,
    ) -> Result<Decision, DecisionError>;

    /// Deletes a decision and its evaluation.
    async fn delete(&self, principal: &Principal, id: DecisionId) -> Result<(), DecisionError>;

    /// Records the administrator's evaluation of a completed decision.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Refused`] when the decision is not completed
    /// or already evaluated.
    async fn evaluate(
        &self,
        principal: &Principal,
        id: DecisionId,
        payload: EvaluationPayload,
    ) -> Result<Decision, DecisionError>;
}
