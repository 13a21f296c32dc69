//! `SeaORM` implementation of the `DecisionService` trait.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::db::{EvaluateOutcome, Store};
use crate::domain::{DecisionId, SortOrder};
use crate::models::decision::{
    Decision, DecisionInput, DecisionListQuery, DecisionPage, DecisionStatus, EvaluationRefusal,
    OrderField,
};
use crate::models::user::Principal;
use crate::services::decision_service::{
    DecisionError, DecisionPayload, DecisionService, EvaluationPayload, ListParams,
};
use crate::services::permissions::{require_admin, require_authenticated};
use crate::services::validation::{FieldErrors, NULL, REQUIRED, required_text};

pub const TITLE_MAX_LEN: usize = 200;

pub struct SeaOrmDecisionService {
    store: Store,
    page_size: u64,
}

impl SeaOrmDecisionService {
    #[must_use]
    pub const fn new(store: Store, page_size: u64) -> Self {
        Self { store, page_size }
    }

    async fn find(&self, id: DecisionId) -> Result<Decision, DecisionError> {
        self.store
            .get_decision(id)
            .await?
            .ok_or(DecisionError::NotFound(id))
    }
}

/// Validates a create/update body. `current_status` is used when the body
/// leaves status out.
pub fn validate_decision_payload(
    payload: &DecisionPayload,
    current_status: DecisionStatus,
) -> Result<DecisionInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = required_text(
        &mut errors,
        "title",
        payload.title.as_deref(),
        Some(TITLE_MAX_LEN),
    );
    let description = required_text(
        &mut errors,
        "description",
        payload.description.as_deref(),
        None,
    );
    let measurable_goal = required_text(
        &mut errors,
        "measurable_goal",
        payload.measurable_goal.as_deref(),
        None,
    );

    let status = match payload.status.as_deref() {
        None => Some(current_status),
        Some(raw) => match raw.parse::<DecisionStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                errors.add("status", e.to_string());
                None
            }
        },
    };

    match (title, description, measurable_goal, status) {
        (Some(title), Some(description), Some(measurable_goal), Some(status))
            if errors.is_empty() =>
        {
            Ok(DecisionInput {
                title,
                description,
                measurable_goal,
                status,
            })
        }
        _ => Err(errors),
    }
}

/// `goal_met` is required. `comments` may be left out but not sent as null.
pub fn validate_evaluation_payload(
    payload: EvaluationPayload,
) -> Result<(bool, String), FieldErrors> {
    let mut errors = FieldErrors::new();

    let goal_met = match payload.goal_met {
        None => {
            errors.add("goal_met", REQUIRED);
            None
        }
        Some(None) => {
            errors.add("goal_met", NULL);
            None
        }
        Some(goal_met) => goal_met,
    };

    let comments = match payload.comments {
        None => Some(String::new()),
        Some(None) => {
            errors.add("comments", NULL);
            None
        }
        Some(comments) => comments,
    };

    match (goal_met, comments) {
        (Some(goal_met), Some(comments)) if errors.is_empty() => Ok((goal_met, comments)),
        _ => Err(errors),
    }
}

/// Turns raw query parameters into a list query plus the requested page.
pub fn parse_list_params(
    params: &ListParams,
) -> Result<(DecisionListQuery, u64), DecisionError> {
    let page = match params.page.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(raw) => match raw.parse::<u64>() {
            Ok(page) if page >= 1 => page,
            _ => return Err(DecisionError::InvalidPage),
        },
    };

    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<DecisionStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                let mut errors = FieldErrors::new();
                errors.add("status", e.to_string());
                return Err(DecisionError::Validation(errors));
            }
        },
    };

    let search_terms = params
        .search
        .as_deref()
        .unwrap_or_default()
        .replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect();

    // Unknown ordering fields are dropped rather than rejected.
    let ordering = params
        .ordering
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (name, direction) = term
                .strip_prefix('-')
                .map_or((term, SortOrder::Ascending), |name| {
                    (name, SortOrder::Descending)
                });
            name.parse::<OrderField>().ok().map(|field| (field, direction))
        })
        .collect();

    Ok((
        DecisionListQuery {
            status,
            search_terms,
            ordering,
        },
        page,
    ))
}

#[async_trait]
impl DecisionService for SeaOrmDecisionService {
    async fn list(
        &self,
        _principal: &Principal,
        params: ListParams,
    ) -> Result<DecisionPage, DecisionError> {
        let (query, page) = parse_list_params(&params)?;

        let result = self
            .store
            .list_decisions(&query, page, self.page_size)
            .await?;

        // An empty first page is still a valid page.
        if page > result.num_pages.max(1) {
            return Err(DecisionError::InvalidPage);
        }

        Ok(result)
    }

    async fn get(&self, _principal: &Principal, id: DecisionId) -> Result<Decision, DecisionError> {
        self.find(id).await
    }

    async fn create(
        &self,
        principal: &Principal,
        payload: DecisionPayload,
    ) -> Result<Decision, DecisionError> {
        let user = require_authenticated(principal)?;
        let input = validate_decision_payload(&payload, DecisionStatus::default())?;

        let decision = self.store.create_decision(input).await?;

        info!(
            decision_id = %decision.id,
            user = %user.username,
            status = %decision.status,
            "Decision created"
        );

        Ok(decision)
    }

    async fn update(
        &self,
        principal: &Principal,
        id: DecisionId,
        payload: DecisionPayload,
    ) -> Result<Decision, DecisionError> {
        let user = require_authenticated(principal)?;
        let current = self.find(id).await?;
        let input = validate_decision_payload(&payload, current.status)?;

        let outcome = self
            .store
            .replace_decision(id, input)
            .await?
            .ok_or(DecisionError::NotFound(id))?;

        if outcome.evaluation_invalidated {
            info!(
                decision_id = %id,
                user = %user.username,
                "Evaluation invalidated by decision update"
            );
            metrics::counter!("evaluations_invalidated_total").increment(1);
        } else {
            debug!(decision_id = %id, "Decision updated");
        }

        Ok(outcome.decision)
    }

    async fn delete(&self, principal: &Principal, id: DecisionId) -> Result<(), DecisionError> {
        let user = require_authenticated(principal)?;

        if !self.store.delete_decision(id).await? {
            return Err(DecisionError::NotFound(id));
        }

        info!(decision_id = %id, user = %user.username, "Decision deleted");
        Ok(())
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        id: DecisionId,
        payload: EvaluationPayload,
    ) -> Result<Decision, DecisionError> {
        let admin = require_admin(principal)?;

        // Eligibility is reported before payload problems.
        let current = self.find(id).await?;
        EvaluationRefusal::check(current.status, current.evaluation.is_some())
            .map_err(DecisionError::Refused)?;

        let (goal_met, comments) =
            validate_evaluation_payload(payload).map_err(DecisionError::Validation)?;

        match self.store.evaluate_decision(id, goal_met, comments).await? {
            EvaluateOutcome::Evaluated(decision) => {
                info!(
                    decision_id = %id,
                    admin = %admin.username,
                    goal_met,
                    "Decision evaluated"
                );
                metrics::counter!("decisions_evaluated_total").increment(1);
                Ok(decision)
            }
            EvaluateOutcome::Refused(refusal) => Err(DecisionError::Refused(refusal)),
            EvaluateOutcome::NotFound => Err(DecisionError::NotFound(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(
        goal_met: Option<Option<bool>>,
        comments: Option<Option<&str>>,
    ) -> EvaluationPayload {
        EvaluationPayload {
            goal_met,
            comments: comments.map(|c| c.map(str::to_string)),
        }
    }

    #[test]
    fn evaluation_comments_default_to_empty() {
        let (goal_met, comments) =
            validate_evaluation_payload(evaluation(Some(Some(true)), None)).unwrap();
        assert!(goal_met);
        assert_eq!(comments, "");
    }

    #[test]
    fn evaluation_rejects_null_fields() {
        let errors =
            validate_evaluation_payload(evaluation(Some(Some(false)), Some(None))).unwrap_err();
        assert_eq!(errors.messages("comments"), [NULL]);
        assert!(!errors.has("goal_met"));

        let errors =
            validate_evaluation_payload(evaluation(Some(None), Some(Some("x")))).unwrap_err();
        assert_eq!(errors.messages("goal_met"), [NULL]);

        let errors = validate_evaluation_payload(evaluation(None, Some(None))).unwrap_err();
        assert_eq!(errors.messages("goal_met"), [REQUIRED]);
        assert_eq!(errors.messages("comments"), [NULL]);
    }

    fn payload(status: Option<&str>) -> DecisionPayload {
        DecisionPayload {
            title: Some("Test Decision".to_string()),
            description: Some("This is a test decision".to_string()),
            measurable_goal: Some("Increase revenue by 10%".to_string()),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn missing_status_falls_back_to_current() {
        let input = validate_decision_payload(&payload(None), DecisionStatus::Pending).unwrap();
        assert_eq!(input.status, DecisionStatus::Pending);

        let input = validate_decision_payload(&payload(None), DecisionStatus::Completed).unwrap();
        assert_eq!(input.status, DecisionStatus::Completed);
    }

    #[test]
    fn unknown_status_is_a_field_error() {
        let errors =
            validate_decision_payload(&payload(Some("Done")), DecisionStatus::Pending).unwrap_err();
        assert_eq!(errors.messages("status"), ["\"Done\" is not a valid choice."]);
    }

    #[test]
    fn every_missing_field_is_reported() {
        let errors =
            validate_decision_payload(&DecisionPayload::default(), DecisionStatus::Pending)
                .unwrap_err();
        for field in ["title", "description", "measurable_goal"] {
            assert_eq!(errors.messages(field), [REQUIRED]);
        }
        assert!(!errors.has("status"));
    }

    #[test]
    fn list_params_defaults() {
        let (query, page) = parse_list_params(&ListParams::default()).unwrap();
        assert_eq!(page, 1);
        assert!(query.status.is_none());
        assert!(query.search_terms.is_empty());
        assert!(query.ordering.is_empty());
    }

    #[test]
    fn list_params_parse_ordering_and_search() {
        let params = ListParams {
            status: Some("Completed".to_string()),
            search: Some("revenue, growth  q3".to_string()),
            ordering: Some("-status,bogus,title".to_string()),
            page: Some("2".to_string()),
        };
        let (query, page) = parse_list_params(&params).unwrap();
        assert_eq!(page, 2);
        assert_eq!(query.status, Some(DecisionStatus::Completed));
        assert_eq!(query.search_terms, ["revenue", "growth", "q3"]);
        assert_eq!(
            query.ordering,
            [
                (OrderField::Status, SortOrder::Descending),
                (OrderField::Title, SortOrder::Ascending)
            ]
        );
    }

    #[test]
    fn list_params_reject_bad_page_and_status() {
        for raw in ["0", "-1", "abc"] {
            let params = ListParams {
                page: Some(raw.to_string()),
                ..ListParams::default()
            };
            assert!(matches!(
                parse_list_params(&params),
                Err(DecisionError::InvalidPage)
            ));
        }

        let params = ListParams {
            status: Some("Archived".to_string()),
            ..ListParams::default()
        };
        assert!(matches!(
            parse_list_params(&params),
            Err(DecisionError::Validation(_))
        ));
    }
}
