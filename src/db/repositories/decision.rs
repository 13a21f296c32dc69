use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};

use crate::domain::DecisionId;
use crate::entities::{decisions, evaluations, prelude::*};
use crate::models::decision::{
    Decision, DecisionInput, DecisionListQuery, DecisionPage, DecisionStatus, EvaluationRefusal,
    GoalState, OrderField,
};

const LIKE_ESCAPE: char = '\\';

/// Escape `LIKE` wildcards so user input is matched literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn substring_pattern(term: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(term))).escape(LIKE_ESCAPE)
}

/// Result of a full replacement.
#[derive(Debug)]
pub struct ReplaceOutcome {
    pub decision: Decision,
    /// Whether an existing evaluation was deleted by the update.
    pub evaluation_invalidated: bool,
}

#[derive(Debug)]
pub enum EvaluateOutcome {
    Evaluated(Decision),
    Refused(EvaluationRefusal),
    NotFound,
}

pub struct DecisionRepository {
    conn: DatabaseConnection,
}

impl DecisionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Fetch one page (1-based). Pages past the end come back empty.
    pub async fn list(
        &self,
        query: &DecisionListQuery,
        page: u64,
        page_size: u64,
    ) -> Result<DecisionPage> {
        let mut select = Decisions::find().find_also_related(Evaluations);

        if let Some(status) = query.status {
            select = select.filter(decisions::Column::Status.eq(status.as_str()));
        }

        if !query.search_terms.is_empty() {
            let mut all = Condition::all();
            for term in &query.search_terms {
                all = all.add(
                    Condition::any()
                        .add(
                            Expr::col((Decisions, decisions::Column::Title))
                                .like(substring_pattern(term)),
                        )
                        .add(
                            Expr::col((Decisions, decisions::Column::MeasurableGoal))
                                .like(substring_pattern(term)),
                        ),
                );
            }
            select = select.filter(all);
        }

        if query.ordering.is_empty() {
            select = select.order_by(decisions::Column::Title, Order::Asc);
        }
        for (field, direction) in &query.ordering {
            let column = match field {
                OrderField::Title => decisions::Column::Title,
                OrderField::Status => decisions::Column::Status,
            };
            let order = if direction.is_ascending() {
                Order::Asc
            } else {
                Order::Desc
            };
            select = select.order_by(column, order);
        }
        select = select.order_by(decisions::Column::Id, Order::Asc);

        let paginator = select.paginate(&self.conn, page_size);
        let counts = paginator
            .num_items_and_pages()
            .await
            .context("Failed to count decisions")?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch decision page")?;

        let items = rows
            .into_iter()
            .map(|(decision, evaluation)| Decision::from_models(decision, evaluation))
            .collect::<Result<Vec<_>>>()?;

        Ok(DecisionPage {
            page,
            items,
            total: counts.number_of_items,
            num_pages: counts.number_of_pages,
        })
    }

    pub async fn get(&self, id: DecisionId) -> Result<Option<Decision>> {
        let row = Decisions::find_by_id(id.value())
            .find_also_related(Evaluations)
            .one(&self.conn)
            .await
            .context("Failed to query decision")?;

        row.map(|(decision, evaluation)| Decision::from_models(decision, evaluation))
            .transpose()
    }

    pub async fn create(&self, input: DecisionInput) -> Result<Decision> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = decisions::ActiveModel {
            title: Set(input.title),
            description: Set(input.description),
            measurable_goal: Set(input.measurable_goal),
            status: Set(input.status.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert decision")?;

        Decision::from_models(model, None)
    }

    /// Overwrite every editable field, then drop the evaluation when the
    /// change voids it. Both writes share one transaction.
    pub async fn replace(
        &self,
        id: DecisionId,
        input: DecisionInput,
    ) -> Result<Option<ReplaceOutcome>> {
        let txn = self.conn.begin().await?;

        let Some(existing) = Decisions::find_by_id(id.value()).one(&txn).await? else {
            return Ok(None);
        };

        let before_status: DecisionStatus = existing.status.parse()?;
        let before_goal = existing.measurable_goal.clone();

        let mut active: decisions::ActiveModel = existing.into();
        active.title = Set(input.title);
        active.description = Set(input.description);
        active.measurable_goal = Set(input.measurable_goal);
        active.status = Set(input.status.as_str().to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let updated = active.update(&txn).await?;

        let before = GoalState {
            status: before_status,
            measurable_goal: &before_goal,
        };
        let after = GoalState {
            status: input.status,
            measurable_goal: &updated.measurable_goal,
        };

        let mut evaluation_invalidated = false;
        if before.invalidates_evaluation(&after) {
            let deleted = Evaluations::delete_many()
                .filter(evaluations::Column::DecisionId.eq(id.value()))
                .exec(&txn)
                .await?;
            evaluation_invalidated = deleted.rows_affected > 0;
        }

        let evaluation = Evaluations::find()
            .filter(evaluations::Column::DecisionId.eq(id.value()))
            .one(&txn)
            .await?;

        txn.commit().await?;

        Ok(Some(ReplaceOutcome {
            decision: Decision::from_models(updated, evaluation)?,
            evaluation_invalidated,
        }))
    }

    /// Returns false if no such decision existed.
    pub async fn delete(&self, id: DecisionId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        Evaluations::delete_many()
            .filter(evaluations::Column::DecisionId.eq(id.value()))
            .exec(&txn)
            .await?;

        let result = Decisions::delete_by_id(id.value()).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// Record an evaluation if the decision is eligible for one.
    pub async fn evaluate(
        &self,
        id: DecisionId,
        goal_met: bool,
        comments: String,
    ) -> Result<EvaluateOutcome> {
        let txn = self.conn.begin().await?;

        let Some((decision, existing)) = Decisions::find_by_id(id.value())
            .find_also_related(Evaluations)
            .one(&txn)
            .await?
        else {
            return Ok(EvaluateOutcome::NotFound);
        };

        let status: DecisionStatus = decision.status.parse()?;
        if let Err(refusal) = EvaluationRefusal::check(status, existing.is_some()) {
            return Ok(EvaluateOutcome::Refused(refusal));
        }

        let inserted = evaluations::ActiveModel {
            decision_id: Set(id.value()),
            goal_met: Set(goal_met),
            comments: Set(comments),
            evaluated_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let evaluation = match inserted {
            Ok(evaluation) => evaluation,
            // The unique index on decision_id rejected a concurrent second evaluation.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Ok(EvaluateOutcome::Refused(
                    EvaluationRefusal::AlreadyEvaluated,
                ));
            }
            Err(e) => return Err(e).context("Failed to insert evaluation"),
        };

        txn.commit().await?;

        Ok(EvaluateOutcome::Evaluated(Decision::from_models(
            decision,
            Some(evaluation),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_leaves_plain_text_alone() {
        assert_eq!(escape_like("Alpha hiring"), "Alpha hiring");
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }
}
