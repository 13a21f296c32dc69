use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{DecisionId, SortOrder};
use crate::entities::{decisions, evaluations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DecisionStatus {
    #[default]
    Pending,
    Completed,
}

impl DecisionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DecisionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            other => Err(anyhow!("\"{other}\" is not a valid choice.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub goal_met: bool,
    pub comments: String,
    pub evaluated_at: String,
}

impl From<evaluations::Model> for Evaluation {
    fn from(model: evaluations::Model) -> Self {
        Self {
            goal_met: model.goal_met,
            comments: model.comments,
            evaluated_at: model.evaluated_at,
        }
    }
}

/// A decision together with its evaluation, if one has been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub id: DecisionId,
    pub title: String,
    pub description: String,
    pub measurable_goal: String,
    pub status: DecisionStatus,
    pub created_at: String,
    pub updated_at: String,
    pub evaluation: Option<Evaluation>,
}

impl Decision {
    pub fn from_models(
        model: decisions::Model,
        evaluation: Option<evaluations::Model>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: DecisionId::new(model.id),
            status: model.status.parse()?,
            title: model.title,
            description: model.description,
            measurable_goal: model.measurable_goal,
            created_at: model.created_at,
            updated_at: model.updated_at,
            evaluation: evaluation.map(Evaluation::from),
        })
    }
}

/// Validated field values for creating or fully replacing a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionInput {
    pub title: String,
    pub description: String,
    pub measurable_goal: String,
    pub status: DecisionStatus,
}

/// The parts of a decision an evaluation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalState<'a> {
    pub status: DecisionStatus,
    pub measurable_goal: &'a str,
}

impl GoalState<'_> {
    /// Whether moving from `self` to `after` voids an existing evaluation.
    ///
    /// Fires when the status changed and is now Pending, or when the
    /// measurable goal text changed at all.
    #[must_use]
    pub fn invalidates_evaluation(&self, after: &GoalState<'_>) -> bool {
        let reverted_to_pending =
            self.status != after.status && after.status == DecisionStatus::Pending;
        reverted_to_pending || self.measurable_goal != after.measurable_goal
    }
}

/// Fields a decision list may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Title,
    Status,
}

impl FromStr for OrderField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "status" => Ok(Self::Status),
            other => Err(anyhow!("Cannot order by \"{other}\"")),
        }
    }
}

/// Filters applied to a decision listing before pagination.
#[derive(Debug, Clone, Default)]
pub struct DecisionListQuery {
    pub status: Option<DecisionStatus>,
    /// Each term must match the title or the measurable goal.
    pub search_terms: Vec<String>,
    pub ordering: Vec<(OrderField, SortOrder)>,
}

/// One page of decisions plus the totals needed to link neighbours.
#[derive(Debug, Clone)]
pub struct DecisionPage {
    /// 1-based number of this page
    pub page: u64,
    pub items: Vec<Decision>,
    pub total: u64,
    pub num_pages: u64,
}

/// Why an evaluation could not be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationRefusal {
    NotCompleted,
    AlreadyEvaluated,
}

impl EvaluationRefusal {
    /// Checks eligibility of a decision with the given status.
    pub fn check(status: DecisionStatus, has_evaluation: bool) -> Result<(), Self> {
        if status != DecisionStatus::Completed {
            return Err(Self::NotCompleted);
        }
        if has_evaluation {
            return Err(Self::AlreadyEvaluated);
        }
        Ok(())
    }
}

impl fmt::Display for EvaluationRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCompleted => write!(f, "Only completed decisions can be evaluated."),
            Self::AlreadyEvaluated => {
                write!(f, "An evaluation already exists for this decision.")
            }
        }
    }
}
