//! Project, milestone, and task models.
//!
//! Projects belong to an account (CLIENT kind) or stand alone
//! (INTERNAL). Milestones order a project's delivery; tasks optionally
//! hang off a milestone.

use super::lead::Priority;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a project is delivered for a client or internal work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectKind {
    Client,
    Internal,
}

impl ProjectKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::Internal => "INTERNAL",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CLIENT" => Some(Self::Client),
            "INTERNAL" => Some(Self::Internal),
            _ => None,
        }
    }
}

/// The fixed project status set the dashboard aggregates over.
///
/// The column itself is a free-form lifecycle tag; this list only
/// drives zero-filled dashboard counts.
pub const PROJECT_STATUSES: [&str; 8] = [
    "DISCOVERY",
    "DEVELOPMENT",
    "IN_PROGRESS",
    "TESTING",
    "DEPLOYED",
    "COMPLETED",
    "ON_HOLD",
    "CANCELLED",
];

/// A project row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    /// Owning account; required for CLIENT-kind projects.
    pub account_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    /// Free-form lifecycle tag. Defaults to PLANNED.
    pub status: String,
    pub kind: ProjectKind,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub stack: Option<String>,
    pub repo_link: Option<String>,
    pub deploy_link: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub budget_amount: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub account_id: Option<i64>,
    /// Legacy alias for `accountId`, still sent by older clients.
    pub client_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub kind: Option<ProjectKind>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub stack: Option<String>,
    pub repo_link: Option<String>,
    pub deploy_link: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub budget_amount: Option<f64>,
}

impl NewProject {
    /// The effective parent account id, honoring the legacy alias.
    #[must_use]
    pub fn effective_account_id(&self) -> Option<i64> {
        self.account_id.or(self.client_id)
    }
}

/// Merge-patch for a project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub account_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub kind: Option<ProjectKind>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub stack: Option<String>,
    pub repo_link: Option<String>,
    pub deploy_link: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub budget_amount: Option<f64>,
}

/// A milestone row, ordered within its project by `order_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub status: String,
    pub order_index: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a milestone under a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMilestone {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<String>,
    #[serde(default)]
    pub order_index: i64,
}

/// Merge-patch for a milestone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestonePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub order_index: Option<i64>,
}

/// A task row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub milestone_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Unix milliseconds, set when status reaches DONE.
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a task under a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub milestone_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Merge-patch for a task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub milestone_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(ProjectKind::parse("CLIENT"), Some(ProjectKind::Client));
        assert_eq!(ProjectKind::parse("internal"), Some(ProjectKind::Internal));
        assert_eq!(ProjectKind::parse("EXTERNAL"), None);
    }

    #[test]
    fn test_effective_account_id_prefers_account() {
        let mut input = NewProject {
            account_id: Some(3),
            client_id: Some(9),
            name: "Site".into(),
            description: None,
            status: None,
            kind: None,
            start_date: None,
            target_date: None,
            completion_date: None,
            stack: None,
            repo_link: None,
            deploy_link: None,
            estimated_hours: None,
            actual_hours: None,
            budget_amount: None,
        };
        assert_eq!(input.effective_account_id(), Some(3));

        input.account_id = None;
        assert_eq!(input.effective_account_id(), Some(9));
    }
}
