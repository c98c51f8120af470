//! Lead model.
//!
//! Leads enter through the public intake endpoints and move through a
//! fixed pipeline of stages. Every stage change is audited with the
//! old and new stage.

use serde::{Deserialize, Serialize};

/// Lead pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStage {
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl LeadStage {
    /// Every stage, in pipeline order. Dashboard counts iterate this.
    pub const ALL: [Self; 7] = [
        Self::New,
        Self::Contacted,
        Self::Qualified,
        Self::Proposal,
        Self::Negotiation,
        Self::Won,
        Self::Lost,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Contacted => "CONTACTED",
            Self::Qualified => "QUALIFIED",
            Self::Proposal => "PROPOSAL",
            Self::Negotiation => "NEGOTIATION",
            Self::Won => "WON",
            Self::Lost => "LOST",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NEW" => Some(Self::New),
            "CONTACTED" => Some(Self::Contacted),
            "QUALIFIED" => Some(Self::Qualified),
            "PROPOSAL" => Some(Self::Proposal),
            "NEGOTIATION" => Some(Self::Negotiation),
            "WON" => Some(Self::Won),
            "LOST" => Some(Self::Lost),
            _ => None,
        }
    }
}

/// Lead (or task) priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "URGENT" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// A lead row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub budget_range: Option<String>,
    pub project_type: Option<String>,
    pub message: String,
    pub source: String,
    pub stage: LeadStage,
    pub priority: Priority,
    /// Assigned user id, if any.
    pub assigned_to: Option<i64>,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

/// Input for creating a lead.
///
/// Stage and priority are never caller-supplied: new leads always
/// start at NEW / MEDIUM. Source defaults to `web` when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub budget_range: Option<String>,
    pub project_type: Option<String>,
    #[serde(default)]
    pub message: String,
    pub source: Option<String>,
}

/// Merge-patch for a lead. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub budget_range: Option<String>,
    pub project_type: Option<String>,
    pub message: Option<String>,
    pub priority: Option<Priority>,
    pub stage: Option<LeadStage>,
    pub assigned_to: Option<i64>,
}

impl LeadPatch {
    /// A stage-only patch, used by the `PATCH /{id}/stage` endpoint.
    #[must_use]
    pub fn stage_only(stage: LeadStage) -> Self {
        Self { stage: Some(stage), ..Self::default() }
    }
}
