//! Reminder model.
//!
//! A reminder points at any entity via a typed ref and becomes "due"
//! once its timestamp passes while still PENDING.

use super::{EntityKind, EntityRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderStatus {
    Pending,
    Done,
}

impl ReminderStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Done => "DONE",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }
}

/// A reminder row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: i64,
    #[serde(flatten)]
    pub entity: EntityRef,
    pub title: String,
    pub description: Option<String>,
    /// Unix milliseconds.
    pub due_at: i64,
    pub status: ReminderStatus,
    pub created_by: Option<i64>,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a reminder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    pub entity_type: EntityKind,
    pub entity_id: i64,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub due_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(ReminderStatus::parse("PENDING"), Some(ReminderStatus::Pending));
        assert_eq!(ReminderStatus::parse("done"), Some(ReminderStatus::Done));
        assert_eq!(ReminderStatus::parse("SNOOZED"), None);
    }
}
