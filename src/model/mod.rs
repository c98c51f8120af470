//! Data types for the CRM domain.
//!
//! Entities mirror the relational schema one-to-one. Each mutable
//! entity has a companion `*Patch` type whose fields are all
//! `Option<T>`: merge-patch semantics, an absent field leaves the
//! stored value untouched.

pub mod account;
pub mod lead;
pub mod project;
pub mod reminder;
pub mod user;

pub use account::{generate_slug, Account, AccountPatch, Contact, ContactPatch, NewAccount, NewContact};
pub use lead::{Lead, LeadPatch, LeadStage, NewLead, Priority};
pub use project::{
    Milestone, MilestonePatch, NewMilestone, NewProject, NewTask, Project, ProjectKind,
    ProjectPatch, Task, TaskPatch, PROJECT_STATUSES,
};
pub use reminder::{NewReminder, Reminder, ReminderStatus};
pub use user::User;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The kinds of entity an activity or reminder can point at.
///
/// Stored as the SCREAMING string; dispatching on it in code is
/// exhaustive instead of stringly-typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Lead,
    Account,
    Contact,
    Project,
    Milestone,
    Task,
    Reminder,
    User,
}

impl EntityKind {
    /// String form used in the `entity_type` columns.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "LEAD",
            Self::Account => "ACCOUNT",
            Self::Contact => "CONTACT",
            Self::Project => "PROJECT",
            Self::Milestone => "MILESTONE",
            Self::Task => "TASK",
            Self::Reminder => "REMINDER",
            Self::User => "USER",
        }
    }

    /// Parse the stored string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LEAD" => Some(Self::Lead),
            "ACCOUNT" | "CLIENT" => Some(Self::Account),
            "CONTACT" => Some(Self::Contact),
            "PROJECT" => Some(Self::Project),
            "MILESTONE" => Some(Self::Milestone),
            "TASK" => Some(Self::Task),
            "REMINDER" => Some(Self::Reminder),
            "USER" => Some(Self::User),
            _ => None,
        }
    }
}

/// A typed polymorphic reference: entity kind plus row id.
///
/// Serializes as `entityType`/`entityId` so it can be flattened into
/// activity and reminder payloads without clashing with their own
/// `id` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "entityType")]
    pub kind: EntityKind,
    #[serde(rename = "entityId")]
    pub id: i64,
}

impl EntityRef {
    #[must_use]
    pub const fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

/// A custom-field value: string, number, bool, or null.
///
/// Accounts carry an open-ended `customFields` map; constraining the
/// values to this small tagged set keeps them queryable and keeps
/// arbitrary nested objects out of the column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

/// Ordered custom-field map, serialized as a JSON object.
pub type CustomFields = BTreeMap<String, FieldValue>;

/// A page of results, in the shape list endpoints return.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
}

/// Paging parameters common to all list endpoints.
///
/// `page` is zero-based. `size` is clamped to 1..=100.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size: size.clamp(1, 100) }
    }

    /// SQL OFFSET for this page.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.page as i64 * self.size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_round_trip() {
        for kind in [
            EntityKind::Lead,
            EntityKind::Account,
            EntityKind::Contact,
            EntityKind::Project,
            EntityKind::Milestone,
            EntityKind::Task,
            EntityKind::Reminder,
            EntityKind::User,
        ] {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::parse("WIDGET"), None);
    }

    #[test]
    fn test_legacy_client_alias() {
        assert_eq!(EntityKind::parse("CLIENT"), Some(EntityKind::Account));
    }

    #[test]
    fn test_page_request_clamps_size() {
        assert_eq!(PageRequest::new(0, 500).size, 100);
        assert_eq!(PageRequest::new(0, 0).size, 1);
        assert_eq!(PageRequest::new(3, 25).offset(), 75);
    }

    #[test]
    fn test_field_value_untagged_serde() {
        let mut fields = CustomFields::new();
        fields.insert("vip".into(), FieldValue::Bool(true));
        fields.insert("seats".into(), FieldValue::Num(12.0));
        fields.insert("region".into(), FieldValue::Str("EMEA".into()));
        fields.insert("churned".into(), FieldValue::Null);

        let json = serde_json::to_string(&fields).unwrap();
        let back: CustomFields = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);
    }
}
