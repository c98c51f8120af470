//! Lead intake and pipeline operations.

use crate::error::{Error, Result};
use crate::model::{Lead, LeadPatch, LeadStage, NewLead};
use crate::notify::Notifier;
use crate::storage::SqliteStorage;
use std::collections::BTreeMap;
use tracing::info;

/// Minimum message length accepted from intake forms.
const MIN_MESSAGE_LEN: usize = 10;

fn validate(input: &NewLead) -> Result<()> {
    let mut fields = BTreeMap::new();
    if input.name.trim().is_empty() {
        fields.insert("name".to_string(), "Name is required".to_string());
    }
    let email = input.email.trim();
    if email.is_empty() {
        fields.insert("email".to_string(), "Email is required".to_string());
    } else if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        fields.insert("email".to_string(), "Email must be valid".to_string());
    }
    if input.message.trim().chars().count() < MIN_MESSAGE_LEN {
        fields.insert(
            "message".to_string(),
            format!("Message must be at least {MIN_MESSAGE_LEN} characters"),
        );
    }
    if fields.is_empty() { Ok(()) } else { Err(Error::Validation { fields }) }
}

/// Validate and persist a lead, then announce it. Notification is
/// best-effort; the lead is committed before dispatch and survives a
/// failed delivery.
///
/// # Errors
///
/// Returns a validation error listing every failed field, or a
/// storage error.
pub fn submit(
    storage: &mut SqliteStorage,
    notifier: &dyn Notifier,
    input: &NewLead,
    actor: Option<i64>,
) -> Result<Lead> {
    validate(input)?;
    let lead = storage.create_lead(input, actor)?;
    info!(lead_id = lead.id, source = %lead.source, "lead captured");
    notifier.lead_created(&lead);
    Ok(lead)
}

/// Merge-patch a lead.
///
/// # Errors
///
/// Returns `NotFound` for a missing lead or assignee.
pub fn update(
    storage: &mut SqliteStorage,
    id: i64,
    patch: &LeadPatch,
    actor: Option<i64>,
) -> Result<Lead> {
    storage.update_lead(id, patch, actor)
}

/// Move a lead to a new pipeline stage. Same code path as a full
/// update carrying only the stage.
///
/// # Errors
///
/// Returns `NotFound` if the lead does not exist.
pub fn update_stage(
    storage: &mut SqliteStorage,
    id: i64,
    stage: LeadStage,
    actor: Option<i64>,
) -> Result<Lead> {
    storage.update_lead(id, &LeadPatch::stage_only(stage), actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoopNotifier;

    fn valid_input() -> NewLead {
        NewLead {
            name: "Ada Lovelace".into(),
            email: "ada@analytical.engine".into(),
            phone: None,
            company: None,
            budget_range: None,
            project_type: None,
            message: "Looking for help with a difference engine".into(),
            source: Some("contact-form".into()),
        }
    }

    #[test]
    fn test_submit_persists_and_keeps_source() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let lead = submit(&mut storage, &NoopNotifier, &valid_input(), None).unwrap();
        assert_eq!(lead.source, "contact-form");
        assert_eq!(storage.get_lead(lead.id).unwrap().name, "Ada Lovelace");
    }

    #[test]
    fn test_validation_collects_all_failures() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let input = NewLead {
            name: "  ".into(),
            email: "not-an-email".into(),
            message: "short".into(),
            ..valid_input()
        };
        let err = submit(&mut storage, &NoopNotifier, &input, None).unwrap_err();
        let Error::Validation { fields } = err else { panic!("expected validation error") };
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("message"));
        assert_eq!(storage.count_leads().unwrap(), 0);
    }

    #[test]
    fn test_bare_at_rejected() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        for bad in ["@example.com", "user@"] {
            let input = NewLead { email: bad.into(), ..valid_input() };
            assert!(submit(&mut storage, &NoopNotifier, &input, None).is_err());
        }
    }

    #[test]
    fn test_update_stage_shares_audit_path() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let lead = submit(&mut storage, &NoopNotifier, &valid_input(), None).unwrap();

        let moved = update_stage(&mut storage, lead.id, LeadStage::Qualified, None).unwrap();
        assert_eq!(moved.stage, LeadStage::Qualified);

        let audits: i64 = storage
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM activities WHERE activity_type = 'STAGE_CHANGED'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(audits, 1);
    }
}
