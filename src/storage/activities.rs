//! Append-only activity log.
//!
//! Every domain mutation records an activity inside its own
//! transaction. There is deliberately no update or delete function in
//! this module.

use crate::model::{EntityKind, EntityRef, Page, PageRequest};
use rusqlite::{Connection, Result};
use serde::Serialize;

/// Activity types recorded against entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Created,
    Updated,
    Deleted,
    StageChanged,
    PrimaryContactChanged,
    Completed,
}

impl ActivityType {
    /// String representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
            Self::StageChanged => "STAGE_CHANGED",
            Self::PrimaryContactChanged => "PRIMARY_CONTACT_CHANGED",
            Self::Completed => "COMPLETED",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "UPDATED" => Self::Updated,
            "DELETED" => Self::Deleted,
            "STAGE_CHANGED" => Self::StageChanged,
            "PRIMARY_CONTACT_CHANGED" => Self::PrimaryContactChanged,
            "COMPLETED" => Self::Completed,
            _ => Self::Created,
        }
    }
}

/// An activity record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    #[serde(flatten)]
    pub entity: EntityRef,
    pub activity_type: ActivityType,
    pub description: String,
    pub payload: Option<serde_json::Value>,
    pub created_by: Option<i64>,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl Activity {
    /// Create a new activity (id assigned by the database).
    #[must_use]
    pub fn new(
        entity: EntityRef,
        activity_type: ActivityType,
        description: &str,
        created_by: Option<i64>,
    ) -> Self {
        Self {
            id: 0,
            entity,
            activity_type,
            description: description.to_string(),
            payload: None,
            created_by,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Attach a structured payload, e.g. `{oldStage, newStage}`.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Insert an activity.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_activity(conn: &Connection, activity: &Activity) -> Result<i64> {
    let payload = activity.payload.as_ref().map(serde_json::Value::to_string);
    conn.execute(
        "INSERT INTO activities (entity_type, entity_id, activity_type, description, payload, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            activity.entity.kind.as_str(),
            activity.entity.id,
            activity.activity_type.as_str(),
            activity.description,
            payload,
            activity.created_by,
            activity.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Activities for one entity, newest first, paged.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn activities_for_entity(
    conn: &Connection,
    entity: EntityRef,
    page: PageRequest,
) -> Result<Page<Activity>> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM activities WHERE entity_type = ?1 AND entity_id = ?2",
        rusqlite::params![entity.kind.as_str(), entity.id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT id, entity_type, entity_id, activity_type, description, payload, created_by, created_at
         FROM activities
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3 OFFSET ?4",
    )?;

    let rows = stmt.query_map(
        rusqlite::params![entity.kind.as_str(), entity.id, page.size, page.offset()],
        activity_from_row,
    )?;

    Ok(Page {
        content: rows.collect::<Result<_>>()?,
        page: page.page,
        size: page.size,
        total_elements: total,
    })
}

fn activity_from_row(row: &rusqlite::Row<'_>) -> Result<Activity> {
    let kind: String = row.get(1)?;
    let payload: Option<String> = row.get(5)?;
    Ok(Activity {
        id: row.get(0)?,
        entity: EntityRef {
            // Unknown kinds cannot occur: writes only go through EntityKind.
            kind: EntityKind::parse(&kind).unwrap_or(EntityKind::Lead),
            id: row.get(2)?,
        },
        activity_type: ActivityType::parse(row.get::<_, String>(3)?.as_str()),
        description: row.get(4)?,
        payload: payload.and_then(|p| serde_json::from_str(&p).ok()),
        created_by: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_insert_and_query() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let entity = EntityRef::new(EntityKind::Lead, 7);
        let activity = Activity::new(entity, ActivityType::StageChanged, "stage changed", Some(1))
            .with_payload(serde_json::json!({"oldStage": "NEW", "newStage": "CONTACTED"}));

        let id = insert_activity(&conn, &activity).unwrap();
        assert!(id > 0);

        let page = activities_for_entity(&conn, entity, PageRequest::default()).unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].activity_type, ActivityType::StageChanged);
        assert_eq!(
            page.content[0].payload.as_ref().unwrap()["newStage"],
            "CONTACTED"
        );
    }

    #[test]
    fn test_newest_first_ordering() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let entity = EntityRef::new(EntityKind::Account, 1);
        for (i, ty) in [ActivityType::Created, ActivityType::Updated].iter().enumerate() {
            let mut a = Activity::new(entity, *ty, "x", None);
            a.created_at = i64::try_from(i).unwrap();
            insert_activity(&conn, &a).unwrap();
        }

        let page = activities_for_entity(&conn, entity, PageRequest::default()).unwrap();
        assert_eq!(page.content[0].activity_type, ActivityType::Updated);
        assert_eq!(page.content[1].activity_type, ActivityType::Created);
    }

    #[test]
    fn test_paging() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let entity = EntityRef::new(EntityKind::Project, 2);
        for _ in 0..5 {
            insert_activity(&conn, &Activity::new(entity, ActivityType::Updated, "x", None))
                .unwrap();
        }

        let page = activities_for_entity(&conn, entity, PageRequest::new(1, 2)).unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.page, 1);
    }
}
