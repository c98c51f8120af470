//! Reminder persistence gateway.
//!
//! Reminders attach to any entity by `(entity_type, entity_id)` and
//! carry a Unix-millis due timestamp. "Due" means due_at at or before
//! the probe time and status still PENDING.

use crate::error::{Error, Result};
use crate::model::{EntityRef, NewReminder, Reminder, ReminderStatus};
use crate::storage::sqlite::SqliteStorage;
use rusqlite::OptionalExtension;

const REMINDER_COLUMNS: &str = "id, entity_type, entity_id, title, description, due_at, \
     status, created_by, completed_at, created_at, updated_at";

fn reminder_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reminder> {
    let entity_type: String = row.get(1)?;
    let status: String = row.get(6)?;
    let kind = crate::model::EntityKind::parse(&entity_type).unwrap_or(crate::model::EntityKind::Lead);
    Ok(Reminder {
        id: row.get(0)?,
        entity: EntityRef::new(kind, row.get(2)?),
        title: row.get(3)?,
        description: row.get(4)?,
        due_at: row.get(5)?,
        status: ReminderStatus::parse(&status).unwrap_or(ReminderStatus::Pending),
        created_by: row.get(7)?,
        completed_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl SqliteStorage {
    /// Create a pending reminder. The creating user, when known,
    /// becomes `created_by`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_reminder(&mut self, input: &NewReminder, actor: Option<i64>) -> Result<Reminder> {
        let now = chrono::Utc::now().timestamp_millis();

        let id = self.mutate("create_reminder", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO reminders (entity_type, entity_id, title, description, due_at, status, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'PENDING', ?6, ?7, ?7)",
                rusqlite::params![
                    input.entity_type.as_str(),
                    input.entity_id,
                    input.title,
                    input.description,
                    input.due_at,
                    ctx.actor,
                    now,
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        self.get_reminder(id)
    }

    /// Get a reminder by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn get_reminder(&self, id: i64) -> Result<Reminder> {
        let sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1");
        self.conn()
            .query_row(&sql, [id], reminder_from_row)
            .optional()?
            .ok_or(Error::NotFound { entity: "Reminder", id })
    }

    /// All reminders, soonest due first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_reminders(&self) -> Result<Vec<Reminder>> {
        let sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders ORDER BY due_at, id");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], reminder_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Pending reminders with `due_at` at or before `now_millis`,
    /// soonest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn due_reminders(&self, now_millis: i64) -> Result<Vec<Reminder>> {
        let sql = format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders
             WHERE status = 'PENDING' AND due_at <= ?1
             ORDER BY due_at, id"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([now_millis], reminder_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Mark a reminder DONE and stamp `completed_at`. Completing an
    /// already-done reminder leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn complete_reminder(&mut self, id: i64, actor: Option<i64>) -> Result<Reminder> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("complete_reminder", actor, |tx, _ctx| {
            let rows = tx.execute(
                "UPDATE reminders SET status = 'DONE', completed_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND status = 'PENDING'",
                rusqlite::params![now, id],
            )?;
            if rows == 0 {
                // Missing id and already-done both land here; only the
                // former is an error.
                let exists: Option<i64> = tx
                    .query_row("SELECT id FROM reminders WHERE id = ?1", [id], |row| row.get(0))
                    .optional()?;
                if exists.is_none() {
                    return Err(Error::NotFound { entity: "Reminder", id });
                }
            }
            Ok(())
        })?;

        self.get_reminder(id)
    }

    /// Hard-delete a reminder.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn delete_reminder(&mut self, id: i64, actor: Option<i64>) -> Result<()> {
        self.mutate("delete_reminder", actor, |tx, _ctx| {
            let rows = tx.execute("DELETE FROM reminders WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::NotFound { entity: "Reminder", id });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;

    fn reminder_for(entity_id: i64, due_at: i64) -> NewReminder {
        NewReminder {
            entity_type: EntityKind::Lead,
            entity_id,
            title: "Follow up".into(),
            description: None,
            due_at,
        }
    }

    #[test]
    fn test_due_excludes_future_and_done() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let past = storage.create_reminder(&reminder_for(1, 1_000), None).unwrap();
        let also_past = storage.create_reminder(&reminder_for(2, 2_000), None).unwrap();
        storage.create_reminder(&reminder_for(3, 9_000_000), None).unwrap();
        storage.complete_reminder(also_past.id, None).unwrap();

        let due = storage.due_reminders(5_000).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, past.id);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let reminder = storage.create_reminder(&reminder_for(1, 1_000), None).unwrap();

        let done = storage.complete_reminder(reminder.id, None).unwrap();
        assert_eq!(done.status, ReminderStatus::Done);
        let stamp = done.completed_at.unwrap();

        let again = storage.complete_reminder(reminder.id, None).unwrap();
        assert_eq!(again.completed_at, Some(stamp));
    }

    #[test]
    fn test_created_by_comes_from_actor() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let reminder = storage.create_reminder(&reminder_for(1, 1_000), Some(7)).unwrap();
        assert_eq!(reminder.created_by, Some(7));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage.delete_reminder(42, None).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Reminder", .. }));
    }
}
