//! SQLite storage implementation.
//!
//! Connection handling and the mutation protocol. Every domain write
//! runs through [`SqliteStorage::mutate`], which opens an IMMEDIATE
//! transaction, runs the mutation closure, flushes the activity
//! records the closure collected, and commits. An error anywhere
//! rolls the whole thing back, activities included.

use crate::error::{Error, Result};
use crate::model::{EntityRef, User};
use crate::storage::activities::{insert_activity, Activity, ActivityType};
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation.
///
/// Passed to mutation closures to collect activity records, which are
/// written at the end of the transaction so that a failed mutation
/// leaves no audit trace.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// User performing the operation, when authenticated.
    pub actor: Option<i64>,
    /// Activities to write at the end of the transaction.
    pub activities: Vec<Activity>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: Option<i64>) -> Self {
        Self { op_name: op_name.to_string(), actor, activities: Vec::new() }
    }

    /// Record an activity for this operation.
    pub fn record(&mut self, entity: EntityRef, activity_type: ActivityType, description: &str) {
        self.activities
            .push(Activity::new(entity, activity_type, description, self.actor));
    }

    /// Record an activity carrying a structured payload.
    pub fn record_with_payload(
        &mut self,
        entity: EntityRef,
        activity_type: ActivityType,
        description: &str,
        payload: serde_json::Value,
    ) {
        self.activities.push(
            Activity::new(entity, activity_type, description, self.actor).with_payload(payload),
        );
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or
    /// the schema fails to apply.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for reads).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// 1. Begins an IMMEDIATE transaction (write lock up front)
    /// 2. Executes the mutation closure
    /// 3. Writes collected activity records
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails; the transaction is rolled
    /// back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: Option<i64>, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);
        let result = f(&tx, &mut ctx)?;

        for activity in &ctx.activities {
            insert_activity(&tx, activity)?;
        }

        tx.commit()?;
        Ok(result)
    }

    // ===============
    // User Operations
    // ===============

    /// Create a user. The hash must already be computed.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. duplicate username).
    pub fn create_user(
        &mut self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User> {
        let now = chrono::Utc::now().timestamp_millis();
        let id = self.mutate("create_user", None, |tx, _ctx| {
            tx.execute(
                "INSERT INTO users (username, email, password_hash, role, enabled, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                rusqlite::params![username, email, password_hash, role, now],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        self.user_by_id(id)?
            .ok_or(Error::NotFound { entity: "User", id })
    }

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.user_where("id = ?1", rusqlite::params![id])
    }

    /// Look up a user by exact email.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_where("email = ?1", rusqlite::params![email])
    }

    /// Look up a user by exact username.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_where("username = ?1", rusqlite::params![username])
    }

    /// Total user count; drives first-run admin seeding.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_users(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    fn user_where(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<User>> {
        let sql = format!(
            "SELECT id, username, email, password_hash, role, enabled, created_at, updated_at
             FROM users WHERE {clause}"
        );
        let user = self
            .conn
            .query_row(&sql, params, |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    role: row.get(4)?,
                    enabled: row.get::<_, i64>(5)? != 0,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            })
            .optional()?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;

    #[test]
    fn test_create_and_find_user() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let user = storage
            .create_user("admin", "admin@example.com", "hash", "ADMIN")
            .unwrap();
        assert!(user.id > 0);
        assert!(user.enabled);

        let by_email = storage.user_by_email("admin@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_name = storage.user_by_username("admin").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(storage.user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_mutate_rolls_back_activities_on_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let entity = EntityRef::new(EntityKind::Lead, 1);

        let result: Result<()> = storage.mutate("failing_op", None, |_tx, ctx| {
            ctx.record(entity, ActivityType::Created, "never lands");
            Err(Error::Internal("forced".into()))
        });
        assert!(result.is_err());

        let count: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
