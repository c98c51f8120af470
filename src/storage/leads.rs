//! Lead persistence gateway.
//!
//! Create/read/update/delete plus paged list, search, and stage
//! filters. The merge-patch update is the single code path for stage
//! changes: the STAGE_CHANGED activity is recorded here, inside the
//! same transaction as the row update.

use crate::error::{Error, Result};
use crate::model::{
    EntityKind, EntityRef, Lead, LeadPatch, LeadStage, NewLead, Page, PageRequest, Priority,
};
use crate::storage::activities::ActivityType;
use crate::storage::sqlite::SqliteStorage;
use rusqlite::{Connection, OptionalExtension};

/// Optional filters for the paged lead list.
#[derive(Debug, Clone, Default)]
pub struct LeadQuery {
    /// Case-insensitive substring over name, email, and company.
    pub search: Option<String>,
    pub stage: Option<LeadStage>,
}

const LEAD_COLUMNS: &str = "id, name, email, phone, company, budget_range, project_type, \
     message, source, stage, priority, assigned_to, created_at, updated_at";

fn lead_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    let stage: String = row.get(9)?;
    let priority: String = row.get(10)?;
    Ok(Lead {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        company: row.get(4)?,
        budget_range: row.get(5)?,
        project_type: row.get(6)?,
        message: row.get(7)?,
        source: row.get(8)?,
        stage: LeadStage::parse(&stage).unwrap_or(LeadStage::New),
        priority: Priority::parse(&priority).unwrap_or(Priority::Medium),
        assigned_to: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn lead_by_id(conn: &Connection, id: i64) -> Result<Lead> {
    let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1");
    conn.query_row(&sql, [id], lead_from_row)
        .optional()?
        .ok_or(Error::NotFound { entity: "Lead", id })
}

impl SqliteStorage {
    /// Create a lead with pipeline defaults (stage NEW, priority
    /// MEDIUM, source `web` when absent) and record the CREATED
    /// activity.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_lead(&mut self, input: &NewLead, actor: Option<i64>) -> Result<Lead> {
        let now = chrono::Utc::now().timestamp_millis();
        let source = input.source.as_deref().unwrap_or("web");

        let id = self.mutate("create_lead", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO leads (name, email, phone, company, budget_range, project_type, message, source, stage, priority, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'NEW', 'MEDIUM', ?9, ?9)",
                rusqlite::params![
                    input.name,
                    input.email,
                    input.phone,
                    input.company,
                    input.budget_range,
                    input.project_type,
                    input.message,
                    source,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();

            ctx.record(
                EntityRef::new(EntityKind::Lead, id),
                ActivityType::Created,
                &format!("Lead created from {source}"),
            );
            Ok(id)
        })?;

        self.get_lead(id)
    }

    /// Get a lead by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn get_lead(&self, id: i64) -> Result<Lead> {
        lead_by_id(self.conn(), id)
    }

    /// Paged lead list with optional search and stage filter,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_leads(&self, query: &LeadQuery, page: PageRequest) -> Result<Page<Lead>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let mut param_idx = 1;

        if let Some(search) = query.search.as_deref() {
            conditions.push(format!(
                "(name LIKE ?{param_idx} COLLATE NOCASE OR email LIKE ?{param_idx} COLLATE NOCASE OR company LIKE ?{param_idx} COLLATE NOCASE)"
            ));
            params.push(Box::new(format!("%{search}%")));
            param_idx += 1;
        }
        if let Some(stage) = query.stage {
            conditions.push(format!("stage = ?{param_idx}"));
            params.push(Box::new(stage.as_str()));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM leads{where_clause}"),
            param_refs.as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads{where_clause}
             ORDER BY created_at DESC, id DESC LIMIT ?{param_idx} OFFSET ?{}",
            param_idx + 1
        );
        let mut all_params = param_refs;
        let size = i64::from(page.size);
        let offset = page.offset();
        all_params.push(&size);
        all_params.push(&offset);

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(all_params.as_slice(), lead_from_row)?;

        Ok(Page {
            content: rows.collect::<rusqlite::Result<_>>()?,
            page: page.page,
            size: page.size,
            total_elements: total,
        })
    }

    /// Apply a merge-patch to a lead.
    ///
    /// Only `Some` fields are written. A supplied `assigned_to` must
    /// reference an existing user. A stage differing from the stored
    /// one records exactly one STAGE_CHANGED activity with the
    /// `{oldStage, newStage}` payload; a stage equal to the stored one
    /// is dropped from the patch. A patch with nothing left to write
    /// performs no write at all.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing lead or assignee.
    pub fn update_lead(&mut self, id: i64, patch: &LeadPatch, actor: Option<i64>) -> Result<Lead> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("update_lead", actor, |tx, ctx| {
            let current = lead_by_id(tx, id)?;

            if let Some(user_id) = patch.assigned_to {
                let exists: Option<i64> = tx
                    .query_row("SELECT id FROM users WHERE id = ?1", [user_id], |row| {
                        row.get(0)
                    })
                    .optional()?;
                if exists.is_none() {
                    return Err(Error::NotFound { entity: "User", id: user_id });
                }
            }

            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

            if let Some(name) = &patch.name {
                set_clauses.push("name = ?");
                params.push(Box::new(name.clone()));
            }
            if let Some(email) = &patch.email {
                set_clauses.push("email = ?");
                params.push(Box::new(email.clone()));
            }
            if let Some(phone) = &patch.phone {
                set_clauses.push("phone = ?");
                params.push(Box::new(phone.clone()));
            }
            if let Some(company) = &patch.company {
                set_clauses.push("company = ?");
                params.push(Box::new(company.clone()));
            }
            if let Some(budget) = &patch.budget_range {
                set_clauses.push("budget_range = ?");
                params.push(Box::new(budget.clone()));
            }
            if let Some(project_type) = &patch.project_type {
                set_clauses.push("project_type = ?");
                params.push(Box::new(project_type.clone()));
            }
            if let Some(message) = &patch.message {
                set_clauses.push("message = ?");
                params.push(Box::new(message.clone()));
            }
            if let Some(priority) = patch.priority {
                set_clauses.push("priority = ?");
                params.push(Box::new(priority.as_str()));
            }
            if let Some(user_id) = patch.assigned_to {
                set_clauses.push("assigned_to = ?");
                params.push(Box::new(user_id));
            }

            let stage_change = patch.stage.filter(|s| *s != current.stage);
            if let Some(new_stage) = stage_change {
                set_clauses.push("stage = ?");
                params.push(Box::new(new_stage.as_str()));
            }

            // Nothing but the timestamp would change: leave the row alone.
            if set_clauses.len() == 1 {
                return Ok(current);
            }

            let sql = format!("UPDATE leads SET {} WHERE id = ?", set_clauses.join(", "));
            params.push(Box::new(id));
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, param_refs.as_slice())?;

            if let Some(new_stage) = stage_change {
                ctx.record_with_payload(
                    EntityRef::new(EntityKind::Lead, id),
                    ActivityType::StageChanged,
                    &format!(
                        "Lead stage changed from {} to {}",
                        current.stage.as_str(),
                        new_stage.as_str()
                    ),
                    serde_json::json!({
                        "oldStage": current.stage.as_str(),
                        "newStage": new_stage.as_str(),
                    }),
                );
            }

            lead_by_id(tx, id)
        })
    }

    /// Hard-delete a lead and record the DELETED activity.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn delete_lead(&mut self, id: i64, actor: Option<i64>) -> Result<()> {
        self.mutate("delete_lead", actor, |tx, ctx| {
            let rows = tx.execute("DELETE FROM leads WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::NotFound { entity: "Lead", id });
            }
            ctx.record(
                EntityRef::new(EntityKind::Lead, id),
                ActivityType::Deleted,
                "Lead deleted",
            );
            Ok(())
        })
    }

    /// Count leads in one stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_leads_by_stage(&self, stage: LeadStage) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM leads WHERE stage = ?1",
            [stage.as_str()],
            |row| row.get(0),
        )?)
    }

    /// Total lead count.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_leads(&self) -> Result<i64> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?)
    }

    /// Leads created at or after the given Unix-millis timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_leads_created_since(&self, since_millis: i64) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM leads WHERE created_at >= ?1",
            [since_millis],
            |row| row.get(0),
        )?)
    }
}
