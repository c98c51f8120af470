//! Project, milestone, and task persistence gateway.
//!
//! Client projects must reference an existing account; internal
//! projects need no account at all. Dates are stored as ISO-8601 TEXT
//! and surfaced as `chrono::NaiveDate`.

use crate::error::{Error, Result};
use crate::model::{
    EntityKind, EntityRef, Milestone, MilestonePatch, NewMilestone, NewProject, NewTask, Page,
    PageRequest, Priority, Project, ProjectKind, ProjectPatch, Task, TaskPatch,
};
use crate::storage::activities::ActivityType;
use crate::storage::sqlite::SqliteStorage;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

/// Optional filters for the paged project list.
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub account_id: Option<i64>,
    pub status: Option<String>,
}

fn date_to_sql(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}

fn date_from_sql(text: Option<String>) -> Option<NaiveDate> {
    text.and_then(|t| t.parse().ok())
}

const PROJECT_COLUMNS: &str = "id, account_id, name, description, status, kind, start_date, \
     target_date, completion_date, stack, repo_link, deploy_link, estimated_hours, \
     actual_hours, budget_amount, created_at, updated_at";

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let kind: String = row.get(5)?;
    Ok(Project {
        id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        kind: ProjectKind::parse(&kind).unwrap_or(ProjectKind::Client),
        start_date: date_from_sql(row.get(6)?),
        target_date: date_from_sql(row.get(7)?),
        completion_date: date_from_sql(row.get(8)?),
        stack: row.get(9)?,
        repo_link: row.get(10)?,
        deploy_link: row.get(11)?,
        estimated_hours: row.get(12)?,
        actual_hours: row.get(13)?,
        budget_amount: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn project_by_id(conn: &Connection, id: i64) -> Result<Project> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1");
    conn.query_row(&sql, [id], project_from_row)
        .optional()?
        .ok_or(Error::NotFound { entity: "Project", id })
}

fn require_account(conn: &Connection, id: i64) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM accounts WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(Error::NotFound { entity: "Client", id });
    }
    Ok(())
}

const MILESTONE_COLUMNS: &str = "id, project_id, name, description, due_date, \
     completion_date, status, order_index, created_at, updated_at";

fn milestone_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        due_date: date_from_sql(row.get(4)?),
        completion_date: date_from_sql(row.get(5)?),
        status: row.get(6)?,
        order_index: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn milestone_by_id(conn: &Connection, id: i64) -> Result<Milestone> {
    let sql = format!("SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = ?1");
    conn.query_row(&sql, [id], milestone_from_row)
        .optional()?
        .ok_or(Error::NotFound { entity: "Milestone", id })
}

const TASK_COLUMNS: &str = "id, project_id, milestone_id, title, description, status, \
     priority, assignee, due_date, completed_at, created_at, updated_at";

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        milestone_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: row.get(5)?,
        priority: Priority::parse(&priority).unwrap_or(Priority::Medium),
        assignee: row.get(7)?,
        due_date: date_from_sql(row.get(8)?),
        completed_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn task_by_id(conn: &Connection, id: i64) -> Result<Task> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    conn.query_row(&sql, [id], task_from_row)
        .optional()?
        .ok_or(Error::NotFound { entity: "Task", id })
}

impl SqliteStorage {
    /// Create a project. Kind defaults to CLIENT, and client projects
    /// must point at an existing account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when a client project references a missing
    /// account.
    pub fn create_project(&mut self, input: &NewProject, actor: Option<i64>) -> Result<Project> {
        let now = chrono::Utc::now().timestamp_millis();
        let kind = input.kind.unwrap_or(ProjectKind::Client);
        let status = input.status.as_deref().unwrap_or("PLANNED");
        let account_id = input.effective_account_id();

        let id = self.mutate("create_project", actor, |tx, ctx| {
            if kind == ProjectKind::Client {
                match account_id {
                    Some(account_id) => require_account(tx, account_id)?,
                    None => {
                        return Err(Error::validation(
                            "accountId",
                            "Client projects require an account",
                        ));
                    }
                }
            }
            tx.execute(
                "INSERT INTO projects (account_id, name, description, status, kind, start_date, target_date, completion_date, stack, repo_link, deploy_link, estimated_hours, actual_hours, budget_amount, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
                rusqlite::params![
                    account_id,
                    input.name,
                    input.description,
                    status,
                    kind.as_str(),
                    date_to_sql(input.start_date),
                    date_to_sql(input.target_date),
                    date_to_sql(input.completion_date),
                    input.stack,
                    input.repo_link,
                    input.deploy_link,
                    input.estimated_hours,
                    input.actual_hours,
                    input.budget_amount,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record(
                EntityRef::new(EntityKind::Project, id),
                ActivityType::Created,
                "Project created",
            );
            Ok(id)
        })?;

        self.get_project(id)
    }

    /// Get a project by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn get_project(&self, id: i64) -> Result<Project> {
        project_by_id(self.conn(), id)
    }

    /// Paged project list with optional account and status filters,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self, query: &ProjectQuery, page: PageRequest) -> Result<Page<Project>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let mut param_idx = 1;

        if let Some(account_id) = query.account_id {
            conditions.push(format!("account_id = ?{param_idx}"));
            params.push(Box::new(account_id));
            param_idx += 1;
        }
        if let Some(status) = query.status.as_deref() {
            conditions.push(format!("status = ?{param_idx}"));
            params.push(Box::new(status.to_string()));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM projects{where_clause}"),
            param_refs.as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects{where_clause}
             ORDER BY created_at DESC, id DESC LIMIT ?{param_idx} OFFSET ?{}",
            param_idx + 1
        );
        let mut all_params = param_refs;
        let size = i64::from(page.size);
        let offset = page.offset();
        all_params.push(&size);
        all_params.push(&offset);

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(all_params.as_slice(), project_from_row)?;

        Ok(Page {
            content: rows.collect::<rusqlite::Result<_>>()?,
            page: page.page,
            size: page.size,
            total_elements: total,
        })
    }

    /// Apply a merge-patch to a project. A new `account_id` must
    /// reference an existing account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing project or account.
    pub fn update_project(
        &mut self,
        id: i64,
        patch: &ProjectPatch,
        actor: Option<i64>,
    ) -> Result<Project> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("update_project", actor, |tx, ctx| {
            project_by_id(tx, id)?;
            if let Some(account_id) = patch.account_id {
                require_account(tx, account_id)?;
            }

            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

            if let Some(account_id) = patch.account_id {
                set_clauses.push("account_id = ?");
                params.push(Box::new(account_id));
            }
            if let Some(name) = &patch.name {
                set_clauses.push("name = ?");
                params.push(Box::new(name.clone()));
            }
            if let Some(description) = &patch.description {
                set_clauses.push("description = ?");
                params.push(Box::new(description.clone()));
            }
            if let Some(status) = &patch.status {
                set_clauses.push("status = ?");
                params.push(Box::new(status.clone()));
            }
            if let Some(kind) = patch.kind {
                set_clauses.push("kind = ?");
                params.push(Box::new(kind.as_str()));
            }
            if let Some(date) = patch.start_date {
                set_clauses.push("start_date = ?");
                params.push(Box::new(date.to_string()));
            }
            if let Some(date) = patch.target_date {
                set_clauses.push("target_date = ?");
                params.push(Box::new(date.to_string()));
            }
            if let Some(date) = patch.completion_date {
                set_clauses.push("completion_date = ?");
                params.push(Box::new(date.to_string()));
            }
            if let Some(stack) = &patch.stack {
                set_clauses.push("stack = ?");
                params.push(Box::new(stack.clone()));
            }
            if let Some(link) = &patch.repo_link {
                set_clauses.push("repo_link = ?");
                params.push(Box::new(link.clone()));
            }
            if let Some(link) = &patch.deploy_link {
                set_clauses.push("deploy_link = ?");
                params.push(Box::new(link.clone()));
            }
            if let Some(hours) = patch.estimated_hours {
                set_clauses.push("estimated_hours = ?");
                params.push(Box::new(hours));
            }
            if let Some(hours) = patch.actual_hours {
                set_clauses.push("actual_hours = ?");
                params.push(Box::new(hours));
            }
            if let Some(amount) = patch.budget_amount {
                set_clauses.push("budget_amount = ?");
                params.push(Box::new(amount));
            }

            if set_clauses.len() > 1 {
                let sql =
                    format!("UPDATE projects SET {} WHERE id = ?", set_clauses.join(", "));
                params.push(Box::new(id));
                let param_refs: Vec<&dyn rusqlite::ToSql> =
                    params.iter().map(AsRef::as_ref).collect();
                tx.execute(&sql, param_refs.as_slice())?;
                ctx.record(
                    EntityRef::new(EntityKind::Project, id),
                    ActivityType::Updated,
                    "Project updated",
                );
            }

            project_by_id(tx, id)
        })
    }

    /// Hard-delete a project; milestones and tasks cascade.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn delete_project(&mut self, id: i64, actor: Option<i64>) -> Result<()> {
        self.mutate("delete_project", actor, |tx, ctx| {
            let rows = tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::NotFound { entity: "Project", id });
            }
            ctx.record(
                EntityRef::new(EntityKind::Project, id),
                ActivityType::Deleted,
                "Project deleted",
            );
            Ok(())
        })
    }

    /// Count projects in one status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_projects_by_status(&self, status: &str) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM projects WHERE status = ?1",
            [status],
            |row| row.get(0),
        )?)
    }

    /// Add a milestone to a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub fn create_milestone(
        &mut self,
        project_id: i64,
        input: &NewMilestone,
        actor: Option<i64>,
    ) -> Result<Milestone> {
        let now = chrono::Utc::now().timestamp_millis();
        let status = input.status.as_deref().unwrap_or("PENDING");

        let id = self.mutate("create_milestone", actor, |tx, _ctx| {
            project_by_id(tx, project_id)?;
            tx.execute(
                "INSERT INTO milestones (project_id, name, description, due_date, status, order_index, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![
                    project_id,
                    input.name,
                    input.description,
                    date_to_sql(input.due_date),
                    status,
                    input.order_index,
                    now,
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        milestone_by_id(self.conn(), id)
    }

    /// Milestones of a project in display order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub fn list_milestones(&self, project_id: i64) -> Result<Vec<Milestone>> {
        project_by_id(self.conn(), project_id)?;
        let sql = format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE project_id = ?1
             ORDER BY order_index, id"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([project_id], milestone_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Apply a merge-patch to a milestone. Moving it to COMPLETED
    /// stamps the completion date when none was supplied.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn update_milestone(
        &mut self,
        id: i64,
        patch: &MilestonePatch,
        actor: Option<i64>,
    ) -> Result<Milestone> {
        let now = chrono::Utc::now().timestamp_millis();
        let today = chrono::Utc::now().date_naive();

        self.mutate("update_milestone", actor, |tx, _ctx| {
            let current = milestone_by_id(tx, id)?;

            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

            if let Some(name) = &patch.name {
                set_clauses.push("name = ?");
                params.push(Box::new(name.clone()));
            }
            if let Some(description) = &patch.description {
                set_clauses.push("description = ?");
                params.push(Box::new(description.clone()));
            }
            if let Some(date) = patch.due_date {
                set_clauses.push("due_date = ?");
                params.push(Box::new(date.to_string()));
            }
            if let Some(status) = &patch.status {
                set_clauses.push("status = ?");
                params.push(Box::new(status.clone()));
            }
            if let Some(order_index) = patch.order_index {
                set_clauses.push("order_index = ?");
                params.push(Box::new(order_index));
            }

            let completion = patch.completion_date.or_else(|| {
                let completed = patch.status.as_deref() == Some("COMPLETED")
                    && current.status != "COMPLETED";
                completed.then_some(today)
            });
            if let Some(date) = completion {
                set_clauses.push("completion_date = ?");
                params.push(Box::new(date.to_string()));
            }

            if set_clauses.len() > 1 {
                let sql =
                    format!("UPDATE milestones SET {} WHERE id = ?", set_clauses.join(", "));
                params.push(Box::new(id));
                let param_refs: Vec<&dyn rusqlite::ToSql> =
                    params.iter().map(AsRef::as_ref).collect();
                tx.execute(&sql, param_refs.as_slice())?;
            }

            milestone_by_id(tx, id)
        })
    }

    /// Hard-delete a milestone; its tasks keep the project but lose
    /// the milestone link.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn delete_milestone(&mut self, id: i64, actor: Option<i64>) -> Result<()> {
        self.mutate("delete_milestone", actor, |tx, _ctx| {
            let rows = tx.execute("DELETE FROM milestones WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::NotFound { entity: "Milestone", id });
            }
            Ok(())
        })
    }

    /// Add a task to a project, optionally under one of its
    /// milestones.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing project or milestone.
    pub fn create_task(
        &mut self,
        project_id: i64,
        input: &NewTask,
        actor: Option<i64>,
    ) -> Result<Task> {
        let now = chrono::Utc::now().timestamp_millis();
        let status = input.status.as_deref().unwrap_or("TODO");
        let priority = input.priority.unwrap_or(Priority::Medium);

        let id = self.mutate("create_task", actor, |tx, _ctx| {
            project_by_id(tx, project_id)?;
            if let Some(milestone_id) = input.milestone_id {
                let milestone = milestone_by_id(tx, milestone_id)?;
                if milestone.project_id != project_id {
                    return Err(Error::validation(
                        "milestoneId",
                        "Milestone belongs to a different project",
                    ));
                }
            }
            tx.execute(
                "INSERT INTO tasks (project_id, milestone_id, title, description, status, priority, assignee, due_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    project_id,
                    input.milestone_id,
                    input.title,
                    input.description,
                    status,
                    priority.as_str(),
                    input.assignee,
                    date_to_sql(input.due_date),
                    now,
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        task_by_id(self.conn(), id)
    }

    /// Tasks of a project, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub fn list_tasks(&self, project_id: i64) -> Result<Vec<Task>> {
        project_by_id(self.conn(), project_id)?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([project_id], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Apply a merge-patch to a task. Entering DONE stamps
    /// `completed_at`; leaving DONE clears it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn update_task(&mut self, id: i64, patch: &TaskPatch, actor: Option<i64>) -> Result<Task> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("update_task", actor, |tx, _ctx| {
            let current = task_by_id(tx, id)?;

            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

            if let Some(milestone_id) = patch.milestone_id {
                let milestone = milestone_by_id(tx, milestone_id)?;
                if milestone.project_id != current.project_id {
                    return Err(Error::validation(
                        "milestoneId",
                        "Milestone belongs to a different project",
                    ));
                }
                set_clauses.push("milestone_id = ?");
                params.push(Box::new(milestone_id));
            }
            if let Some(title) = &patch.title {
                set_clauses.push("title = ?");
                params.push(Box::new(title.clone()));
            }
            if let Some(description) = &patch.description {
                set_clauses.push("description = ?");
                params.push(Box::new(description.clone()));
            }
            if let Some(status) = &patch.status {
                set_clauses.push("status = ?");
                params.push(Box::new(status.clone()));
                if status == "DONE" && current.status != "DONE" {
                    set_clauses.push("completed_at = ?");
                    params.push(Box::new(now));
                } else if status != "DONE" && current.status == "DONE" {
                    set_clauses.push("completed_at = NULL");
                }
            }
            if let Some(priority) = patch.priority {
                set_clauses.push("priority = ?");
                params.push(Box::new(priority.as_str()));
            }
            if let Some(assignee) = &patch.assignee {
                set_clauses.push("assignee = ?");
                params.push(Box::new(assignee.clone()));
            }
            if let Some(date) = patch.due_date {
                set_clauses.push("due_date = ?");
                params.push(Box::new(date.to_string()));
            }

            if set_clauses.len() > 1 {
                let sql = format!("UPDATE tasks SET {} WHERE id = ?", set_clauses.join(", "));
                params.push(Box::new(id));
                let param_refs: Vec<&dyn rusqlite::ToSql> =
                    params.iter().map(AsRef::as_ref).collect();
                tx.execute(&sql, param_refs.as_slice())?;
            }

            task_by_id(tx, id)
        })
    }

    /// Hard-delete a task.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn delete_task(&mut self, id: i64, actor: Option<i64>) -> Result<()> {
        self.mutate("delete_task", actor, |tx, _ctx| {
            let rows = tx.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::NotFound { entity: "Task", id });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomFields, NewAccount};

    fn seed_account(storage: &mut SqliteStorage) -> i64 {
        let input = NewAccount {
            name: "Projects Co".into(),
            email: "ops@projects.test".into(),
            slug: None,
            phone: None,
            company: None,
            address: None,
            status: None,
            industry: None,
            website: None,
            tags: None,
            notes: None,
            custom_fields: CustomFields::default(),
            created_from_lead_id: None,
        };
        storage.create_account(&input, None).unwrap().id
    }

    fn client_project(account_id: i64) -> NewProject {
        NewProject {
            account_id: Some(account_id),
            client_id: None,
            name: "Website rebuild".into(),
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
        }
    }

    #[test]
    fn test_client_project_requires_existing_account() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage.create_project(&client_project(404), None).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Client", id: 404 }));

        let err = storage
            .create_project(
                &NewProject { account_id: None, ..client_project(0) },
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_internal_project_needs_no_account() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let input = NewProject {
            account_id: None,
            kind: Some(ProjectKind::Internal),
            ..client_project(0)
        };
        let project = storage.create_project(&input, None).unwrap();
        assert_eq!(project.kind, ProjectKind::Internal);
        assert_eq!(project.account_id, None);
        assert_eq!(project.status, "PLANNED");
    }

    #[test]
    fn test_legacy_client_id_alias() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account_id = seed_account(&mut storage);
        let input = NewProject {
            account_id: None,
            client_id: Some(account_id),
            ..client_project(0)
        };
        let project = storage.create_project(&input, None).unwrap();
        assert_eq!(project.account_id, Some(account_id));
    }

    #[test]
    fn test_dates_round_trip_as_iso() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account_id = seed_account(&mut storage);
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let input = NewProject { start_date: Some(start), ..client_project(account_id) };

        let project = storage.create_project(&input, None).unwrap();
        assert_eq!(project.start_date, Some(start));

        let raw: String = storage
            .conn()
            .query_row("SELECT start_date FROM projects WHERE id = ?1", [project.id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(raw, "2026-03-01");
    }

    #[test]
    fn test_milestones_listed_in_display_order() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account_id = seed_account(&mut storage);
        let project = storage.create_project(&client_project(account_id), None).unwrap();

        for (name, order) in [("Launch", 2), ("Design", 0), ("Build", 1)] {
            let input = NewMilestone {
                name: name.into(),
                description: None,
                due_date: None,
                status: None,
                order_index: order,
            };
            storage.create_milestone(project.id, &input, None).unwrap();
        }

        let names: Vec<_> = storage
            .list_milestones(project.id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["Design", "Build", "Launch"]);
    }

    #[test]
    fn test_task_done_stamps_and_clears_completed_at() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account_id = seed_account(&mut storage);
        let project = storage.create_project(&client_project(account_id), None).unwrap();
        let task = storage
            .create_task(
                project.id,
                &NewTask {
                    milestone_id: None,
                    title: "Wire up CI".into(),
                    description: None,
                    status: None,
                    priority: None,
                    assignee: None,
                    due_date: None,
                },
                None,
            )
            .unwrap();
        assert_eq!(task.completed_at, None);

        let done = storage
            .update_task(task.id, &TaskPatch { status: Some("DONE".into()), ..TaskPatch::default() }, None)
            .unwrap();
        assert!(done.completed_at.is_some());

        let reopened = storage
            .update_task(task.id, &TaskPatch { status: Some("TODO".into()), ..TaskPatch::default() }, None)
            .unwrap();
        assert_eq!(reopened.completed_at, None);
    }

    #[test]
    fn test_task_rejects_foreign_milestone() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account_id = seed_account(&mut storage);
        let first = storage.create_project(&client_project(account_id), None).unwrap();
        let second = storage.create_project(&client_project(account_id), None).unwrap();
        let milestone = storage
            .create_milestone(
                second.id,
                &NewMilestone {
                    name: "Elsewhere".into(),
                    description: None,
                    due_date: None,
                    status: None,
                    order_index: 0,
                },
                None,
            )
            .unwrap();

        let err = storage
            .create_task(
                first.id,
                &NewTask {
                    milestone_id: Some(milestone.id),
                    title: "Misfiled".into(),
                    description: None,
                    status: None,
                    priority: None,
                    assignee: None,
                    due_date: None,
                },
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_delete_project_cascades() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account_id = seed_account(&mut storage);
        let project = storage.create_project(&client_project(account_id), None).unwrap();
        storage
            .create_milestone(
                project.id,
                &NewMilestone {
                    name: "Gone".into(),
                    description: None,
                    due_date: None,
                    status: None,
                    order_index: 0,
                },
                None,
            )
            .unwrap();

        storage.delete_project(project.id, None).unwrap();
        let left: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM milestones", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }
}
