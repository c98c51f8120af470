//! Project operations.

use crate::error::{Error, Result};
use crate::model::{NewMilestone, NewProject, NewTask, Project};
use crate::storage::SqliteStorage;

/// Validate and create a project. Account requirements for
/// client-kind projects are enforced inside the storage transaction.
///
/// # Errors
///
/// Returns a validation error for a blank name, `NotFound` for a
/// missing account, or a storage error.
pub fn create(
    storage: &mut SqliteStorage,
    input: &NewProject,
    actor: Option<i64>,
) -> Result<Project> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("name", "Name is required"));
    }
    storage.create_project(input, actor)
}

/// Validate and add a milestone.
///
/// # Errors
///
/// Returns a validation error for a blank name, or `NotFound` for a
/// missing project.
pub fn add_milestone(
    storage: &mut SqliteStorage,
    project_id: i64,
    input: &NewMilestone,
    actor: Option<i64>,
) -> Result<crate::model::Milestone> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("name", "Name is required"));
    }
    storage.create_milestone(project_id, input, actor)
}

/// Validate and add a task.
///
/// # Errors
///
/// Returns a validation error for a blank title, or `NotFound` for a
/// missing project or milestone.
pub fn add_task(
    storage: &mut SqliteStorage,
    project_id: i64,
    input: &NewTask,
    actor: Option<i64>,
) -> Result<crate::model::Task> {
    if input.title.trim().is_empty() {
        return Err(Error::validation("title", "Title is required"));
    }
    storage.create_task(project_id, input, actor)
}
