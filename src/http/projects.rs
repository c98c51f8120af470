//! Project, milestone, and task handlers.

use crate::error::Result;
use crate::http::{page_request, AppState, AuthUser};
use crate::model::{
    Milestone, MilestonePatch, NewMilestone, NewProject, NewTask, Page, Project, ProjectPatch,
    Task, TaskPatch,
};
use crate::service;
use crate::storage::ProjectQuery;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub account_id: Option<i64>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// `GET /api/v1/projects`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Project>>> {
    let storage = state.storage.lock();
    if let Some(account_id) = params.account_id {
        // Listing by account 404s for an unknown account rather than
        // returning an empty page.
        storage.get_account(account_id)?;
    }
    let query = ProjectQuery { account_id: params.account_id, status: params.status };
    Ok(Json(storage.list_projects(&query, page_request(params.page, params.size))?))
}

/// `POST /api/v1/projects`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>)> {
    let mut storage = state.storage.lock();
    let project = service::project::create(&mut storage, &body, user.id)?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /api/v1/projects/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Project>> {
    Ok(Json(state.storage.lock().get_project(id)?))
}

/// `PUT /api/v1/projects/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<Project>> {
    Ok(Json(state.storage.lock().update_project(id, &patch, user.id)?))
}

/// `DELETE /api/v1/projects/{id}`
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.storage.lock().delete_project(id, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/projects/{id}/milestones`
pub async fn list_milestones(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Milestone>>> {
    Ok(Json(state.storage.lock().list_milestones(id)?))
}

/// `POST /api/v1/projects/{id}/milestones`
pub async fn add_milestone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewMilestone>,
) -> Result<(StatusCode, Json<Milestone>)> {
    let mut storage = state.storage.lock();
    let milestone = service::project::add_milestone(&mut storage, id, &body, user.id)?;
    Ok((StatusCode::CREATED, Json(milestone)))
}

/// `PUT /api/v1/projects/milestones/{id}`
pub async fn update_milestone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<MilestonePatch>,
) -> Result<Json<Milestone>> {
    Ok(Json(state.storage.lock().update_milestone(id, &patch, user.id)?))
}

/// `DELETE /api/v1/projects/milestones/{id}`
pub async fn remove_milestone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.storage.lock().delete_milestone(id, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/projects/{id}/tasks`
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Task>>> {
    Ok(Json(state.storage.lock().list_tasks(id)?))
}

/// `POST /api/v1/projects/{id}/tasks`
pub async fn add_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>)> {
    let mut storage = state.storage.lock();
    let task = service::project::add_task(&mut storage, id, &body, user.id)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /api/v1/projects/tasks/{id}`
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>> {
    Ok(Json(state.storage.lock().update_task(id, &patch, user.id)?))
}

/// `DELETE /api/v1/projects/tasks/{id}`
pub async fn remove_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.storage.lock().delete_task(id, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}
