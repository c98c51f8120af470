//! Reminder handlers.

use crate::error::Result;
use crate::http::{AppState, AuthUser};
use crate::model::{NewReminder, Reminder};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use std::sync::Arc;

/// `POST /api/v1/reminders`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewReminder>,
) -> Result<(StatusCode, Json<Reminder>)> {
    let mut storage = state.storage.lock();
    let reminder = storage.create_reminder(&body, user.id)?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

/// `GET /api/v1/reminders` — all reminders, soonest due first.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Reminder>>> {
    Ok(Json(state.storage.lock().list_reminders()?))
}

/// `GET /api/v1/reminders/due` — pending and already due.
pub async fn due(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Reminder>>> {
    let now = chrono::Utc::now().timestamp_millis();
    Ok(Json(state.storage.lock().due_reminders(now)?))
}

/// `PUT /api/v1/reminders/{id}/complete`
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Reminder>> {
    Ok(Json(state.storage.lock().complete_reminder(id, user.id)?))
}

/// `DELETE /api/v1/reminders/{id}`
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.storage.lock().delete_reminder(id, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}
