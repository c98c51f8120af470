//! Lead handlers: public intake plus the admin pipeline API.

use crate::error::{Error, Result};
use crate::http::{page_request, AppState, AuthUser};
use crate::model::{Lead, LeadPatch, LeadStage, NewLead, Page};
use crate::service;
use crate::storage::LeadQuery;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub stage: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StageParams {
    pub stage: String,
}

fn parse_stage(raw: &str) -> Result<LeadStage> {
    LeadStage::parse(raw).ok_or_else(|| Error::validation("stage", "Unknown stage"))
}

fn intake_response(lead: &Lead) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Thank you for reaching out. We will get back to you shortly.",
            "leadId": lead.id,
        })),
    )
}

/// `POST /api/contact` — unauthenticated contact form. Records the
/// lead before any notification goes out, so the message survives a
/// dead notification channel.
pub async fn contact_intake(
    State(state): State<Arc<AppState>>,
    Json(mut body): Json<NewLead>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    body.source = Some("contact-form".to_string());
    let mut storage = state.storage.lock();
    let lead = service::lead::submit(&mut storage, state.notifier.as_ref(), &body, None)?;
    Ok(intake_response(&lead))
}

/// `POST /api/v1/leads/public` — unauthenticated lead capture.
pub async fn public_intake(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewLead>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let mut storage = state.storage.lock();
    let lead = service::lead::submit(&mut storage, state.notifier.as_ref(), &body, None)?;
    Ok(intake_response(&lead))
}

/// `GET /api/v1/leads`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Lead>>> {
    let stage = params.stage.as_deref().map(parse_stage).transpose()?;
    let query = LeadQuery { search: params.search, stage };
    let storage = state.storage.lock();
    Ok(Json(storage.list_leads(&query, page_request(params.page, params.size))?))
}

/// `POST /api/v1/leads`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewLead>,
) -> Result<(StatusCode, Json<Lead>)> {
    let mut storage = state.storage.lock();
    let lead = service::lead::submit(&mut storage, state.notifier.as_ref(), &body, user.id)?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// `GET /api/v1/leads/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Lead>> {
    Ok(Json(state.storage.lock().get_lead(id)?))
}

/// `PUT /api/v1/leads/{id}` — merge-patch; absent fields keep their
/// stored values.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<LeadPatch>,
) -> Result<Json<Lead>> {
    let mut storage = state.storage.lock();
    Ok(Json(service::lead::update(&mut storage, id, &patch, user.id)?))
}

/// `PATCH /api/v1/leads/{id}/stage?stage=`
pub async fn update_stage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<StageParams>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Lead>> {
    let stage = parse_stage(&params.stage)?;
    let mut storage = state.storage.lock();
    Ok(Json(service::lead::update_stage(&mut storage, id, stage, user.id)?))
}

/// `DELETE /api/v1/leads/{id}`
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.storage.lock().delete_lead(id, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/leads/stats` — per-stage counts, zero-filled.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    let storage = state.storage.lock();
    let mut by_stage = serde_json::Map::new();
    for stage in LeadStage::ALL {
        by_stage.insert(
            stage.as_str().to_string(),
            serde_json::Value::from(storage.count_leads_by_stage(stage)?),
        );
    }
    Ok(Json(serde_json::json!({
        "total": storage.count_leads()?,
        "byStage": by_stage,
    })))
}
