//! Activity log handlers.

use crate::error::{Error, Result};
use crate::http::{page_request, AppState};
use crate::model::{EntityKind, EntityRef, Page};
use crate::storage::activities::activities_for_entity;
use crate::storage::Activity;
use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub entity_type: String,
    pub entity_id: i64,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// `GET /api/v1/activities?entityType=&entityId=` — newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Activity>>> {
    let kind = EntityKind::parse(&params.entity_type)
        .ok_or_else(|| Error::validation("entityType", "Unknown entity type"))?;
    let storage = state.storage.lock();
    Ok(Json(activities_for_entity(
        storage.conn(),
        EntityRef::new(kind, params.entity_id),
        page_request(params.page, params.size),
    )?))
}
