//! Dashboard handlers.

use crate::error::Result;
use crate::http::AppState;
use crate::service;
use axum::extract::State;
use axum::response::Json;
use std::sync::Arc;

/// `GET /api/v1/dashboard/kpis`
pub async fn kpis(State(state): State<Arc<AppState>>) -> Result<Json<service::dashboard::Kpis>> {
    let storage = state.storage.lock();
    Ok(Json(service::dashboard::kpis(&storage)?))
}
