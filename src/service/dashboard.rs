//! Dashboard KPI aggregation.

use crate::error::Result;
use crate::model::{LeadStage, PROJECT_STATUSES};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::collections::BTreeMap;

/// Milliseconds in the "recent leads" lookback window.
const RECENT_WINDOW_MILLIS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Pipeline and project KPIs for the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_leads: i64,
    /// Every stage appears, zero-filled.
    pub leads_by_stage: BTreeMap<String, i64>,
    /// Every known status appears, zero-filled.
    pub projects_by_status: BTreeMap<String, i64>,
    pub total_clients: i64,
    pub active_projects: i64,
    pub conversion_rate: f64,
    pub loss_rate: f64,
    pub recent_leads: i64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn rate(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

/// Compute all KPIs, anchored to the current time for the recent-lead
/// window.
///
/// # Errors
///
/// Returns a storage error.
pub fn kpis(storage: &SqliteStorage) -> Result<Kpis> {
    let total_leads = storage.count_leads()?;

    let mut leads_by_stage = BTreeMap::new();
    for stage in LeadStage::ALL {
        leads_by_stage.insert(stage.as_str().to_string(), storage.count_leads_by_stage(stage)?);
    }

    let mut projects_by_status = BTreeMap::new();
    for status in PROJECT_STATUSES {
        projects_by_status.insert(status.to_string(), storage.count_projects_by_status(status)?);
    }

    let active_projects = projects_by_status["IN_PROGRESS"]
        + projects_by_status["DISCOVERY"]
        + projects_by_status["DEVELOPMENT"];

    let won = leads_by_stage["WON"];
    let lost = leads_by_stage["LOST"];
    let since = chrono::Utc::now().timestamp_millis() - RECENT_WINDOW_MILLIS;

    Ok(Kpis {
        total_leads,
        leads_by_stage,
        projects_by_status,
        total_clients: storage.count_accounts()?,
        active_projects,
        conversion_rate: rate(won, total_leads),
        loss_rate: rate(lost, total_leads),
        recent_leads: storage.count_leads_created_since(since)?,
    })
}
