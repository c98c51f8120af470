//! HTTP surface.
//!
//! Route table, shared state, bearer-token guard, and the mapping
//! from [`Error`] to the JSON error envelope. Handlers live in the
//! per-resource submodules; none of them touch SQL directly.
//!
//! Storage sits behind a `parking_lot::Mutex`; handlers do all
//! storage work synchronously and never hold the guard across an
//! await point.

pub mod activities;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod leads;
pub mod projects;
pub mod reminders;

use crate::auth::TokenSigner;
use crate::error::Error;
use crate::model::PageRequest;
use crate::notify::SharedNotifier;
use crate::storage::SqliteStorage;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::error;

/// Shared application state.
pub struct AppState {
    pub storage: Mutex<SqliteStorage>,
    pub signer: TokenSigner,
    pub notifier: SharedNotifier,
}

impl AppState {
    #[must_use]
    pub fn new(storage: SqliteStorage, signer: TokenSigner, notifier: SharedNotifier) -> Arc<Self> {
        Arc::new(Self { storage: Mutex::new(storage), signer, notifier })
    }
}

/// Authenticated principal, inserted by the token guard.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Option<i64>,
    pub role: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(self.envelope())).into_response()
    }
}

pub(crate) fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Reject requests without a valid ADMIN bearer token; stash the
/// principal as a request extension for handlers.
async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let token = bearer_token(&request).ok_or(Error::Authentication)?;
    let claims = state.signer.verify(token)?;
    if claims.role != "ADMIN" {
        return Err(Error::Authentication);
    }
    request
        .extensions_mut()
        .insert(AuthUser { id: claims.user_id(), role: claims.role });
    Ok(next.run(request).await)
}

/// Translate optional query parameters into a clamped page request.
#[must_use]
pub(crate) fn page_request(page: Option<u32>, size: Option<u32>) -> PageRequest {
    PageRequest::new(page.unwrap_or(0), size.unwrap_or(20))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the full application router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let open = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/contact", post(leads::contact_intake))
        .route("/api/v1/leads/public", post(leads::public_intake))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/me", get(auth::me));

    let admin = Router::new()
        .route("/api/v1/leads", get(leads::list).post(leads::create))
        .route(
            "/api/v1/leads/{id}",
            get(leads::get_one).put(leads::update).delete(leads::remove),
        )
        .route("/api/v1/leads/{id}/stage", patch(leads::update_stage))
        .route("/api/v1/leads/stats", get(leads::stats))
        .route("/api/v1/clients", get(clients::list).post(clients::create))
        .route("/api/v1/clients/slug/{slug}", get(clients::get_by_slug))
        .route(
            "/api/v1/clients/{id}",
            get(clients::get_one).put(clients::update).delete(clients::remove),
        )
        .route(
            "/api/v1/clients/{id}/contacts",
            get(clients::list_contacts).post(clients::add_contact),
        )
        .route(
            "/api/v1/clients/contacts/{id}",
            put(clients::update_contact).delete(clients::remove_contact),
        )
        .route("/api/v1/clients/contacts/{id}/primary", put(clients::set_primary_contact))
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get_one).put(projects::update).delete(projects::remove),
        )
        .route(
            "/api/v1/projects/{id}/milestones",
            get(projects::list_milestones).post(projects::add_milestone),
        )
        .route(
            "/api/v1/projects/milestones/{id}",
            put(projects::update_milestone).delete(projects::remove_milestone),
        )
        .route(
            "/api/v1/projects/{id}/tasks",
            get(projects::list_tasks).post(projects::add_task),
        )
        .route(
            "/api/v1/projects/tasks/{id}",
            put(projects::update_task).delete(projects::remove_task),
        )
        .route("/api/v1/activities", get(activities::list))
        .route("/api/v1/reminders", get(reminders::list).post(reminders::create))
        .route("/api/v1/reminders/due", get(reminders::due))
        .route("/api/v1/reminders/{id}/complete", put(reminders::complete))
        .route("/api/v1/reminders/{id}", delete(reminders::remove))
        .route("/api/v1/dashboard/kpis", get(dashboard::kpis))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    open.merge(admin).with_state(state)
}
