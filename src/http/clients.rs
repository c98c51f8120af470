//! Client account and contact handlers.

use crate::error::Result;
use crate::http::{page_request, AppState, AuthUser};
use crate::model::{Account, AccountPatch, Contact, ContactPatch, NewAccount, NewContact, Page};
use crate::service;
use crate::storage::AccountQuery;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// `GET /api/v1/clients`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Account>>> {
    let query = AccountQuery { search: params.search, status: params.status };
    let storage = state.storage.lock();
    Ok(Json(storage.list_accounts(&query, page_request(params.page, params.size))?))
}

/// `POST /api/v1/clients`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>)> {
    let mut storage = state.storage.lock();
    let account = service::account::create(&mut storage, &body, user.id)?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// `GET /api/v1/clients/slug/{slug}`
pub async fn get_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Account>> {
    Ok(Json(state.storage.lock().get_account_by_slug(&slug)?))
}

/// `GET /api/v1/clients/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Account>> {
    Ok(Json(state.storage.lock().get_account(id)?))
}

/// `PUT /api/v1/clients/{id}` — merge-patch; the slug never changes.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<AccountPatch>,
) -> Result<Json<Account>> {
    Ok(Json(state.storage.lock().update_account(id, &patch, user.id)?))
}

/// `DELETE /api/v1/clients/{id}`
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.storage.lock().delete_account(id, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/clients/{id}/contacts`
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Contact>>> {
    Ok(Json(state.storage.lock().list_contacts(id)?))
}

/// `POST /api/v1/clients/{id}/contacts`
pub async fn add_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewContact>,
) -> Result<(StatusCode, Json<Contact>)> {
    let mut storage = state.storage.lock();
    let contact = service::account::add_contact(&mut storage, id, &body, user.id)?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// `PUT /api/v1/clients/contacts/{id}`
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<ContactPatch>,
) -> Result<Json<Contact>> {
    Ok(Json(state.storage.lock().update_contact(id, &patch, user.id)?))
}

/// `PUT /api/v1/clients/contacts/{id}/primary`
pub async fn set_primary_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Contact>> {
    Ok(Json(state.storage.lock().set_primary_contact(id, user.id)?))
}

/// `DELETE /api/v1/clients/contacts/{id}`
pub async fn remove_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.storage.lock().delete_contact(id, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}
