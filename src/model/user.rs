//! User model.
//!
//! Users authenticate against the stored hash and may be referenced
//! as a lead's assignee. The password hash never serializes.

use serde::Serialize;

/// A user row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// e.g. ADMIN. The admin guard matches on this.
    pub role: String,
    pub enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
