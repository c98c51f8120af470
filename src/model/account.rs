//! Account (client) and contact models.
//!
//! An account is a company the business works with. Accounts own
//! contacts and projects; at most one contact per account carries the
//! primary flag.

use super::CustomFields;
use serde::{Deserialize, Serialize};

/// An account row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub name: String,
    /// URL-friendly identifier, derived once from the name at creation.
    pub slug: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    /// Lifecycle tag, e.g. ACTIVE / INACTIVE. Defaults to ACTIVE.
    pub status: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub custom_fields: CustomFields,
    pub created_from_lead_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating an account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Explicit slug; derived from the name when absent.
    pub slug: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub custom_fields: CustomFields,
    pub created_from_lead_id: Option<i64>,
}

/// Merge-patch for an account. The slug is immutable after creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
    pub custom_fields: Option<CustomFields>,
}

/// A contact person attached to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub account_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub is_primary: bool,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Contact {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input for creating a contact under an account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    pub notes: Option<String>,
}

/// Merge-patch for a contact. Promotion to primary goes through the
/// dedicated endpoint so the old primary is unset atomically.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub notes: Option<String>,
}

/// Generate a URL-friendly slug from a name.
///
/// Lowercase, strip everything outside `[a-z0-9 -]`, collapse
/// whitespace runs to single hyphens, collapse repeated hyphens,
/// trim leading/trailing hyphens. An empty or all-symbol name yields
/// an empty slug.
#[must_use]
pub fn generate_slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
        // anything else is stripped
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_basic() {
        assert_eq!(generate_slug("ACME Corporation!"), "acme-corporation");
    }

    #[test]
    fn test_slug_collapses_whitespace() {
        assert_eq!(generate_slug("  multiple   spaces "), "multiple-spaces");
    }

    #[test]
    fn test_slug_empty() {
        assert_eq!(generate_slug(""), "");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn test_slug_collapses_hyphens() {
        assert_eq!(generate_slug("a -- b"), "a-b");
        assert_eq!(generate_slug("-edge-"), "edge");
    }

    #[test]
    fn test_slug_keeps_digits() {
        assert_eq!(generate_slug("Studio 54"), "studio-54");
    }

    #[test]
    fn test_full_name() {
        let contact = Contact {
            id: 1,
            account_id: 1,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: None,
            phone: None,
            position: None,
            is_primary: true,
            notes: None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(contact.full_name(), "Ada Lovelace");
    }
}
