//! Client account operations.

use crate::error::{Error, Result};
use crate::model::{Account, NewAccount, NewContact};
use crate::storage::SqliteStorage;
use std::collections::BTreeMap;

fn validate(input: &NewAccount) -> Result<()> {
    let mut fields = BTreeMap::new();
    if input.name.trim().is_empty() {
        fields.insert("name".to_string(), "Name is required".to_string());
    }
    let email = input.email.trim();
    if email.is_empty() {
        fields.insert("email".to_string(), "Email is required".to_string());
    } else if !email.contains('@') {
        fields.insert("email".to_string(), "Email must be valid".to_string());
    }
    if fields.is_empty() { Ok(()) } else { Err(Error::Validation { fields }) }
}

fn validate_contact(input: &NewContact) -> Result<()> {
    let mut fields = BTreeMap::new();
    if input.first_name.trim().is_empty() {
        fields.insert("firstName".to_string(), "First name is required".to_string());
    }
    if input.last_name.trim().is_empty() {
        fields.insert("lastName".to_string(), "Last name is required".to_string());
    }
    if fields.is_empty() { Ok(()) } else { Err(Error::Validation { fields }) }
}

/// Validate and create an account.
///
/// # Errors
///
/// Returns a validation or storage error.
pub fn create(
    storage: &mut SqliteStorage,
    input: &NewAccount,
    actor: Option<i64>,
) -> Result<Account> {
    validate(input)?;
    storage.create_account(input, actor)
}

/// Validate and add a contact to an account.
///
/// # Errors
///
/// Returns a validation error, or `NotFound` for a missing account.
pub fn add_contact(
    storage: &mut SqliteStorage,
    account_id: i64,
    input: &NewContact,
    actor: Option<i64>,
) -> Result<crate::model::Contact> {
    validate_contact(input)?;
    storage.create_contact(account_id, input, actor)
}
