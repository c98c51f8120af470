//! Account and contact persistence gateway.
//!
//! Accounts carry a unique URL slug and a JSON bag of custom fields.
//! Contacts hang off an account; at most one contact per account is
//! primary, and the promotion swap is a single transaction.

use crate::error::{Error, Result};
use crate::model::{
    generate_slug, Account, AccountPatch, Contact, ContactPatch, EntityKind, EntityRef,
    NewAccount, NewContact, Page, PageRequest,
};
use crate::storage::activities::ActivityType;
use crate::storage::sqlite::SqliteStorage;
use rusqlite::{Connection, OptionalExtension};

/// Optional filters for the paged account list.
#[derive(Debug, Clone, Default)]
pub struct AccountQuery {
    /// Case-insensitive substring over name, email, and company.
    pub search: Option<String>,
    pub status: Option<String>,
}

const ACCOUNT_COLUMNS: &str = "id, name, slug, email, phone, company, address, status, \
     industry, website, tags, notes, custom_fields, created_from_lead_id, created_at, updated_at";

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let custom_fields: String = row.get(12)?;
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        company: row.get(5)?,
        address: row.get(6)?,
        status: row.get(7)?,
        industry: row.get(8)?,
        website: row.get(9)?,
        tags: row.get(10)?,
        notes: row.get(11)?,
        custom_fields: serde_json::from_str(&custom_fields).unwrap_or_default(),
        created_from_lead_id: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn account_by_id(conn: &Connection, id: i64) -> Result<Account> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
    conn.query_row(&sql, [id], account_from_row)
        .optional()?
        .ok_or(Error::NotFound { entity: "Client", id })
}

const CONTACT_COLUMNS: &str = "id, account_id, first_name, last_name, email, phone, \
     position, is_primary, notes, created_at, updated_at";

fn contact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        account_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        position: row.get(6)?,
        is_primary: row.get(7)?,
        notes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn contact_by_id(conn: &Connection, id: i64) -> Result<Contact> {
    let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1");
    conn.query_row(&sql, [id], contact_from_row)
        .optional()?
        .ok_or(Error::NotFound { entity: "Contact", id })
}

fn require_account(conn: &Connection, id: i64) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM accounts WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(Error::NotFound { entity: "Client", id });
    }
    Ok(())
}

/// Deduplicate a slug against existing rows by appending `-2`, `-3`, ...
fn unique_slug(conn: &Connection, base: &str) -> Result<String> {
    let base = if base.is_empty() { "client".to_string() } else { base.to_string() };
    let mut candidate = base.clone();
    let mut suffix = 2;
    loop {
        let taken: Option<i64> = conn
            .query_row("SELECT id FROM accounts WHERE slug = ?1", [&candidate], |row| row.get(0))
            .optional()?;
        if taken.is_none() {
            return Ok(candidate);
        }
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
}

impl SqliteStorage {
    /// Create an account, deriving a unique slug from the name when
    /// none is supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_account(&mut self, input: &NewAccount, actor: Option<i64>) -> Result<Account> {
        let now = chrono::Utc::now().timestamp_millis();
        let base = match &input.slug {
            Some(slug) => generate_slug(slug),
            None => generate_slug(&input.name),
        };
        let status = input.status.as_deref().unwrap_or("ACTIVE");
        let custom_fields = serde_json::to_string(&input.custom_fields)?;

        let id = self.mutate("create_account", actor, |tx, ctx| {
            let slug = unique_slug(tx, &base)?;
            tx.execute(
                "INSERT INTO accounts (name, slug, email, phone, company, address, status, industry, website, tags, notes, custom_fields, created_from_lead_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                rusqlite::params![
                    input.name,
                    slug,
                    input.email,
                    input.phone,
                    input.company,
                    input.address,
                    status,
                    input.industry,
                    input.website,
                    input.tags,
                    input.notes,
                    custom_fields,
                    input.created_from_lead_id,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record(
                EntityRef::new(EntityKind::Account, id),
                ActivityType::Created,
                "Client created",
            );
            Ok(id)
        })?;

        self.get_account(id)
    }

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn get_account(&self, id: i64) -> Result<Account> {
        account_by_id(self.conn(), id)
    }

    /// Get an account by its URL slug.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account carries the slug.
    pub fn get_account_by_slug(&self, slug: &str) -> Result<Account> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE slug = ?1");
        self.conn()
            .query_row(&sql, [slug], account_from_row)
            .optional()?
            .ok_or(Error::NotFound { entity: "Client", id: 0 })
    }

    /// Paged account list with optional search and status filter,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_accounts(&self, query: &AccountQuery, page: PageRequest) -> Result<Page<Account>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let mut param_idx = 1;

        if let Some(search) = query.search.as_deref() {
            conditions.push(format!(
                "(name LIKE ?{param_idx} COLLATE NOCASE OR email LIKE ?{param_idx} COLLATE NOCASE OR company LIKE ?{param_idx} COLLATE NOCASE)"
            ));
            params.push(Box::new(format!("%{search}%")));
            param_idx += 1;
        }
        if let Some(status) = query.status.as_deref() {
            conditions.push(format!("status = ?{param_idx}"));
            params.push(Box::new(status.to_string()));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM accounts{where_clause}"),
            param_refs.as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts{where_clause}
             ORDER BY created_at DESC, id DESC LIMIT ?{param_idx} OFFSET ?{}",
            param_idx + 1
        );
        let mut all_params = param_refs;
        let size = i64::from(page.size);
        let offset = page.offset();
        all_params.push(&size);
        all_params.push(&offset);

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(all_params.as_slice(), account_from_row)?;

        Ok(Page {
            content: rows.collect::<rusqlite::Result<_>>()?,
            page: page.page,
            size: page.size,
            total_elements: total,
        })
    }

    /// Apply a merge-patch to an account. The slug is immutable.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn update_account(
        &mut self,
        id: i64,
        patch: &AccountPatch,
        actor: Option<i64>,
    ) -> Result<Account> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("update_account", actor, |tx, ctx| {
            require_account(tx, id)?;

            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

            if let Some(name) = &patch.name {
                set_clauses.push("name = ?");
                params.push(Box::new(name.clone()));
            }
            if let Some(email) = &patch.email {
                set_clauses.push("email = ?");
                params.push(Box::new(email.clone()));
            }
            if let Some(phone) = &patch.phone {
                set_clauses.push("phone = ?");
                params.push(Box::new(phone.clone()));
            }
            if let Some(company) = &patch.company {
                set_clauses.push("company = ?");
                params.push(Box::new(company.clone()));
            }
            if let Some(address) = &patch.address {
                set_clauses.push("address = ?");
                params.push(Box::new(address.clone()));
            }
            if let Some(status) = &patch.status {
                set_clauses.push("status = ?");
                params.push(Box::new(status.clone()));
            }
            if let Some(industry) = &patch.industry {
                set_clauses.push("industry = ?");
                params.push(Box::new(industry.clone()));
            }
            if let Some(website) = &patch.website {
                set_clauses.push("website = ?");
                params.push(Box::new(website.clone()));
            }
            if let Some(tags) = &patch.tags {
                set_clauses.push("tags = ?");
                params.push(Box::new(tags.clone()));
            }
            if let Some(notes) = &patch.notes {
                set_clauses.push("notes = ?");
                params.push(Box::new(notes.clone()));
            }
            if let Some(fields) = &patch.custom_fields {
                set_clauses.push("custom_fields = ?");
                params.push(Box::new(serde_json::to_string(fields)?));
            }

            if set_clauses.len() > 1 {
                let sql =
                    format!("UPDATE accounts SET {} WHERE id = ?", set_clauses.join(", "));
                params.push(Box::new(id));
                let param_refs: Vec<&dyn rusqlite::ToSql> =
                    params.iter().map(AsRef::as_ref).collect();
                tx.execute(&sql, param_refs.as_slice())?;
                ctx.record(
                    EntityRef::new(EntityKind::Account, id),
                    ActivityType::Updated,
                    "Client updated",
                );
            }

            account_by_id(tx, id)
        })
    }

    /// Hard-delete an account; its contacts go with it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn delete_account(&mut self, id: i64, actor: Option<i64>) -> Result<()> {
        self.mutate("delete_account", actor, |tx, ctx| {
            let rows = tx.execute("DELETE FROM accounts WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::NotFound { entity: "Client", id });
            }
            ctx.record(
                EntityRef::new(EntityKind::Account, id),
                ActivityType::Deleted,
                "Client deleted",
            );
            Ok(())
        })
    }

    /// Total account count.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_accounts(&self) -> Result<i64> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?)
    }

    /// Add a contact to an account. A contact created as primary
    /// demotes any existing primary in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub fn create_contact(
        &mut self,
        account_id: i64,
        input: &NewContact,
        actor: Option<i64>,
    ) -> Result<Contact> {
        let now = chrono::Utc::now().timestamp_millis();

        let id = self.mutate("create_contact", actor, |tx, _ctx| {
            require_account(tx, account_id)?;
            if input.is_primary {
                tx.execute(
                    "UPDATE contacts SET is_primary = 0 WHERE account_id = ?1",
                    [account_id],
                )?;
            }
            tx.execute(
                "INSERT INTO contacts (account_id, first_name, last_name, email, phone, position, is_primary, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    account_id,
                    input.first_name,
                    input.last_name,
                    input.email,
                    input.phone,
                    input.position,
                    input.is_primary,
                    input.notes,
                    now,
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        contact_by_id(self.conn(), id)
    }

    /// All contacts on an account, primary first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub fn list_contacts(&self, account_id: i64) -> Result<Vec<Contact>> {
        require_account(self.conn(), account_id)?;
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE account_id = ?1
             ORDER BY is_primary DESC, last_name, first_name"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([account_id], contact_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Apply a merge-patch to a contact. Primary status is changed
    /// only through [`SqliteStorage::set_primary_contact`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn update_contact(
        &mut self,
        id: i64,
        patch: &ContactPatch,
        actor: Option<i64>,
    ) -> Result<Contact> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("update_contact", actor, |tx, _ctx| {
            contact_by_id(tx, id)?;

            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

            if let Some(first_name) = &patch.first_name {
                set_clauses.push("first_name = ?");
                params.push(Box::new(first_name.clone()));
            }
            if let Some(last_name) = &patch.last_name {
                set_clauses.push("last_name = ?");
                params.push(Box::new(last_name.clone()));
            }
            if let Some(email) = &patch.email {
                set_clauses.push("email = ?");
                params.push(Box::new(email.clone()));
            }
            if let Some(phone) = &patch.phone {
                set_clauses.push("phone = ?");
                params.push(Box::new(phone.clone()));
            }
            if let Some(position) = &patch.position {
                set_clauses.push("position = ?");
                params.push(Box::new(position.clone()));
            }
            if let Some(notes) = &patch.notes {
                set_clauses.push("notes = ?");
                params.push(Box::new(notes.clone()));
            }

            if set_clauses.len() > 1 {
                let sql =
                    format!("UPDATE contacts SET {} WHERE id = ?", set_clauses.join(", "));
                params.push(Box::new(id));
                let param_refs: Vec<&dyn rusqlite::ToSql> =
                    params.iter().map(AsRef::as_ref).collect();
                tx.execute(&sql, param_refs.as_slice())?;
            }

            contact_by_id(tx, id)
        })
    }

    /// Promote one contact to primary, demoting every other contact on
    /// the same account atomically.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the contact does not exist.
    pub fn set_primary_contact(&mut self, id: i64, actor: Option<i64>) -> Result<Contact> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("set_primary_contact", actor, |tx, ctx| {
            let contact = contact_by_id(tx, id)?;
            tx.execute(
                "UPDATE contacts SET is_primary = 0, updated_at = ?1 WHERE account_id = ?2 AND is_primary = 1",
                rusqlite::params![now, contact.account_id],
            )?;
            tx.execute(
                "UPDATE contacts SET is_primary = 1, updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now, id],
            )?;
            ctx.record(
                EntityRef::new(EntityKind::Account, contact.account_id),
                ActivityType::PrimaryContactChanged,
                &format!("Primary contact set to {}", contact.full_name()),
            );
            contact_by_id(tx, id)
        })
    }

    /// Hard-delete a contact.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist.
    pub fn delete_contact(&mut self, id: i64, actor: Option<i64>) -> Result<()> {
        self.mutate("delete_contact", actor, |tx, _ctx| {
            let rows = tx.execute("DELETE FROM contacts WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::NotFound { entity: "Contact", id });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CustomFields;

    fn sample_account(name: &str) -> NewAccount {
        NewAccount {
            name: name.into(),
            email: "ops@acme.test".into(),
            slug: None,
            phone: None,
            company: None,
            address: None,
            status: None,
            industry: None,
            website: None,
            tags: None,
            notes: None,
            custom_fields: CustomFields::default(),
            created_from_lead_id: None,
        }
    }

    fn sample_contact(first: &str, primary: bool) -> NewContact {
        NewContact {
            first_name: first.into(),
            last_name: "Doe".into(),
            email: None,
            phone: None,
            position: None,
            is_primary: primary,
            notes: None,
        }
    }

    #[test]
    fn test_slug_derived_and_deduplicated() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let first = storage.create_account(&sample_account("ACME Corporation!"), None).unwrap();
        assert_eq!(first.slug, "acme-corporation");

        let second = storage.create_account(&sample_account("ACME Corporation"), None).unwrap();
        assert_eq!(second.slug, "acme-corporation-2");

        let by_slug = storage.get_account_by_slug("acme-corporation-2").unwrap();
        assert_eq!(by_slug.id, second.id);
    }

    #[test]
    fn test_custom_fields_round_trip() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut input = sample_account("Fields Inc");
        input.custom_fields = serde_json::from_value(serde_json::json!({
            "tier": "gold",
            "seats": 12,
            "trial": false,
        }))
        .unwrap();

        let account = storage.create_account(&input, None).unwrap();
        let fetched = storage.get_account(account.id).unwrap();
        assert_eq!(fetched.custom_fields, input.custom_fields);
    }

    #[test]
    fn test_update_keeps_slug() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account = storage.create_account(&sample_account("Slug Stays"), None).unwrap();

        let patch = AccountPatch { name: Some("Renamed".into()), ..AccountPatch::default() };
        let updated = storage.update_account(account.id, &patch, None).unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.slug, "slug-stays");
    }

    #[test]
    fn test_primary_contact_swap_is_exclusive() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account = storage.create_account(&sample_account("Contacts Co"), None).unwrap();

        let jane = storage.create_contact(account.id, &sample_contact("Jane", true), None).unwrap();
        let john = storage.create_contact(account.id, &sample_contact("John", false), None).unwrap();
        assert!(jane.is_primary);

        let promoted = storage.set_primary_contact(john.id, None).unwrap();
        assert!(promoted.is_primary);

        let contacts = storage.list_contacts(account.id).unwrap();
        let primaries: Vec<_> = contacts.iter().filter(|c| c.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, john.id);
    }

    #[test]
    fn test_delete_account_cascades_to_contacts() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let account = storage.create_account(&sample_account("Doomed"), None).unwrap();
        storage.create_contact(account.id, &sample_contact("Jane", false), None).unwrap();

        storage.delete_account(account.id, None).unwrap();
        assert!(storage.get_account(account.id).is_err());

        let orphans: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_contact_on_missing_account_fails() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage.create_contact(404, &sample_contact("Ghost", false), None).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Client", id: 404 }));
    }
}
