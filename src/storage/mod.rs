//! SQLite storage layer for the CRM.
//!
//! Persistence uses SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - Activity records appended inside the owning transaction
//!
//! # Submodules
//!
//! - [`schema`] - database schema definitions and versioning
//! - [`activities`] - append-only activity log
//! - [`sqlite`] - connection handling, mutation protocol, user store
//! - [`leads`], [`accounts`], [`projects`], [`reminders`] -
//!   per-entity gateways as impl blocks on [`SqliteStorage`]

pub mod accounts;
pub mod activities;
pub mod leads;
pub mod projects;
pub mod reminders;
pub mod schema;
pub mod sqlite;

pub use accounts::AccountQuery;
pub use activities::{Activity, ActivityType};
pub use leads::LeadQuery;
pub use projects::ProjectQuery;
pub use sqlite::{MutationContext, SqliteStorage};
