//! CRM backend server.
//!
//! A small-business CRM: leads, accounts (clients), projects with
//! milestones and tasks, reminders, an append-only activity log, and
//! JWT-authenticated admin endpoints, all over an embedded SQLite
//! database.
//!
//! # Architecture
//!
//! - [`http`] - axum router and request handlers
//! - [`service`] - domain services (validation, merge-patch, audit)
//! - [`storage`] - SQLite persistence layer
//! - [`model`] - entity types, enums, patch types
//! - [`auth`] - password verification and JWT session tokens
//! - [`notify`] - best-effort lead notification dispatch
//! - [`config`] - configuration resolution
//! - [`error`] - error taxonomy and HTTP mapping

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod notify;
pub mod service;
pub mod storage;

pub use error::{Error, Result};
