//! Domain services.
//!
//! Thin validation and orchestration over the storage gateways. Each
//! function takes the storage handle and the acting user; the HTTP
//! layer owns locking and never touches SQL.

pub mod account;
pub mod auth;
pub mod dashboard;
pub mod lead;
pub mod project;
