//! Server configuration.
//!
//! Everything is resolved from CLI flags and `CRM_*` environment
//! variables; there is no config file. The database lives at a single
//! global location under the home directory unless overridden.

use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Placeholder signing secret for local development. Never suitable
/// for a deployment; a warning is logged whenever it is used.
const DEV_JWT_SECRET: &str = "crm-dev-secret-change-me";

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    /// Webhook for new-lead notifications; none means no delivery.
    pub notify_url: Option<String>,
    pub admin: AdminSeed,
}

/// Credentials used to seed the first admin user on an empty database.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            email: "admin@localhost".to_string(),
            password: "admin".to_string(),
        }
    }
}

/// Global data directory, `~/.crm-server`.
#[must_use]
pub fn global_data_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".crm-server"))
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the database path.
///
/// Priority: explicit CLI flag, then `CRM_TEST_DB` (isolated test
/// database), then `CRM_DB`, then the global location
/// `~/.crm-server/data/crm.db`.
///
/// # Errors
///
/// Returns a config error when no home directory can be determined
/// and nothing else supplies a path.
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env_nonempty("CRM_TEST_DB") {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = env_nonempty("CRM_DB") {
        return Ok(PathBuf::from(path));
    }
    global_data_dir()
        .map(|dir| dir.join("data").join("crm.db"))
        .ok_or_else(|| Error::Config("cannot determine home directory; set CRM_DB".to_string()))
}

impl Config {
    /// Build the configuration from CLI overrides and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns a config error for an unparseable bind address or TTL,
    /// or when no database path can be resolved.
    pub fn resolve(db_flag: Option<&Path>, bind_flag: Option<&str>) -> Result<Self> {
        let db_path = resolve_db_path(db_flag)?;

        let bind_raw = bind_flag
            .map(ToString::to_string)
            .or_else(|| env_nonempty("CRM_BIND"))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid bind address: {bind_raw}")))?;

        let jwt_secret = env_nonempty("CRM_JWT_SECRET").unwrap_or_else(|| {
            warn!("CRM_JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_string()
        });

        let token_ttl_secs = match env_nonempty("CRM_TOKEN_TTL_SECS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or_else(|| Error::Config(format!("invalid CRM_TOKEN_TTL_SECS: {raw}")))?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        let admin = AdminSeed {
            username: env_nonempty("CRM_ADMIN_USER").unwrap_or_else(|| "admin".to_string()),
            email: env_nonempty("CRM_ADMIN_EMAIL").unwrap_or_else(|| "admin@localhost".to_string()),
            password: env_nonempty("CRM_ADMIN_PASSWORD").unwrap_or_else(|| "admin".to_string()),
        };

        Ok(Self {
            db_path,
            bind,
            jwt_secret,
            token_ttl_secs,
            notify_url: env_nonempty("CRM_NOTIFY_URL"),
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/tmp/explicit.db");
        let result = resolve_db_path(Some(&explicit)).unwrap();
        assert_eq!(result, explicit);
    }

    #[test]
    fn test_global_path_layout() {
        if let Some(dir) = global_data_dir() {
            assert!(dir.ends_with(".crm-server"));
        }
    }
}
