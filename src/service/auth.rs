//! Login, token issuance, and first-run admin seeding.

use crate::auth::{hash_password, verify_password, TokenSigner};
use crate::config::AdminSeed;
use crate::error::{Error, Result};
use crate::model::User;
use crate::storage::SqliteStorage;
use serde::Serialize;
use tracing::{info, warn};

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// Resolve a principal by email first, then username, and check the
/// password. Unknown user, wrong password, and disabled account all
/// collapse into the same `Authentication` error so a caller cannot
/// probe which identifiers exist.
///
/// # Errors
///
/// Returns `Authentication` on any failure.
pub fn authenticate(storage: &SqliteStorage, identifier: &str, password: &str) -> Result<User> {
    let user = match storage.user_by_email(identifier)? {
        Some(user) => Some(user),
        None => storage.user_by_username(identifier)?,
    };
    let Some(user) = user else {
        // Burn a hash so the miss costs the same as a mismatch.
        let _ = verify_password(password, &hash_password("missing"));
        return Err(Error::Authentication);
    };
    if !user.enabled || !verify_password(password, &user.password_hash) {
        return Err(Error::Authentication);
    }
    Ok(user)
}

/// Authenticate and issue a session token.
///
/// # Errors
///
/// Returns `Authentication` on bad credentials.
pub fn login(
    storage: &SqliteStorage,
    signer: &TokenSigner,
    identifier: &str,
    password: &str,
) -> Result<LoginResponse> {
    let user = authenticate(storage, identifier, password)?;
    let token = signer.issue(user.id, &user.role)?;
    info!(user_id = user.id, username = %user.username, "login succeeded");
    Ok(LoginResponse { token, username: user.username, email: user.email, role: user.role })
}

/// Insert the configured admin user when the users table is empty.
/// A populated table is left untouched.
///
/// # Errors
///
/// Returns a storage error.
pub fn seed_admin(storage: &mut SqliteStorage, seed: &AdminSeed) -> Result<()> {
    if storage.count_users()? > 0 {
        return Ok(());
    }
    let hash = hash_password(&seed.password);
    let user = storage.create_user(&seed.username, &seed.email, &hash, "ADMIN")?;
    warn!(username = %user.username, "seeded initial admin user; change the password");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_storage() -> SqliteStorage {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let seed = AdminSeed {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: "hunter2".into(),
        };
        seed_admin(&mut storage, &seed).unwrap();
        storage
    }

    #[test]
    fn test_login_by_email_and_username() {
        let storage = seeded_storage();
        let signer = TokenSigner::new(b"test-secret", 3600);

        let by_email = login(&storage, &signer, "admin@example.com", "hunter2").unwrap();
        assert_eq!(by_email.username, "admin");
        assert_eq!(by_email.role, "ADMIN");

        let by_username = login(&storage, &signer, "admin", "hunter2").unwrap();
        let claims = signer.verify(&by_username.token).unwrap();
        assert_eq!(claims.role, "ADMIN");
    }

    #[test]
    fn test_failures_are_indistinguishable() {
        let storage = seeded_storage();

        let unknown = authenticate(&storage, "nobody@example.com", "hunter2").unwrap_err();
        let wrong = authenticate(&storage, "admin", "wrong").unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(unknown, Error::Authentication));
        assert!(matches!(wrong, Error::Authentication));
    }

    #[test]
    fn test_disabled_user_rejected() {
        let storage = seeded_storage();
        storage
            .conn()
            .execute("UPDATE users SET enabled = 0 WHERE username = 'admin'", [])
            .unwrap();
        assert!(authenticate(&storage, "admin", "hunter2").is_err());
    }

    #[test]
    fn test_seed_skips_populated_table() {
        let mut storage = seeded_storage();
        let other = AdminSeed {
            username: "intruder".into(),
            email: "intruder@example.com".into(),
            password: "pw".into(),
        };
        seed_admin(&mut storage, &other).unwrap();
        assert_eq!(storage.count_users().unwrap(), 1);
    }
}
