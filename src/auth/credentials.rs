//! User records and password authentication.
//!
//! Passwords are stored as `salt$digest` with a per-user random salt and a
//! SHA-256 digest, and compared in constant time. Authentication fails with
//! one uniform error for unknown users, wrong passwords, and disabled
//! accounts so callers cannot enumerate identities.

use crate::error::GateError;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// A provisioned user record. Immutable during a request.
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub disabled: bool,
}

impl User {
    pub fn new(username: &str, password: &str, roles: &[&str]) -> Self {
        Self {
            username: username.to_string(),
            password_hash: hash_password(password),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            disabled: false,
        }
    }
}

/// Hash a password with a fresh random salt, producing `salt$digest` hex.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

/// Verify a password against a stored `salt$digest` hash in constant time.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };

    let mut hasher = Sha256::new();
    hasher.update(&salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    digest.as_slice().ct_eq(&expected).unwrap_u8() == 1
}

/// Source of user records. Production wiring supplies a real store; the
/// static store below doubles as the seed-data implementation and the test
/// double.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, username: &str) -> Option<User>;
}

/// In-memory credential store seeded at startup.
#[derive(Default)]
pub struct StaticCredentialStore {
    users: HashMap<String, User>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.username.clone(), user);
        self
    }

    /// The provisioned identities shipped with the service.
    pub fn seeded() -> Self {
        Self::new()
            .with_user(User::new(
                "centralbank",
                "admin123",
                &["admin", "fraud_analyst"],
            ))
            .with_user(User::new("analyst", "analyst123", &["fraud_analyst"]))
    }
}

impl CredentialStore for StaticCredentialStore {
    fn lookup(&self, username: &str) -> Option<User> {
        self.users.get(username).cloned()
    }
}

/// Authenticates identity/password pairs against a credential store.
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Authenticate a caller. The failure is uniform across unknown user,
    /// wrong password, and disabled account.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, GateError> {
        let user = self
            .store
            .lookup(username)
            .ok_or(GateError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(GateError::InvalidCredentials);
        }
        if user.disabled {
            return Err(GateError::InvalidCredentials);
        }

        Ok(user)
    }
}
