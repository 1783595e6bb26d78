use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, warn};

use super::storage::{SecretStorage, StorageError};

/// Storage key for the username
pub const USERNAME_KEY: &str = "kpitter_username";

/// Storage key for the password
pub const PASSWORD_KEY: &str = "kpitter_password";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Value for the `Authorization` header: `Basic base64(username:password)`
    pub fn basic_auth_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", token)
    }

    /// A single sensitive `Authorization` entry for this pair
    pub fn auth_header(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&self.basic_auth_value()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Stored credentials produced an invalid header"),
        }
        headers
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Owner of the current user's credentials.
///
/// Nothing else keeps a copy: callers ask the store each time they need a
/// header, so a logout (or a rejected request) takes effect immediately.
pub struct CredentialStore {
    storage: Box<dyn SecretStorage>,
}

impl CredentialStore {
    pub fn new(storage: Box<dyn SecretStorage>) -> Self {
        Self { storage }
    }

    /// Persist both fields, replacing any previous pair.
    pub fn save(&self, username: &str, password: &str) -> Result<(), StorageError> {
        self.storage.set(USERNAME_KEY, username)?;
        if let Err(e) = self.storage.set(PASSWORD_KEY, password) {
            // Never leave a username behind without its password
            if let Err(rollback) = self.storage.remove(USERNAME_KEY) {
                warn!(error = %rollback, "Failed to roll back username after password write failed");
            }
            return Err(e);
        }
        debug!(username, "Credentials saved");
        Ok(())
    }

    /// Both fields, or `None` if either is missing or empty.
    pub fn load(&self) -> Option<Credentials> {
        let username = self.read(USERNAME_KEY)?;
        let password = self.read(PASSWORD_KEY)?;
        Some(Credentials { username, password })
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential");
                None
            }
        }
    }

    /// Remove both fields. Safe to call when nothing is stored.
    pub fn clear(&self) -> Result<(), StorageError> {
        let username = self.storage.remove(USERNAME_KEY);
        let password = self.storage.remove(PASSWORD_KEY);
        username.and(password)
    }

    pub fn username(&self) -> Option<String> {
        self.load().map(|c| c.username)
    }

    pub fn has_credentials(&self) -> bool {
        self.load().is_some()
    }

    /// Headers for an authenticated request; empty when nobody is logged in.
    pub fn auth_header(&self) -> HeaderMap {
        self.load()
            .map(|credentials| credentials.auth_header())
            .unwrap_or_default()
    }

    /// Clear the store only if it still holds `rejected`.
    /// Returns whether anything was cleared; a pair saved since is kept.
    pub fn clear_if_current(&self, rejected: &Credentials) -> Result<bool, StorageError> {
        if self.load().as_ref() != Some(rejected) {
            return Ok(false);
        }
        self.clear()?;
        Ok(true)
    }
}
