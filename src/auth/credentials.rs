//! Credential storage
//!
//! Loads the username/password table from a flat JSON file once at
//! startup and answers login checks for the lifetime of the server.

use config::{Config, ConfigError, File, FileFormat};
use std::collections::HashMap;

use crate::error::AuthError;

/// Read-only username to password map shared by all sessions.
#[derive(Debug, Clone)]
pub struct CredentialTable {
    users: HashMap<String, String>,
}

impl CredentialTable {
    /// Load credentials from a JSON file of `"username": "password"` pairs.
    ///
    /// Keys are normalized to lowercase by the loader, so usernames are
    /// expected in lowercase.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::new(path, FileFormat::Json))
            .build()?;
        let users: HashMap<String, String> = settings.try_deserialize()?;
        Ok(Self { users })
    }

    /// Build a table directly from username/password pairs.
    pub fn from_users(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Checks the password for the given username.
    pub fn verify(&self, username: &str, password: &str) -> Result<(), AuthError> {
        match self.users.get(username) {
            Some(stored) if stored == password => Ok(()),
            Some(_) => Err(AuthError::InvalidPassword(username.to_string())),
            None => Err(AuthError::UserNotFound(username.to_string())),
        }
    }
}
