use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::models::UserProfile;

use super::storage::{SecretStorage, StorageError};
use super::CredentialStore;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to store credentials: {0}")]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Short message suitable for a form's error line
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Login state on top of the shared credential store.
///
/// Two states: anonymous (nothing stored) and authenticated (a pair is
/// stored). Only a successful `login` moves to authenticated; `logout`, or
/// any authenticated request the server answers with 401, moves back.
#[derive(Clone)]
pub struct Session {
    api: ApiClient,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Build the credential store and API client from config
    pub fn from_config(config: &Config, storage: Box<dyn SecretStorage>) -> Result<Self, ApiError> {
        let credentials = Arc::new(CredentialStore::new(storage));
        Ok(Self::new(ApiClient::new(config, credentials)?))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.api.credentials()
    }

    /// Create an account. Does not log in or store anything.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Option<UserProfile>, SessionError> {
        validate(username, password)?;
        match self.api.register(username, password, full_name).await {
            Ok(user) => {
                info!(username, "Registered new account");
                Ok(user)
            }
            Err(ApiError::Conflict(_)) => Err(SessionError::UsernameTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify the pair with the server, then keep it for later requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        validate(username, password)?;
        match self.api.login(username, password).await {
            Ok(()) => {}
            Err(ApiError::Unauthorized) => return Err(SessionError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        }
        self.credentials().save(username, password)?;
        info!(username, "Login successful");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        let username = self.current_username();
        self.credentials().clear()?;
        info!(username = ?username, "Logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().has_credentials()
    }

    pub fn current_username(&self) -> Option<String> {
        self.credentials().username()
    }

    /// Profile of the logged-in user, fetched from the server
    pub async fn whoami(&self) -> Result<UserProfile, SessionError> {
        if !self.is_authenticated() {
            warn!("whoami called without stored credentials");
            return Err(SessionError::NotLoggedIn);
        }
        Ok(self.api.current_user().await?)
    }
}

fn validate(username: &str, password: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::Validation("username"));
    }
    if password.is_empty() {
        return Err(ApiError::Validation("password"));
    }
    Ok(())
}
