//! Authentication module for managing credentials and the login state.
//!
//! This module provides:
//! - `CredentialStore`: the only owner of the stored username/password
//! - `storage`: keychain, file and in-memory backends for the store
//! - `Session`: register/login/logout on top of the store and `ApiClient`
//!
//! There is no token and no expiry: HTTP Basic auth sends the stored pair
//! with every request until the server rejects it.

pub mod credentials;
pub mod session;
pub mod storage;

pub use credentials::{CredentialStore, Credentials};
pub use session::{Session, SessionError};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SecretStorage, StorageError};
