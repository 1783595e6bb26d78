//! Core library for kpitter, a terminal client for the KPI-tter
//! micro-blogging API.
//!
//! - `api`: HTTP client and error normalization
//! - `auth`: credential storage and the login/logout session controller
//! - `config`: persisted application settings
//! - `models`: posts and user profiles as returned by the server

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, Credentials, Session, SessionError};
pub use config::Config;
