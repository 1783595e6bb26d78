//! REST API client module for the KPI-tter service.
//!
//! This module provides the `ApiClient` for registering, logging in and
//! reading/writing posts. Authenticated endpoints use HTTP Basic auth built
//! from the shared `CredentialStore`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
