//! API client for communicating with the KPI-tter REST API.
//!
//! Every endpoint helper is a fixed path template over a single request
//! primitive, [`ApiClient::request`], which owns header construction, body
//! encoding and error normalization.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, Credentials};
use crate::config::Config;
use crate::models::{LoginRequest, NewPost, Post, RegisterRequest, UserProfile};

use super::ApiError;

/// API client for KPI-tter.
/// Clone is cheap - reqwest::Client and the credential store are both shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    trailing_slash: bool,
    credentials: Arc<CredentialStore>,
}

impl ApiClient {
    pub fn new(config: &Config, credentials: Arc<CredentialStore>) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{} ({})", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            client,
            base_url,
            trailing_slash: config.trailing_slash,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the full URL for a path made of `segments`.
    /// Each segment is percent-encoded as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
            if self.trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    /// Send one request and decode the response.
    ///
    /// Returns `Ok(None)` for 204 No Content (or any empty success body), so
    /// callers can tell "no value" apart from an empty JSON object.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        requires_auth: bool,
    ) -> Result<Option<Value>, ApiError> {
        let url = self.endpoint(segments)?;
        let mut builder = self.client.request(method.clone(), url.clone());

        // The pair actually sent, so a 401 can only revoke that pair
        let sent = if requires_auth {
            self.credentials.load()
        } else {
            None
        };
        if let Some(ref credentials) = sent {
            builder = builder.headers(credentials.auth_header());
        }

        if let Some(body) = body {
            let payload = serde_json::to_value(body).map_err(ApiError::Encode)?;
            if !payload.is_null() {
                let bytes = serde_json::to_vec(&payload).map_err(ApiError::Encode)?;
                builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
            }
        }

        debug!(%method, %url, requires_auth, "Sending request");

        let response = builder.send().await.map_err(ApiError::Network)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%method, %url, status = status.as_u16(), "Request failed");
            if status == StatusCode::UNAUTHORIZED {
                if let Some(ref rejected) = sent {
                    self.forget_rejected_credentials(rejected);
                }
            }
            return Err(ApiError::from_status(status, &body));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response.text().await.map_err(ApiError::Network)?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ApiError::InvalidResponse(format!("{} {}: {}", method, url, e)))
    }

    /// Stale credentials would fail every following call, so drop them.
    fn forget_rejected_credentials(&self, rejected: &Credentials) {
        match self.credentials.clear_if_current(rejected) {
            Ok(true) => {
                info!(username = %rejected.username, "Stored credentials were rejected, signing out")
            }
            Ok(false) => {
                debug!(username = %rejected.username, "Rejected credentials were already replaced")
            }
            Err(e) => warn!(error = %e, "Failed to clear rejected credentials"),
        }
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let value = self
            .request::<Value>(Method::GET, segments, None, true)
            .await?;
        decode(value, segments)
    }

    async fn send_without_body(&self, method: Method, segments: &[&str]) -> Result<(), ApiError> {
        self.request::<Value>(method, segments, None, true).await?;
        Ok(())
    }

    // ===== Account =====

    /// Register a new account. Never sends stored credentials.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Option<UserProfile>, ApiError> {
        let body = RegisterRequest {
            username: required("username", username)?,
            password: required("password", password)?,
            full_name: full_name.filter(|name| !name.trim().is_empty()),
        };
        let value = self
            .request(Method::POST, &["register"], Some(&body), false)
            .await?;
        value
            .map(|v| decode(Some(v), &["register"]))
            .transpose()
    }

    /// Check a username/password pair. Never sends stored credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let body = LoginRequest {
            username: required("username", username)?,
            password: required("password", password)?,
        };
        self.request(Method::POST, &["login"], Some(&body), false)
            .await?;
        Ok(())
    }

    /// Profile of the user the stored credentials belong to
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get(&["me"]).await
    }

    // ===== Users =====

    pub async fn get_user(&self, username: &str) -> Result<UserProfile, ApiError> {
        self.get(&["users", required("username", username)?]).await
    }

    pub async fn list_user_posts(&self, username: &str) -> Result<Vec<Post>, ApiError> {
        self.get(&["users", required("username", username)?, "posts"])
            .await
    }

    // ===== Posts =====

    /// Global feed
    pub async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        self.get(&["posts"]).await
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Post, ApiError> {
        self.get(&["posts", required("post id", post_id)?]).await
    }

    pub async fn create_post(&self, content: &str) -> Result<Post, ApiError> {
        if content.trim().is_empty() {
            return Err(ApiError::Validation("content"));
        }
        let value = self
            .request(Method::POST, &["posts"], Some(&NewPost { content }), true)
            .await?;
        decode(value, &["posts"])
    }

    pub async fn like_post(&self, post_id: &str) -> Result<(), ApiError> {
        self.send_without_body(Method::PUT, &["posts", required("post id", post_id)?, "like"])
            .await
    }

    pub async fn unlike_post(&self, post_id: &str) -> Result<(), ApiError> {
        self.send_without_body(
            Method::DELETE,
            &["posts", required("post id", post_id)?, "like"],
        )
        .await
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ApiError> {
    if value.is_empty() {
        Err(ApiError::Validation(field))
    } else {
        Ok(value)
    }
}

fn decode<T: DeserializeOwned>(value: Option<Value>, segments: &[&str]) -> Result<T, ApiError> {
    let path = segments.join("/");
    let value =
        value.ok_or_else(|| ApiError::InvalidResponse(format!("/{}: empty response body", path)))?;
    serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(format!("/{}: {}", path, e)))
}
