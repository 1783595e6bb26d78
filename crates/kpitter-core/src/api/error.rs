use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} is required")]
    Validation(&'static str),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Unauthorized - invalid username or password")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server error ({status}): {body}")]
    ServerError { status: StatusCode, body: String },

    #[error("Request rejected ({status}): {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Map a non-success status and its raw body to an error.
    /// The body is kept as text only; it is never decoded as JSON.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            409 => ApiError::Conflict(truncated),
            500..=599 => ApiError::ServerError {
                status,
                body: truncated,
            },
            _ => ApiError::Rejected {
                status,
                body: truncated,
            },
        }
    }

    /// HTTP status for errors that came from a server response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied(_) => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::Conflict(_) => Some(StatusCode::CONFLICT),
            ApiError::ServerError { status, .. } | ApiError::Rejected { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// True when the server was never reached
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Short message suitable for a status line
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(field) => format!("{} is required", field),
            ApiError::Network(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Network(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::Unauthorized => "Invalid username or password".to_string(),
            ApiError::AccessDenied(_) => "You are not allowed to do that".to_string(),
            ApiError::NotFound(_) => "Not found".to_string(),
            ApiError::Conflict(_) => "Conflict with existing data".to_string(),
            ApiError::ServerError { status, .. } => format!("Server error ({})", status.as_u16()),
            ApiError::Rejected { status, .. } => format!("Request failed ({})", status.as_u16()),
            ApiError::InvalidResponse(_) => "Unexpected response from server".to_string(),
            ApiError::InvalidUrl(url) => format!("Invalid server address: {}", url),
            ApiError::Encode(_) => "Could not encode request".to_string(),
        }
    }
}
