use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by a [`ListClient`](super::ListClient) or
/// [`DetailClient`](super::DetailClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid credentials: {0}")]
    Credentials(String),
}

impl ClientError {
    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        ClientError::Status {
            status,
            body: body.into(),
        }
    }

    /// Whether the service reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}
