//! Errors raised by the remote service clients.

use converse_common::util::{sanitize_for_log, truncate_with_ellipsis};
use thiserror::Error;

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Error from a remote service call.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The request could not be sent or the connection failed.
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The call did not finish within the client timeout.
    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    /// The service answered with a non-success status.
    #[error("{service} API error ({status}): {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl RemoteError {
    pub(crate) fn from_reqwest(service: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { service }
        } else if source.is_decode() {
            Self::Decode {
                service,
                message: source.to_string(),
            }
        } else {
            Self::Transport { service, source }
        }
    }

    pub(crate) fn status(service: &'static str, status: u16, body: &str) -> Self {
        Self::Status {
            service,
            status,
            message: truncate_with_ellipsis(&sanitize_for_log(body), MAX_ERROR_BODY_CHARS),
        }
    }

    /// Name of the service that failed.
    pub fn service(&self) -> &'static str {
        match self {
            Self::Transport { service, .. }
            | Self::Timeout { service }
            | Self::Status { service, .. }
            | Self::Decode { service, .. } => service,
        }
    }

    /// Upstream HTTP status, when the service answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Check a response status, turning failures into [`RemoteError::Status`].
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, RemoteError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::status(service, status, &body))
}
