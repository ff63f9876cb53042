//! Error types for session and page-fetch operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while constructing a session or loading the credential.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The credential file could not be read.
    #[error("failed to read credential file {path}: {source}")]
    CredentialIo {
        /// Path to the credential file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The credential file exists but holds no cookie string.
    #[error("credential file {path} is empty")]
    CredentialEmpty {
        /// Path to the credential file.
        path: PathBuf,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors raised while fetching one logical page.
///
/// Transient variants are retried by the session's backoff loop; when the
/// attempt bound is exhausted the last error is folded into
/// [`FetchError::RetriesExhausted`], which is fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection refused, TLS, body read).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Parsed Retry-After delay, if the server sent one.
        retry_after: Option<Duration>,
    },

    /// The source demands authentication for this page.
    #[error(
        "authentication required for {url} (HTTP {status}); configure a credential file for this operation"
    )]
    AuthRequired {
        /// The URL that requires authentication.
        url: String,
        /// The HTTP status code (401 or 403).
        status: u16,
    },

    /// The retry bound was exhausted. The run cannot proceed without
    /// manual intervention.
    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The URL that kept failing.
        url: String,
        /// How many attempts were made.
        attempts: u32,
        /// Description of the final failure.
        last_error: String,
    },

    /// The request could not be rendered into a valid URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, retry_after: Option<Duration>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates an authentication-required error.
    pub fn auth_required(url: impl Into<String>, status: u16) -> Self {
        Self::AuthRequired {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_names_url() {
        let error = FetchError::http_status("https://books.example/user/show/9", 503, None);
        let msg = error.to_string();
        assert!(msg.contains("503"), "expected status in: {msg}");
        assert!(msg.contains("/user/show/9"), "expected URL in: {msg}");
    }

    #[test]
    fn test_retries_exhausted_display_names_url_and_attempts() {
        let error = FetchError::RetriesExhausted {
            url: "https://books.example/book/reviews/42".to_string(),
            attempts: 3,
            last_error: "HTTP 429".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("3 attempts"), "expected attempts in: {msg}");
        assert!(msg.contains("429"), "expected last error in: {msg}");
    }

    #[test]
    fn test_auth_required_display_suggests_credential() {
        let error = FetchError::auth_required("https://books.example/review/list/9", 401);
        assert!(error.to_string().contains("credential"));
    }
}
