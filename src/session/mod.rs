//! Session management: credential, request pacing, and backoff.
//!
//! All outbound traffic goes through one [`Session`]. It enforces a minimum
//! spacing between requests (the source's informal rate limit), sends the
//! optional login cookie, and retries transient failures with exponential
//! backoff up to a bounded attempt count. Exhausting the bound surfaces a
//! fatal [`FetchError::RetriesExhausted`] naming the failing request.
//!
//! Execution is strictly sequential by design: one outstanding request at a
//! time, trading wall-clock time for safety against access suspension.

mod error;
mod retry;

pub use error::{FetchError, SessionError};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error,
};

use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{COOKIE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Upper bound honored for server-supplied Retry-After hints.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Request timeout for a single page.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// An opaque login cookie string, read once at startup.
///
/// The value is redacted in Debug output so it can never leak into logs.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Loads the credential from a file holding a single cookie string.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CredentialIo`] when the file cannot be read
    /// and [`SessionError::CredentialEmpty`] when it holds nothing but
    /// whitespace.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SessionError::CredentialIo {
            path: path.to_path_buf(),
            source,
        })?;
        let cookie = raw.trim();
        if cookie.is_empty() {
            return Err(SessionError::CredentialEmpty {
                path: path.to_path_buf(),
            });
        }
        info!(path = %path.display(), "credential loaded");
        Ok(Self(cookie.to_string()))
    }

    /// The cookie header value. Sensitive; avoid logging.
    #[must_use]
    pub fn header_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}

/// Holds the optional credential and enforces pacing/backoff for all
/// outbound requests.
#[derive(Debug)]
pub struct Session {
    client: Client,
    credential: Option<Credential>,
    min_interval: Duration,
    policy: RetryPolicy,
    last_request: Mutex<Option<Instant>>,
}

impl Session {
    /// Builds a session and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Client`] when the client cannot be built.
    pub fn new(
        credential: Option<Credential>,
        min_interval: Duration,
        policy: RetryPolicy,
        user_agent: &str,
    ) -> Result<Self, SessionError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .gzip(true)
            .build()?;

        debug!(
            anonymous = credential.is_none(),
            min_interval_ms = min_interval.as_millis(),
            max_attempts = policy.max_attempts(),
            "session ready"
        );

        Ok(Self {
            client,
            credential,
            min_interval,
            policy,
            last_request: Mutex::new(None),
        })
    }

    /// Whether the session carries a credential.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Fetches one page, pacing and retrying as needed.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`FetchError`]: either a non-retryable failure
    /// (auth required, permanent HTTP status) or
    /// [`FetchError::RetriesExhausted`] when the attempt bound is spent.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &url::Url) -> Result<String, FetchError> {
        let mut attempt = 1u32;
        loop {
            self.pace().await;

            let error = match self.send(url).await {
                Ok(body) => return Ok(body),
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            match self.policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    // A server-supplied Retry-After hint wins when it asks
                    // for more patience than the backoff would.
                    let delay = match &error {
                        FetchError::HttpStatus {
                            retry_after: Some(hint),
                            ..
                        } => delay.max(*hint),
                        _ => delay,
                    };
                    warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    if matches!(
                        failure_type,
                        FailureType::Transient | FailureType::RateLimited
                    ) {
                        // Retryable failure that ran out of attempts.
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last_error: error.to_string(),
                        });
                    }
                    debug!(url = %url, reason, "not retrying");
                    return Err(error);
                }
            }
        }
    }

    /// Sleeps until the minimum inter-request spacing has elapsed, then
    /// stamps the request time.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval.saturating_sub(elapsed);
                debug!(wait_ms = wait.as_millis(), "pacing before request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Sends one request and maps the response to a body or a classified
    /// error. 401/403 become [`FetchError::AuthRequired`].
    async fn send(&self, url: &url::Url) -> Result<String, FetchError> {
        let mut request = self.client.get(url.clone());
        if let Some(credential) = &self.credential {
            request = request.header(COOKIE, credential.header_value());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url.as_str())
            } else {
                FetchError::network(url.as_str(), e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::auth_required(url.as_str(), status.as_u16()));
        }
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(FetchError::http_status(
                url.as_str(),
                status.as_u16(),
                retry_after,
            ));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))
    }
}

/// Parses a Retry-After header value: either delta-seconds or an HTTP-date.
/// The result is capped at [`MAX_RETRY_AFTER`].
fn parse_retry_after(value: &str) -> Option<Duration> {
    let delay = if let Ok(seconds) = value.trim().parse::<u64>() {
        Duration::from_secs(seconds)
    } else {
        let when = httpdate::parse_http_date(value).ok()?;
        when.duration_since(std::time::SystemTime::now())
            .unwrap_or(Duration::ZERO)
    };
    Some(delay.min(MAX_RETRY_AFTER))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ==================== Retry-After Parsing ====================

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_retry_after_caps_excessive_values() {
        assert_eq!(parse_retry_after("86400"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_parse_retry_after_http_date_in_past_is_zero() {
        let past = "Wed, 21 Oct 2015 07:28:00 GMT";
        assert_eq!(parse_retry_after(past), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_garbage_is_none() {
        assert_eq!(parse_retry_after("soon"), None);
    }

    // ==================== Credential ====================

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential("session_id=super_secret".to_string());
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super_secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_credential_load_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookie.txt");
        std::fs::write(&path, "  session_id=abc\n").unwrap();

        let credential = Credential::load(&path).unwrap();
        assert_eq!(credential.header_value(), "session_id=abc");
    }

    #[test]
    fn test_credential_load_empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookie.txt");
        std::fs::write(&path, "\n  \n").unwrap();

        assert!(matches!(
            Credential::load(&path),
            Err(SessionError::CredentialEmpty { .. })
        ));
    }

    #[test]
    fn test_credential_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        assert!(matches!(
            Credential::load(&path),
            Err(SessionError::CredentialIo { .. })
        ));
    }

    #[test]
    fn test_session_builds_anonymous() {
        let session = Session::new(
            None,
            Duration::from_millis(0),
            RetryPolicy::default(),
            "shelfgraph-test/0.1",
        )
        .unwrap();
        assert!(!session.is_authenticated());
    }
}
