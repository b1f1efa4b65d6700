//! HTTP access to the announcement endpoint.
//!
//! One authenticated GET per poll cycle, with caching disabled. Responses are
//! classified into the outcomes the poller cares about before the body is
//! decoded.

use std::fmt;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};

use crate::error_classification::{classify_status, StatusClass};

/// Maximum response body size (1 MB).
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Why a fetch produced no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Request never completed: DNS, connect, timeout, truncated body
    Network(String),
    /// Server answered with a status worth retrying (401/403/407, 5xx)
    Unavailable(u16),
    /// Any other non-success status; nothing to show this cycle
    Rejected(u16),
    /// 2xx response whose body is not usable JSON
    InvalidBody(String),
}

impl FetchError {
    /// Whether this fault should drive the retry backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Unavailable(_))
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Announcement request failed: {msg}"),
            FetchError::Unavailable(status) => {
                write!(f, "Announcement service unavailable (HTTP {status})")
            }
            FetchError::Rejected(status) => {
                write!(f, "Announcement request rejected (HTTP {status})")
            }
            FetchError::InvalidBody(msg) => write!(f, "Invalid announcement response: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fetches raw announcement payloads from the configured endpoint.
#[derive(Debug, Clone)]
pub struct AnnouncementClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl AnnouncementClient {
    pub fn new(url: &str, token: Option<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("announcement-notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the endpoint and decode the body as JSON.
    pub async fn fetch(&self) -> Result<serde_json::Value, FetchError> {
        let mut request = self
            .http
            .get(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        match classify_status(status) {
            StatusClass::Success => {}
            StatusClass::Retryable => return Err(FetchError::Unavailable(status)),
            StatusClass::Rejected => return Err(FetchError::Rejected(status)),
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("failed to read body: {e}")))?;

        if body.len() > MAX_RESPONSE_BYTES {
            return Err(FetchError::InvalidBody(format!(
                "body exceeds maximum size ({} bytes > {MAX_RESPONSE_BYTES} bytes)",
                body.len()
            )));
        }

        serde_json::from_slice(&body).map_err(|e| FetchError::InvalidBody(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn client_for(server: &mockito::Server, token: Option<&str>) -> AnnouncementClient {
        let url = format!("{}/services/announcement/latest", server.url());
        AnnouncementClient::new(&url, token.map(String::from), TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn sends_auth_and_no_cache_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/services/announcement/latest")
            .match_header("authorization", "token s3cret")
            .match_header("cache-control", "no-cache")
            .match_header("pragma", "no-cache")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"popup":false,"timestamp":"t","blocks":[]}"#)
            .create_async()
            .await;

        let value = client_for(&server, Some("s3cret")).fetch().await.unwrap();
        assert_eq!(value["popup"], false);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_authorization_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/services/announcement/latest")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        assert!(client_for(&server, Some("")).fetch().await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/services/announcement/latest")
            .with_status(503)
            .create_async()
            .await;

        let err = client_for(&server, None).fetch().await.unwrap_err();
        assert_eq!(err, FetchError::Unavailable(503));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn forbidden_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/services/announcement/latest")
            .with_status(403)
            .create_async()
            .await;

        let err = client_for(&server, Some("stale")).fetch().await.unwrap_err();
        assert_eq!(err, FetchError::Unavailable(403));
    }

    #[tokio::test]
    async fn not_found_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/services/announcement/latest")
            .with_status(404)
            .create_async()
            .await;

        let err = client_for(&server, None).fetch().await.unwrap_err();
        assert_eq!(err, FetchError::Rejected(404));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn non_json_body_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/services/announcement/latest")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client_for(&server, None).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidBody(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let client =
            AnnouncementClient::new("http://127.0.0.1:1/announcements", None, TIMEOUT).unwrap();
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            FetchError::Unavailable(502).to_string(),
            "Announcement service unavailable (HTTP 502)"
        );
        assert_eq!(
            FetchError::Rejected(404).to_string(),
            "Announcement request rejected (HTTP 404)"
        );
    }
}
