//! Authenticated HTTP session client for driving remote applications.
//!
//! One client binds to one application base URI. `login` establishes the
//! session cookie; `get`/`put` ride on the same cookie store to drive
//! lifecycle endpoints (maintenance mode, freeze progress reporting).

use reqwest::header::SET_COOKIE;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::state_machine::FreezeProgress;

/// Path constants for the remote application's lifecycle endpoints.
pub const LOGIN_PATH: &str = "login";
pub const PROGRESS_PATH: &str = "progress";
pub const MAINTENANCE_ENTER_PATH: &str = "maintenance/enter";
pub const MAINTENANCE_EXIT_PATH: &str = "maintenance/exit";

/// Login credentials posted as form fields.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Body of a successful login response.
///
/// Tolerant by design: unknown fields are ignored and everything but the
/// logged-in assertion is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// Failures classified at the HTTP session boundary.
#[derive(Debug, Error)]
pub enum HttpSessionError {
    /// Login did not establish an authenticated session. Carries the
    /// status, a printable form of the cookie header, and the raw body
    /// for diagnostics.
    #[error("login to {base} failed: status {status}, set-cookie {cookie}, body: {body}")]
    Authentication {
        base: String,
        status: u16,
        cookie: String,
        body: String,
    },

    /// A request on an established session failed at the I/O level.
    #[error("{method} {uri} failed: {source}")]
    Request {
        method: &'static str,
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    /// A response body could not be decoded as the expected payload.
    #[error("payload from {uri} undecodable: {source}")]
    Payload {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URI is not a usable URL.
    #[error("invalid base URI '{uri}': {reason}")]
    BaseUri { uri: String, reason: String },

    /// The underlying HTTP client could not be constructed.
    #[error("could not build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

/// Connection settings for application HTTP sessions.
#[derive(Debug, Clone)]
pub struct HttpSessionSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSessionSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("cutover-core/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Cookie-aware HTTP client bound to one application.
///
/// Login policy: a fresh client requires a non-blank `Set-Cookie` on
/// login; once a session has been established, a repeat login may
/// legitimately receive no fresh cookie (the server sees the valid one we
/// already hold) and is accepted on the body's say-so alone.
#[derive(Debug)]
pub struct AppSessionClient {
    client: Client,
    base_url: Url,
    session_established: bool,
}

impl AppSessionClient {
    /// Build a client for one application base URI. The cookie store is
    /// the session: it is private to this client, never ambient state.
    pub fn new(base_uri: &str, settings: &HttpSessionSettings) -> Result<Self, HttpSessionError> {
        let base_url = Url::parse(base_uri).map_err(|e| HttpSessionError::BaseUri {
            uri: base_uri.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .cookie_store(true)
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|source| HttpSessionError::Client { source })?;

        Ok(Self {
            client,
            base_url,
            session_established: false,
        })
    }

    /// Base URI this client is bound to.
    pub fn base_uri(&self) -> &str {
        self.base_url.as_str()
    }

    /// Authenticate against the application's login endpoint.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<LoginResult, HttpSessionError> {
        let url = self.join(LOGIN_PATH)?;
        debug!(uri = %url, username = %credentials.username, "logging in");

        let response = self
            .client
            .post(url.clone())
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|source| HttpSessionError::Request {
                method: "POST",
                uri: url.to_string(),
                source,
            })?;

        let status = response.status();
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.unwrap_or_default();

        let result = interpret_login(
            self.base_url.as_str(),
            status,
            cookie.as_deref(),
            &body,
            self.session_established,
        )?;
        self.session_established = true;
        info!(base = %self.base_url, username = %credentials.username, "login succeeded");
        Ok(result)
    }

    /// GET a lifecycle endpoint on the established session; returns the
    /// body text.
    pub async fn get(&self, path: &str) -> Result<String, HttpSessionError> {
        let url = self.join(path)?;
        debug!(uri = %url, "GET");
        let response =
            self.client
                .get(url.clone())
                .send()
                .await
                .map_err(|source| HttpSessionError::Request {
                    method: "GET",
                    uri: url.to_string(),
                    source,
                })?;
        self.read_body("GET", url, response).await
    }

    /// PUT (no body) a lifecycle endpoint on the established session;
    /// returns the body text.
    pub async fn put(&self, path: &str) -> Result<String, HttpSessionError> {
        let url = self.join(path)?;
        debug!(uri = %url, "PUT");
        let response =
            self.client
                .put(url.clone())
                .send()
                .await
                .map_err(|source| HttpSessionError::Request {
                    method: "PUT",
                    uri: url.to_string(),
                    source,
                })?;
        self.read_body("PUT", url, response).await
    }

    /// Fetch and decode the application's view of freeze progress.
    pub async fn freeze_progress(&self) -> Result<FreezeProgress, HttpSessionError> {
        let uri = self.join(PROGRESS_PATH)?.to_string();
        let body = self.get(PROGRESS_PATH).await?;
        serde_json::from_str(&body).map_err(|source| HttpSessionError::Payload { uri, source })
    }

    async fn read_body(
        &self,
        method: &'static str,
        url: Url,
        response: reqwest::Response,
    ) -> Result<String, HttpSessionError> {
        let status = response.status();
        if !status.is_success() {
            warn!(uri = %url, status = %status, "lifecycle endpoint returned non-success status");
        }
        response
            .text()
            .await
            .map_err(|source| HttpSessionError::Request {
                method,
                uri: url.to_string(),
                source,
            })
    }

    fn join(&self, path: &str) -> Result<Url, HttpSessionError> {
        self.base_url
            .join(path)
            .map_err(|e| HttpSessionError::BaseUri {
                uri: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }
}

/// Decide whether a login exchange established an authenticated session.
///
/// Every deviation — error status, missing cookie on a fresh session,
/// undecodable body, or a body that does not assert logged-in — collapses
/// into one authentication failure carrying the full exchange for
/// diagnostics.
fn interpret_login(
    base: &str,
    status: StatusCode,
    cookie: Option<&str>,
    body: &str,
    session_established: bool,
) -> Result<LoginResult, HttpSessionError> {
    let status_accepted = status.is_success() || status.is_redirection();
    let cookie_accepted =
        session_established || cookie.map(|c| !c.trim().is_empty()).unwrap_or(false);

    if status_accepted && cookie_accepted {
        if let Ok(result) = serde_json::from_str::<LoginResult>(body) {
            if result.logged_in {
                return Ok(result);
            }
        }
    }

    Err(HttpSessionError::Authentication {
        base: base.to_string(),
        status: status.as_u16(),
        cookie: cookie.unwrap_or("null").to_string(),
        body: body.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGGED_IN: &str = r#"{"loggedIn": true, "username": "amy"}"#;
    const NOT_LOGGED_IN: &str = r#"{"loggedIn": false}"#;

    fn fresh(status: u16, cookie: Option<&str>, body: &str) -> Result<LoginResult, HttpSessionError> {
        interpret_login(
            "http://app.internal/",
            StatusCode::from_u16(status).unwrap(),
            cookie,
            body,
            false,
        )
    }

    #[test]
    fn test_login_accepts_cookie_and_assertion() {
        let result = fresh(200, Some("JSESSIONID=abc123; Path=/"), LOGGED_IN).unwrap();
        assert!(result.logged_in);
        assert_eq!(result.username.as_deref(), Some("amy"));
    }

    #[test]
    fn test_login_rejects_error_status() {
        let err = fresh(401, Some("JSESSIONID=abc123"), LOGGED_IN).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("JSESSIONID=abc123"));
    }

    #[test]
    fn test_login_rejects_missing_cookie_with_printable_null() {
        let err = fresh(200, None, LOGGED_IN).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("200"));
        assert!(message.contains("null"));
    }

    #[test]
    fn test_login_rejects_blank_cookie() {
        assert!(fresh(200, Some("   "), LOGGED_IN).is_err());
    }

    #[test]
    fn test_login_rejects_body_denying_login() {
        let err = fresh(200, Some("JSESSIONID=abc123"), NOT_LOGGED_IN).unwrap_err();
        assert!(err.to_string().contains("loggedIn"));
    }

    #[test]
    fn test_login_rejects_malformed_body() {
        assert!(fresh(200, Some("JSESSIONID=abc123"), "<html>oops</html>").is_err());
    }

    #[test]
    fn test_relogin_tolerates_omitted_cookie() {
        let result = interpret_login(
            "http://app.internal/",
            StatusCode::OK,
            None,
            LOGGED_IN,
            true,
        )
        .unwrap();
        assert!(result.logged_in);
    }

    #[test]
    fn test_login_result_ignores_unknown_fields() {
        let body = r#"{"loggedIn": true, "roles": ["admin"], "sessionTtl": 3600}"#;
        let result: LoginResult = serde_json::from_str(body).unwrap();
        assert!(result.logged_in);
    }

    #[test]
    fn test_client_rejects_invalid_base_uri() {
        let err = AppSessionClient::new("not a uri", &HttpSessionSettings::default()).unwrap_err();
        assert!(matches!(err, HttpSessionError::BaseUri { .. }));
    }

    #[test]
    fn test_client_binds_base_uri() {
        let client =
            AppSessionClient::new("http://app.internal:8080/", &HttpSessionSettings::default())
                .unwrap();
        assert_eq!(client.base_uri(), "http://app.internal:8080/");
    }
}
