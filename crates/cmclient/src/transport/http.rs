//! HTTP transport backed by `ureq`.

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{Method, Reply, Request};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::time::Duration;

/// Default timeout for a single request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Control-plane login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn basic_auth(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {}", token)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transport that performs real HTTP calls.
pub struct HttpTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Precomputed `Authorization` header.
    authorization: String,
}

impl HttpTransport {
    /// Create a transport with the default request timeout.
    #[must_use]
    pub fn new(credentials: &Credentials) -> Self {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom request timeout.
    #[must_use]
    pub fn with_timeout(credentials: &Credentials, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            authorization: credentials.basic_auth(),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Reply> {
        log::debug!("{} {}", request.method, request.url);

        let mut response = match request.method {
            Method::Get => self
                .agent
                .get(&request.url)
                .header("Authorization", self.authorization.as_str())
                .header("Accept", "application/json")
                .call()?,
            Method::Post => {
                let builder = self
                    .agent
                    .post(&request.url)
                    .header("Authorization", self.authorization.as_str())
                    .header("Accept", "application/json");
                match &request.body {
                    Some(body) => builder
                        .header("Content-Type", "application/json")
                        .send(serde_json::to_string(body)?)?,
                    None => builder.send_empty()?,
                }
            }
        };

        let body = response.body_mut().read_to_string()?;
        log::trace!("response from {}: {}", request.path, body);
        Ok(Reply::Body(body))
    }
}
