//! Versioned request dispatch.

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::transport::Transport;
use crate::types::{Method, Reply, Request};
use serde::Serialize;

/// Entry point for every control-plane call.
///
/// The gateway pins each path to its API version, builds the full URL and
/// hands the request to the injected [`Transport`]. It does not interpret
/// replies.
///
/// # Example
///
/// ```
/// use cmclient::transport::MockTransport;
/// use cmclient::{ApiGateway, Endpoint, Method, Protocol};
///
/// let mock = MockTransport::new();
/// mock.respond(Method::Get, "/clusters/prod/parcels", r#"{"items":[]}"#);
///
/// let gateway = ApiGateway::new(
///     Endpoint::new(Protocol::Http, "cm.example.com", 7180),
///     Box::new(mock.clone()),
/// );
/// gateway.get("/clusters/prod/parcels").unwrap();
///
/// assert_eq!(
///     mock.requests()[0].url,
///     "http://cm.example.com:7180/api/v56/clusters/prod/parcels"
/// );
/// ```
pub struct ApiGateway {
    endpoint: Endpoint,
    transport: Box<dyn Transport>,
}

impl ApiGateway {
    /// Create a gateway for an endpoint and transport.
    pub fn new(endpoint: Endpoint, transport: Box<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    /// Endpoint this gateway talks to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Build the request for a call without dispatching it.
    #[must_use]
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Request {
        Request {
            method,
            path: path.to_string(),
            url: self.endpoint.url(path),
            body,
        }
    }

    /// Dispatch a call.
    pub fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Reply> {
        let request = self.request(method, path, body);
        self.transport.send(&request)
    }

    /// `GET` a resource.
    pub fn get(&self, path: &str) -> Result<Reply> {
        self.call(Method::Get, path, None)
    }

    /// `POST` a serializable payload.
    pub fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<Reply> {
        let body = serde_json::to_value(payload)?;
        self.call(Method::Post, path, Some(body))
    }

    /// `POST` without a body.
    pub fn post_empty(&self, path: &str) -> Result<Reply> {
        self.call(Method::Post, path, None)
    }
}
