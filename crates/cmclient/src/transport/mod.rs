//! Transports that dispatch gateway requests.
//!
//! The gateway never decides whether a request really goes out. That choice is
//! made once, when a [`Transport`] is injected:
//!
//! - [`http::HttpTransport`] performs the call against the control plane.
//! - [`SimulatedTransport`] records and echoes the request and answers with
//!   [`Reply::Simulated`], so callers walk the same control flow without side
//!   effects.
//! - [`MockTransport`] answers from scripted replies, for tests.
//!
//! # Testing
//!
//! ```
//! use cmclient::transport::{MockTransport, Transport};
//! use cmclient::{Method, Request, Reply};
//!
//! let mock = MockTransport::new();
//! mock.respond(Method::Get, "/commands/7", r#"{"id":7,"success":true}"#);
//!
//! let request = Request {
//!     method: Method::Get,
//!     path: "/commands/7".to_string(),
//!     url: "http://cm:7180/api/v56/commands/7".to_string(),
//!     body: None,
//! };
//! let reply = mock.send(&request).unwrap();
//! assert_eq!(reply, Reply::Body(r#"{"id":7,"success":true}"#.to_string()));
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{Method, Reply, Request};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Dispatch strategy for gateway requests.
pub trait Transport: Send + Sync {
    /// Dispatch a request and return what came back.
    fn send(&self, request: &Request) -> Result<Reply>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// =============================================================================
// Simulated transport
// =============================================================================

type Observer = Box<dyn Fn(&Request) + Send + Sync>;

/// Transport that records requests instead of sending them.
#[derive(Default)]
pub struct SimulatedTransport {
    recorded: Mutex<Vec<Request>>,
    observer: Option<Observer>,
}

impl SimulatedTransport {
    /// Create a transport that only records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that also hands every request to `observer`.
    pub fn with_observer(observer: impl Fn(&Request) + Send + Sync + 'static) -> Self {
        Self {
            recorded: Mutex::new(Vec::new()),
            observer: Some(Box::new(observer)),
        }
    }

    /// Requests recorded so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.recorded).clone()
    }
}

impl Transport for SimulatedTransport {
    fn send(&self, request: &Request) -> Result<Reply> {
        log::info!("simulated {} {}", request.method, request.url);
        if let Some(body) = request.pretty_body() {
            log::debug!("simulated body:\n{}", body);
        }
        if let Some(observer) = &self.observer {
            observer(request);
        }
        lock(&self.recorded).push(request.clone());
        Ok(Reply::Simulated)
    }
}

// =============================================================================
// Mock transport
// =============================================================================

#[derive(Debug, Clone)]
enum MockReply {
    Body(String),
    Status(u16),
}

/// Transport answering from scripted replies.
///
/// Replies are queued per method and unversioned path. Each request consumes the
/// front of its queue, except the last reply, which keeps answering. Every
/// request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<(Method, String), VecDeque<MockReply>>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Create a mock with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a raw body for a route.
    pub fn respond(&self, method: Method, path: &str, body: impl Into<String>) -> &Self {
        self.push(method, path, MockReply::Body(body.into()))
    }

    /// Queue a JSON body for a route.
    pub fn respond_json(&self, method: Method, path: &str, body: &serde_json::Value) -> &Self {
        self.push(method, path, MockReply::Body(body.to_string()))
    }

    /// Queue an HTTP error status for a route.
    pub fn fail(&self, method: Method, path: &str, status: u16) -> &Self {
        self.push(method, path, MockReply::Status(status))
    }

    /// All requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }

    /// Requests received for one route.
    #[must_use]
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<Request> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// Paths of all requests received so far, prefixed with their method.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.requests)
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> Result<Reply> {
        lock(&self.requests).push(request.clone());

        let reply = {
            let mut routes = lock(&self.routes);
            let queue = routes.get_mut(&(request.method, request.path.clone()));
            match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(MockReply::Body(body)) => Ok(Reply::Body(body)),
            Some(MockReply::Status(status)) => Err(Error::Http {
                message: format!("HTTP {}", status),
                status: Some(status),
            }),
            None => Err(Error::Http {
                message: format!("no mock route for {} {}", request.method, request.path),
                status: Some(404),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(method: Method, path: &str) -> Request {
        Request {
            method,
            path: path.to_string(),
            url: format!("http://cm:7180/api/v41{}", path),
            body: None,
        }
    }

    #[test]
    fn test_simulated_transport_records() {
        let transport = SimulatedTransport::new();
        let reply = transport.send(&request(Method::Post, "/x")).unwrap();
        assert!(reply.is_simulated());
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.requests()[0].path, "/x");
    }

    #[test]
    fn test_simulated_transport_observer() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let transport = SimulatedTransport::with_observer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        transport.send(&request(Method::Get, "/a")).unwrap();
        transport.send(&request(Method::Get, "/b")).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_mock_transport_queue_and_sticky_last() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, "/commands/1", "first")
            .respond(Method::Get, "/commands/1", "second");

        let get = request(Method::Get, "/commands/1");
        assert_eq!(mock.send(&get).unwrap(), Reply::Body("first".to_string()));
        assert_eq!(mock.send(&get).unwrap(), Reply::Body("second".to_string()));
        assert_eq!(mock.send(&get).unwrap(), Reply::Body("second".to_string()));
        assert_eq!(mock.requests_to(Method::Get, "/commands/1").len(), 3);
    }

    #[test]
    fn test_mock_transport_unrouted() {
        let mock = MockTransport::new();
        let err = mock.send(&request(Method::Get, "/nope")).unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(mock.calls(), vec!["GET /nope".to_string()]);
    }

    #[test]
    fn test_mock_transport_status() {
        let mock = MockTransport::new();
        mock.fail(Method::Post, "/hosts/removeHostsFromCluster", 500);
        let err = mock
            .send(&request(Method::Post, "/hosts/removeHostsFromCluster"))
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_mock_transport_routes_by_method() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, "/clusters/c/hosts", "{}");
        assert!(mock.send(&request(Method::Post, "/clusters/c/hosts")).is_err());
        assert!(mock.send(&request(Method::Get, "/clusters/c/hosts")).is_ok());
    }
}
