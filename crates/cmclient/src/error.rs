//! Error types for control-plane operations.
//!
//! The client never interprets business payloads beyond what it needs to follow
//! an async command, so errors fall into three groups: transport failures,
//! responses that cannot be understood, and terminal command outcomes.

/// Result type alias for control-plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the control plane.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (connection, TLS, non-2xx status).
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code, when the server answered.
        status: Option<u16>,
    },

    /// A response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A response was empty or lacked a field the caller requires.
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed {
        /// Endpoint path that produced the response.
        endpoint: String,
        /// What was missing or wrong.
        reason: String,
    },

    /// The control plane reported that an async command failed.
    #[error("command {id} failed: {message}")]
    CommandFailed {
        /// Command identifier.
        id: u64,
        /// Result message reported by the control plane.
        message: String,
    },

    /// An async command did not reach a terminal state within the poll budget.
    #[error("command {id} did not finish after {attempts} polls")]
    CommandTimeout {
        /// Command identifier.
        id: u64,
        /// Number of status polls performed.
        attempts: u32,
    },
}

impl Error {
    /// Build a [`Error::Malformed`] for the given endpoint.
    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status code, if the error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
