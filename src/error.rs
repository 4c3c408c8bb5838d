//! Error taxonomy for scale operations.
//!
//! Every error is fatal to the run. Errors raised inside a step are wrapped in
//! [`WorkflowError`] so the caller knows which step stays persisted as the
//! resume point.

use crate::engine::Step;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can end a scale operation.
#[derive(Debug, Error)]
pub enum ScaleError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {}", path.display())]
    ConfigNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The configuration file exists but cannot be read.
    #[error("could not read configuration file {}: {source}", path.display())]
    ConfigUnreadable {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is missing or cannot be used.
    #[error("invalid configuration value {key}: {message}")]
    ConfigInvalid {
        /// Configuration key.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// The host list (or another required input) is missing or empty.
    #[error("missing input {}: {reason}", path.display())]
    MissingInput {
        /// Path of the input.
        path: PathBuf,
        /// Why it cannot be used.
        reason: String,
    },

    /// The invocation itself is not valid.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// The control plane sent an empty or unusable response where one is required.
    #[error("malformed response from {endpoint}: {reason}")]
    RemoteCallMalformed {
        /// Endpoint path.
        endpoint: String,
        /// What was missing or wrong.
        reason: String,
    },

    /// The control plane reported that a command failed.
    #[error("command {id} failed: {message}")]
    CommandFailed {
        /// Command identifier.
        id: u64,
        /// Result message reported by the control plane.
        message: String,
    },

    /// A wait ran out of attempts without a terminal answer.
    #[error("timed out waiting for {what} after {attempts} attempts")]
    CommandTimeout {
        /// What was being waited for.
        what: String,
        /// Attempts made.
        attempts: u32,
    },

    /// A post-condition does not hold for one or more target hosts.
    #[error("verification failed ({check}): {}", hosts.join(", "))]
    VerificationFailed {
        /// Which check failed.
        check: String,
        /// Offending host names.
        hosts: Vec<String>,
    },

    /// The control plane could not be reached or rejected the request.
    #[error("control plane request failed: {0}")]
    Remote(cmclient::Error),

    /// The checkpoint could not be read or written.
    #[error("checkpoint error: {0}")]
    State(String),
}

impl ScaleError {
    /// Build a [`ScaleError::VerificationFailed`].
    pub fn verification(check: impl Into<String>, hosts: Vec<String>) -> Self {
        Self::VerificationFailed {
            check: check.into(),
            hosts,
        }
    }
}

impl From<cmclient::Error> for ScaleError {
    fn from(err: cmclient::Error) -> Self {
        match err {
            cmclient::Error::Malformed { endpoint, reason } => {
                Self::RemoteCallMalformed { endpoint, reason }
            }
            cmclient::Error::CommandFailed { id, message } => Self::CommandFailed { id, message },
            cmclient::Error::CommandTimeout { id, attempts } => Self::CommandTimeout {
                what: format!("command {}", id),
                attempts,
            },
            other => Self::Remote(other),
        }
    }
}

/// A step failed; the step remains the persisted resume point.
#[derive(Debug, Error)]
#[error("step {step} failed: {source}")]
pub struct WorkflowError {
    /// Step that failed.
    pub step: Step,
    /// Underlying error.
    #[source]
    pub source: ScaleError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_lists_hosts() {
        let err = ScaleError::verification("commission state", vec!["h2".to_string()]);
        assert_eq!(err.to_string(), "verification failed (commission state): h2");

        let err = ScaleError::verification("tag", vec!["h1".to_string(), "h3".to_string()]);
        assert_eq!(err.to_string(), "verification failed (tag): h1, h3");
    }

    #[test]
    fn test_client_errors_map_to_taxonomy() {
        let err: ScaleError = cmclient::Error::CommandFailed {
            id: 3,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, ScaleError::CommandFailed { id: 3, .. }));

        let err: ScaleError = cmclient::Error::CommandTimeout { id: 3, attempts: 30 }.into();
        assert!(matches!(err, ScaleError::CommandTimeout { attempts: 30, .. }));

        let err: ScaleError = cmclient::Error::malformed("/x", "empty response").into();
        assert!(matches!(err, ScaleError::RemoteCallMalformed { .. }));

        let err: ScaleError = cmclient::Error::Http {
            message: "HTTP 500".to_string(),
            status: Some(500),
        }
        .into();
        assert!(matches!(err, ScaleError::Remote(_)));
    }

    #[test]
    fn test_workflow_error_names_step() {
        let err = WorkflowError {
            step: Step::VerifyCommission,
            source: ScaleError::verification("commission state", vec!["h2".to_string()]),
        };
        assert_eq!(
            err.to_string(),
            "step verify_commission failed: verification failed (commission state): h2"
        );
    }
}
