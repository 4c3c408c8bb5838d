//! Core types for control-plane requests and responses.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Requests and replies
// =============================================================================

/// HTTP method used by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a resource.
    Get,
    /// Submit a change or start a command.
    Post,
}

impl Method {
    /// Method name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request ready to be dispatched by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Unversioned API path, e.g. `/clusters/prod/hosts`.
    pub path: String,
    /// Fully-qualified, versioned URL.
    pub url: String,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

impl Request {
    /// Body rendered as pretty-printed JSON, for display.
    #[must_use]
    pub fn pretty_body(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| serde_json::to_string_pretty(b).unwrap_or_else(|_| b.to_string()))
    }
}

/// What a transport handed back for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Raw body returned by the control plane.
    Body(String),
    /// No call was made; the request was only recorded.
    Simulated,
}

impl Reply {
    /// Whether this reply came from a simulated dispatch.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated)
    }

    /// Raw body, if a real call was made.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Body(body) => Some(body),
            Self::Simulated => None,
        }
    }

    /// Decode the body as JSON.
    ///
    /// Returns `Ok(None)` for simulated replies. An empty or undecodable body
    /// is reported as [`Error::Malformed`] against `endpoint`.
    pub fn json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Option<T>> {
        match self {
            Self::Simulated => Ok(None),
            Self::Body(body) if body.trim().is_empty() => {
                Err(Error::malformed(endpoint, "empty response"))
            }
            Self::Body(body) => serde_json::from_str(body)
                .map(Some)
                .map_err(|e| Error::malformed(endpoint, e.to_string())),
        }
    }

    /// Decode the body as an async command and require its identifier.
    ///
    /// Returns `Ok(None)` for simulated replies.
    pub fn command(&self, endpoint: &str) -> Result<Option<CommandHandle>> {
        let Some(command) = self.json::<ApiCommand>(endpoint)? else {
            return Ok(None);
        };
        let id = command
            .id
            .ok_or_else(|| Error::malformed(endpoint, "response carries no command id"))?;
        Ok(Some(CommandHandle {
            id,
            name: command.name.unwrap_or_default(),
        }))
    }
}

// =============================================================================
// Async commands
// =============================================================================

/// Status of an async command as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Still running, or no verdict reported yet.
    Pending,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
}

/// Identifier of a submitted async command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHandle {
    /// Command identifier.
    pub id: u64,
    /// Command name, if the control plane reported one.
    pub name: String,
}

/// Async command resource (`/commands/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiCommand {
    /// Command identifier.
    pub id: Option<u64>,
    /// Command name.
    pub name: Option<String>,
    /// Whether the command is still running.
    pub active: Option<bool>,
    /// Terminal verdict; absent while the command runs.
    pub success: Option<bool>,
    /// Human-readable result.
    pub result_message: Option<String>,
}

impl ApiCommand {
    /// Collapse the `active`/`success` fields into a tri-state status.
    #[must_use]
    pub fn status(&self) -> CommandStatus {
        if self.active == Some(true) {
            return CommandStatus::Pending;
        }
        match self.success {
            Some(true) => CommandStatus::Succeeded,
            Some(false) => CommandStatus::Failed,
            None => CommandStatus::Pending,
        }
    }

    /// Result message, or an empty string.
    #[must_use]
    pub fn message(&self) -> String {
        self.result_message.clone().unwrap_or_default()
    }
}

// =============================================================================
// Hosts, parcels and payloads
// =============================================================================

/// Wrapper used by every list resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiList<T> {
    /// List entries.
    #[serde(default)]
    pub items: Vec<T>,
}

impl<T> ApiList<T> {
    /// Wrap items in a list.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// Host as known to the control plane.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiHost {
    /// Control-plane assigned identifier.
    pub host_id: String,
    /// Host name.
    pub hostname: String,
    /// Commission state, e.g. `COMMISSIONED`.
    pub commission_state: Option<String>,
    /// Tags attached to the host.
    pub tags: Vec<ApiTag>,
}

impl ApiHost {
    /// Value of the tag with the given name.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// A name/value tag on a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTag {
    /// Tag name.
    pub name: String,
    /// Tag value.
    pub value: String,
}

/// Parcel entry of a cluster.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiParcel {
    /// Product name.
    pub product: String,
    /// Parcel version.
    pub version: String,
    /// Lifecycle stage, e.g. `ACTIVATED`.
    pub stage: String,
}

/// Reference to a host by identifier or name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHostRef {
    /// Control-plane assigned identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    /// Host name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl ApiHostRef {
    /// Reference a host by identifier.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            host_id: Some(id.into()),
            hostname: None,
        }
    }

    /// Reference a host by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            host_id: None,
            hostname: Some(name.into()),
        }
    }
}

/// Arguments for the host install command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInstallArgs {
    /// Hosts to install the agent on.
    pub host_names: Vec<String>,
    /// SSH port.
    pub ssh_port: u16,
    /// SSH user.
    pub user_name: String,
    /// SSH password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// SSH private key contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Private key passphrase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// Package repository for the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cm_repo_url: Option<String>,
}

/// Arguments for removing hosts from their cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostsToRemove {
    /// Host names to remove.
    pub hosts_to_remove: Vec<String>,
    /// Also delete the hosts from the control plane.
    pub delete_hosts: bool,
}
