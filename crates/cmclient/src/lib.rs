//! # cmclient
//!
//! Blocking client for a cluster-management control plane REST API.
//!
//! This crate provides:
//! - Per-path API version pinning ([`endpoint`])
//! - A gateway with injectable transports, so the same calls can be sent for
//!   real, simulated for a dry run, or answered by a mock ([`transport`])
//! - Request/response payloads for hosts, parcels and async commands
//! - A bounded poller that follows async commands to a terminal state
//!
//! ## Example
//!
//! ```no_run
//! use cmclient::transport::http::{Credentials, HttpTransport};
//! use cmclient::{ApiGateway, CommandPoller, Endpoint, PollConfig, Protocol};
//!
//! let transport = HttpTransport::new(&Credentials::new("admin", "admin"));
//! let gateway = ApiGateway::new(
//!     Endpoint::new(Protocol::Http, "cm.example.com", 7180),
//!     Box::new(transport),
//! );
//!
//! let reply = gateway
//!     .post_empty("/clusters/prod/commands/deployClientConfigsAndRefresh")
//!     .expect("request failed");
//!
//! let poller = CommandPoller::new(PollConfig::default());
//! poller
//!     .wait_for_reply(&gateway, "deployClientConfigsAndRefresh", &reply)
//!     .expect("command failed");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod endpoint;
pub mod error;
pub mod gateway;
pub mod poller;
pub mod transport;
pub mod types;

pub use endpoint::{Endpoint, Protocol, api_version, versioned_path};
pub use error::{Error, Result};
pub use gateway::ApiGateway;
pub use poller::{CommandPoller, NoCallback, PollCallback, PollConfig, poll_until};
pub use types::{
    ApiCommand, ApiHost, ApiHostRef, ApiList, ApiParcel, ApiTag, CommandHandle, CommandStatus,
    HostInstallArgs, HostsToRemove, Method, Reply, Request,
};
