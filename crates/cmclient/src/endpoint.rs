//! Endpoint addressing and API versioning.
//!
//! The control plane serves several API generations side by side, and not every
//! resource is available in every generation. Each request path is classified
//! by prefix and pinned to the generation that is known to accept it:
//!
//! | Prefix                    | Version |
//! |---------------------------|---------|
//! | `/cm/`                    | 31      |
//! | `/hosts/`, `/commands/`   | 56      |
//! | `/clusters/`              | 56      |
//! | anything else             | 41      |
//!
//! Prefixes are literal, so `/hosts` without a trailing slash falls through to
//! the default version.

use std::fmt;

/// API version used for `/cm/` resources.
pub const CM_VERSION: u32 = 31;

/// API version used for `/hosts/` and `/commands/` resources.
pub const HOSTS_VERSION: u32 = 56;

/// API version used for `/clusters/` resources.
pub const CLUSTERS_VERSION: u32 = 56;

/// API version used for everything else.
pub const DEFAULT_VERSION: u32 = 41;

/// Resolve the API version for a request path.
#[must_use]
pub fn api_version(path: &str) -> u32 {
    if path.starts_with("/cm/") {
        CM_VERSION
    } else if path.starts_with("/hosts/") || path.starts_with("/commands/") {
        HOSTS_VERSION
    } else if path.starts_with("/clusters/") {
        CLUSTERS_VERSION
    } else {
        DEFAULT_VERSION
    }
}

/// Rewrite a request path with its API version segment.
///
/// ```
/// assert_eq!(cmclient::endpoint::versioned_path("/cm/commands/hostInstall"), "/api/v31/cm/commands/hostInstall");
/// assert_eq!(cmclient::endpoint::versioned_path("/hosts"), "/api/v41/hosts");
/// ```
#[must_use]
pub fn versioned_path(path: &str) -> String {
    format!("/api/v{}{}", api_version(path), path)
}

/// URL scheme for the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// Parse a protocol name (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }

    /// Scheme string as used in URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network location of the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// URL scheme.
    pub protocol: Protocol,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(protocol: Protocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
        }
    }

    /// Base URL without any API path.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Fully-qualified, versioned URL for a request path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), versioned_path(path))
    }
}
