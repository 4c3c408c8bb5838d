//! Connection and cluster settings.
//!
//! The configuration file is a flat list of `KEY=VALUE` lines, the format
//! operators already keep next to their inventory:
//!
//! ```text
//! # control plane
//! CM_HOST=cm.example.com
//! CM_PORT=7183
//! CM_PROTOCOL=https
//! export CM_USER=admin
//! CM_PASS="s3cret"
//! ```
//!
//! Blank lines and `#` comments are ignored, an `export ` prefix is accepted
//! and matching single or double quotes around a value are stripped.

use crate::engine::{ClusterSettings, OperationKind, SshSettings};
use crate::error::ScaleError;
use crate::paths;
use clap::ValueEnum;
use cmclient::transport::http::Credentials;
use cmclient::{Endpoint, Protocol};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// How to authenticate SSH sessions during agent installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AuthMode {
    /// Use `SSH_PASS`.
    #[default]
    Password,
    /// Use the private key file at `SSH_KEY` (with `SSH_KEY_PASSPHRASE`).
    Key,
}

/// Raw configuration values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Config {
    pub cm_host: String,
    pub cm_port: String,
    pub cm_protocol: String,
    pub cm_user: String,
    pub cm_pass: String,
    pub cm_repo_url: String,
    pub cluster_name: String,
    pub host_template: String,
    pub host_tag: String,
    pub ssh_user: String,
    pub ssh_pass: String,
    pub ssh_key: String,
    pub ssh_key_passphrase: String,
    pub ssh_port: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cm_host: String::new(),
            cm_port: "7180".to_string(),
            cm_protocol: "http".to_string(),
            cm_user: String::new(),
            cm_pass: String::new(),
            cm_repo_url: String::new(),
            cluster_name: String::new(),
            host_template: String::new(),
            host_tag: String::new(),
            ssh_user: "root".to_string(),
            ssh_pass: String::new(),
            ssh_key: String::new(),
            ssh_key_passphrase: String::new(),
            ssh_port: "22".to_string(),
        }
    }
}

/// Parse `KEY=VALUE` lines into a map. Later keys win.
pub fn parse_pairs(content: &str) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            log::warn!("Ignoring config line without '=': {}", line);
            continue;
        };
        pairs.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }
    pairs
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn invalid(key: &str, message: impl Into<String>) -> ScaleError {
    ScaleError::ConfigInvalid {
        key: key.to_string(),
        message: message.into(),
    }
}

fn require<'a>(key: &str, value: &'a str) -> Result<&'a str, ScaleError> {
    if value.trim().is_empty() {
        Err(invalid(key, "is required"))
    } else {
        Ok(value)
    }
}

impl Config {
    /// Load the configuration file.
    pub fn load(path: &Path) -> Result<Self, ScaleError> {
        if !path.exists() {
            return Err(ScaleError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ScaleError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_pairs(parse_pairs(&content))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Build a configuration from parsed pairs. Unknown keys are ignored.
    pub fn from_pairs(pairs: BTreeMap<String, String>) -> Result<Self, ScaleError> {
        let object: serde_json::Map<String, serde_json::Value> = pairs
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| invalid("<file>", e.to_string()))
    }

    /// Control-plane endpoint.
    pub fn endpoint(&self) -> Result<Endpoint, ScaleError> {
        let host = require("CM_HOST", &self.cm_host)?;
        let protocol = Protocol::parse(&self.cm_protocol).ok_or_else(|| {
            invalid(
                "CM_PROTOCOL",
                format!("unsupported protocol '{}'", self.cm_protocol),
            )
        })?;
        let port = parse_port("CM_PORT", &self.cm_port)?;
        Ok(Endpoint::new(protocol, host.trim(), port))
    }

    /// Control-plane login.
    pub fn credentials(&self) -> Result<Credentials, ScaleError> {
        let user = require("CM_USER", &self.cm_user)?;
        Ok(Credentials::new(user, self.cm_pass.as_str()))
    }

    /// Settings the workflow steps need for an operation.
    ///
    /// Scale-down touches neither templates nor SSH, so those keys are only
    /// required for scale-up.
    pub fn cluster_settings(
        &self,
        kind: OperationKind,
        auth: AuthMode,
    ) -> Result<ClusterSettings, ScaleError> {
        let mut settings = self.plan_settings(kind)?;
        if kind == OperationKind::ScaleUp {
            settings.ssh = self.ssh_settings(auth)?;
        }
        Ok(settings)
    }

    /// Settings for a plan: everything except SSH, which no plan uses.
    pub fn plan_settings(&self, kind: OperationKind) -> Result<ClusterSettings, ScaleError> {
        let cluster = require("CLUSTER_NAME", &self.cluster_name)?.to_string();

        if kind == OperationKind::ScaleDown {
            return Ok(ClusterSettings {
                cluster,
                ..Default::default()
            });
        }

        let template = require("HOST_TEMPLATE", &self.host_template)?.to_string();
        let tag = if self.host_tag.trim().is_empty() {
            template.clone()
        } else {
            self.host_tag.clone()
        };
        let repo_url = Some(self.cm_repo_url.clone()).filter(|u| !u.trim().is_empty());

        Ok(ClusterSettings {
            cluster,
            template,
            tag,
            repo_url,
            ssh: SshSettings::default(),
        })
    }

    fn ssh_settings(&self, auth: AuthMode) -> Result<SshSettings, ScaleError> {
        let user = require("SSH_USER", &self.ssh_user)?.to_string();
        let port = parse_port("SSH_PORT", &self.ssh_port)?;

        match auth {
            AuthMode::Password => Ok(SshSettings {
                user,
                port,
                password: require("SSH_PASS", &self.ssh_pass)?.to_string(),
                ..Default::default()
            }),
            AuthMode::Key => {
                let key_path = paths::expand(require("SSH_KEY", &self.ssh_key)?);
                let private_key =
                    fs::read_to_string(&key_path).map_err(|e| ScaleError::MissingInput {
                        path: key_path.clone(),
                        reason: format!("could not read SSH key: {}", e),
                    })?;
                Ok(SshSettings {
                    user,
                    port,
                    password: String::new(),
                    private_key,
                    passphrase: self.ssh_key_passphrase.clone(),
                })
            }
        }
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16, ScaleError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| invalid(key, format!("'{}' is not a valid port", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
# control plane
CM_HOST=cm.example.com
CM_PORT=7183
CM_PROTOCOL=https
export CM_USER=admin
CM_PASS="s3cret"
CLUSTER_NAME='prod'
HOST_TEMPLATE=worker
SSH_PASS=rootpw
"#;

    fn sample() -> Config {
        Config::from_pairs(parse_pairs(SAMPLE)).unwrap()
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(SAMPLE);
        assert_eq!(pairs.get("CM_USER").map(String::as_str), Some("admin"));
        assert_eq!(pairs.get("CM_PASS").map(String::as_str), Some("s3cret"));
        assert_eq!(pairs.get("CLUSTER_NAME").map(String::as_str), Some("prod"));
        assert!(!pairs.contains_key("# control plane"));
    }

    #[test]
    fn test_parse_pairs_keeps_inner_equals() {
        let pairs = parse_pairs("CM_REPO_URL=http://repo/cm7/?a=b\n");
        assert_eq!(
            pairs.get("CM_REPO_URL").map(String::as_str),
            Some("http://repo/cm7/?a=b")
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_pairs(BTreeMap::new()).unwrap();
        assert_eq!(config.cm_port, "7180");
        assert_eq!(config.cm_protocol, "http");
        assert_eq!(config.ssh_port, "22");
        assert_eq!(config.ssh_user, "root");
    }

    #[test]
    fn test_endpoint() {
        let endpoint = sample().endpoint().unwrap();
        assert_eq!(endpoint.base_url(), "https://cm.example.com:7183");
    }

    #[test]
    fn test_endpoint_rejects_bad_port() {
        let mut config = sample();
        config.cm_port = "http".to_string();
        let err = config.endpoint().unwrap_err();
        assert!(matches!(err, ScaleError::ConfigInvalid { ref key, .. } if key == "CM_PORT"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("cmscale.conf")).unwrap_err();
        assert!(matches!(err, ScaleError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, ScaleError::ConfigUnreadable { ref path, .. } if path == dir.path()));
        assert!(!err.to_string().contains("<file>"));
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cmscale.conf");
        fs::write(&path, SAMPLE).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.cluster_name, "prod");
    }

    #[test]
    fn test_scale_up_settings_with_password() {
        let settings = sample()
            .cluster_settings(OperationKind::ScaleUp, AuthMode::Password)
            .unwrap();
        assert_eq!(settings.cluster, "prod");
        assert_eq!(settings.template, "worker");
        // Tag falls back to the template name.
        assert_eq!(settings.tag, "worker");
        assert_eq!(settings.ssh.password, "rootpw");
        assert_eq!(settings.ssh.port, 22);
        assert!(settings.repo_url.is_none());
    }

    #[test]
    fn test_scale_up_settings_with_key() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("id_rsa");
        fs::write(&key, "-----BEGIN KEY-----").unwrap();

        let mut config = sample();
        config.ssh_key = key.display().to_string();
        config.ssh_key_passphrase = "phrase".to_string();

        let settings = config
            .cluster_settings(OperationKind::ScaleUp, AuthMode::Key)
            .unwrap();
        assert!(settings.ssh.password.is_empty());
        assert_eq!(settings.ssh.private_key, "-----BEGIN KEY-----");
        assert_eq!(settings.ssh.passphrase, "phrase");
    }

    #[test]
    fn test_scale_up_requires_template() {
        let mut config = sample();
        config.host_template.clear();
        let err = config
            .cluster_settings(OperationKind::ScaleUp, AuthMode::Password)
            .unwrap_err();
        assert!(matches!(err, ScaleError::ConfigInvalid { ref key, .. } if key == "HOST_TEMPLATE"));
    }

    #[test]
    fn test_scale_down_needs_only_cluster() {
        let mut pairs = BTreeMap::new();
        pairs.insert("CLUSTER_NAME".to_string(), "prod".to_string());
        let settings = Config::from_pairs(pairs)
            .unwrap()
            .cluster_settings(OperationKind::ScaleDown, AuthMode::Password)
            .unwrap();
        assert_eq!(settings.cluster, "prod");
        assert!(settings.ssh.password.is_empty());
    }

    #[test]
    fn test_plan_settings_skip_ssh() {
        let mut config = sample();
        config.ssh_key = "/nonexistent/id_rsa".to_string();

        let settings = config.plan_settings(OperationKind::ScaleUp).unwrap();
        assert_eq!(settings.cluster, "prod");
        assert_eq!(settings.template, "worker");
        assert!(settings.ssh.private_key.is_empty());

        let err = config
            .cluster_settings(OperationKind::ScaleUp, AuthMode::Key)
            .unwrap_err();
        assert!(matches!(err, ScaleError::MissingInput { .. }));
    }
}
