//! Target host list.

use crate::error::ScaleError;
use std::fs;
use std::path::Path;

/// Ordered host names an operation targets.
///
/// Names are kept as written; validating them is the control plane's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSet {
    names: Vec<String>,
}

impl HostSet {
    /// Wrap host names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// One host per non-empty line, in file order.
    pub fn parse(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    /// Read the host list from a file.
    pub fn load(path: &Path) -> Result<Self, ScaleError> {
        let missing = |reason: String| ScaleError::MissingInput {
            path: path.to_path_buf(),
            reason,
        };

        if !path.exists() {
            return Err(missing("host list not found".to_string()));
        }

        let content = fs::read_to_string(path).map_err(|e| missing(e.to_string()))?;
        let hosts = Self::parse(&content);
        if hosts.is_empty() {
            return Err(missing("host list is empty".to_string()));
        }

        log::debug!("Loaded {} hosts from {}", hosts.len(), path.display());
        Ok(hosts)
    }

    /// Host names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether `name` is a target host.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Number of hosts.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there are no hosts.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_blank_lines() {
        let hosts = HostSet::parse("h1\n\n  h2  \n\t\nh1\n");
        assert_eq!(hosts.names(), &["h1", "h2", "h1"]);
    }

    #[test]
    fn test_contains() {
        let hosts = HostSet::new(["a.example.com", "b.example.com"]);
        assert!(hosts.contains("b.example.com"));
        assert!(!hosts.contains("b"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = HostSet::load(&dir.path().join("hosts.txt")).unwrap_err();
        assert!(matches!(err, ScaleError::MissingInput { .. }));
    }

    #[test]
    fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hosts.txt");
        fs::write(&path, "\n   \n").unwrap();
        let err = HostSet::load(&path).unwrap_err();
        assert!(matches!(err, ScaleError::MissingInput { ref reason, .. } if reason.contains("empty")));
    }

    #[test]
    fn test_load_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hosts.txt");
        fs::write(&path, "node3\nnode1\nnode2\n").unwrap();
        let hosts = HostSet::load(&path).unwrap();
        assert_eq!(hosts.names(), &["node3", "node1", "node2"]);
    }
}
