//! Checkpoint persistence: a small TOML file holding the action, the resume
//! marker (a step name, `done`, or empty) and when it was last written.

use crate::engine::{OperationKind, Step};
use crate::error::ScaleError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// Workflow State
// ============================================================================

/// Marker for the terminal state.
pub const DONE_MARKER: &str = "done";

/// Where a workflow stands.
///
/// `At(step)` means the step was in flight when the process last stopped and
/// is the resume point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WorkflowState {
    /// No step in flight: fresh start, or the last step just completed.
    #[default]
    None,
    /// The step that was in flight.
    At(Step),
    /// The whole operation completed.
    Done,
}

impl WorkflowState {
    /// Whether the operation completed.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The in-flight step, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::At(step) => Some(*step),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::At(step) => f.write_str(step.name()),
            Self::Done => f.write_str(DONE_MARKER),
        }
    }
}

impl FromStr for WorkflowState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Self::None),
            DONE_MARKER => Ok(Self::Done),
            other => other.parse().map(Self::At),
        }
    }
}

impl From<WorkflowState> for String {
    fn from(state: WorkflowState) -> Self {
        state.to_string()
    }
}

impl TryFrom<String> for WorkflowState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Checkpoint
// ============================================================================

/// Persisted progress of one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Operation that wrote the marker.
    pub action: OperationKind,

    /// Resume marker.
    pub step: WorkflowState,

    /// Last time the marker was written.
    pub last_updated: DateTime<Utc>,
}

impl Checkpoint {
    /// Checkpoint for `action` at `step`, stamped now.
    pub fn new(action: OperationKind, step: WorkflowState) -> Self {
        Self {
            action,
            step,
            last_updated: Utc::now(),
        }
    }
}

/// Load/save boundary for checkpoints.
///
/// There is exactly one writer: the running workflow.
pub trait StateStore {
    /// Read the checkpoint, if one exists.
    fn load(&self) -> Result<Option<Checkpoint>, ScaleError>;

    /// Replace the checkpoint.
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), ScaleError>;

    /// Remove the checkpoint.
    fn clear(&mut self) -> Result<(), ScaleError>;
}

// ============================================================================
// File Store
// ============================================================================

/// Checkpoint stored as a TOML file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, err: impl fmt::Display) -> ScaleError {
        ScaleError::State(format!(
            "failed to {} {}: {}",
            action,
            self.path.display(),
            err
        ))
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<Checkpoint>, ScaleError> {
        if !self.path.exists() {
            log::debug!("Checkpoint {} does not exist", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error("read", e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let checkpoint: Checkpoint =
            toml::from_str(&content).map_err(|e| self.io_error("parse", e))?;

        log::debug!(
            "Loaded checkpoint {} ({} at '{}')",
            self.path.display(),
            checkpoint.action,
            checkpoint.step
        );
        Ok(Some(checkpoint))
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), ScaleError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_error("create directory for", e))?;
        }

        let content =
            toml::to_string_pretty(checkpoint).map_err(|e| self.io_error("serialize", e))?;

        // An interrupted write must never leave a torn marker behind.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).map_err(|e| self.io_error("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error("replace", e))?;

        log::debug!(
            "Saved checkpoint '{}' to {}",
            checkpoint.step,
            self.path.display()
        );
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ScaleError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| self.io_error("remove", e))?;
            log::debug!("Removed checkpoint {}", self.path.display());
        }
        Ok(())
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// Checkpoint kept in memory.
///
/// Dry runs use it so a simulation never overwrites a real resume marker.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    checkpoint: Option<Checkpoint>,
    history: Vec<WorkflowState>,
}

impl MemoryStateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store starting from an existing checkpoint.
    pub fn seeded(checkpoint: Option<Checkpoint>) -> Self {
        Self {
            checkpoint,
            history: Vec::new(),
        }
    }

    /// Every marker saved so far, in order.
    pub fn history(&self) -> &[WorkflowState] {
        &self.history
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<Checkpoint>, ScaleError> {
        Ok(self.checkpoint.clone())
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), ScaleError> {
        self.history.push(checkpoint.step);
        self.checkpoint = Some(checkpoint.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ScaleError> {
        self.checkpoint = None;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
