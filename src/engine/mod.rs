//! Resumable step workflow.
//!
//! The engine is split in three:
//! 1. [`step`] - Operations and their fixed step lists
//! 2. [`steps`] - What each step does against the control plane
//! 3. [`executor`] - Walking the list and persisting the resume marker

pub mod executor;
pub mod step;
pub mod steps;

pub use executor::{NoProgress, Workflow, WorkflowCallback, start_index};
pub use step::{OperationKind, Step};
pub use steps::{ClusterSettings, ClusterSteps, SshSettings, StepRunner};
