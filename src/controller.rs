//! Operation controller: resolves the starting point, runs the workflow and
//! finalizes persisted progress.

use crate::engine::{OperationKind, Step, StepRunner, Workflow, WorkflowCallback, start_index};
use crate::error::ScaleError;
use crate::hosts::HostSet;
use crate::state::{Checkpoint, MemoryStateStore, StateStore, WorkflowState};
use anyhow::{Context, Result};
use clap::ValueEnum;

/// How an operation is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExecutionMode {
    /// Perform every call against the control plane.
    #[default]
    Run,
    /// Walk every step, recording calls instead of sending them.
    DryRun,
    /// Show the hosts and steps, then stop.
    Plan,
}

/// One invocation: immutable for the whole run.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub mode: ExecutionMode,
    pub resume: bool,
    pub hosts: HostSet,
}

/// What a plan would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub kind: OperationKind,
    pub hosts: Vec<String>,
    /// Steps that would run, in order. Empty when only finalization remains.
    pub steps: Vec<Step>,
}

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Plan mode: nothing ran.
    Planned(Plan),
    /// The workflow reached `done` and progress was cleared.
    Completed {
        /// Where the walk started.
        from: WorkflowState,
        /// Whether calls were only simulated.
        simulated: bool,
    },
}

impl Operation {
    /// State to start from, validated against this operation.
    ///
    /// Without `resume` the run is fresh; an existing checkpoint is reported
    /// and then overwritten.
    pub fn starting_state(
        &self,
        checkpoint: Option<&Checkpoint>,
    ) -> Result<WorkflowState, ScaleError> {
        if !self.resume {
            if let Some(existing) = checkpoint.filter(|c| c.step != WorkflowState::None) {
                log::warn!(
                    "Ignoring {} checkpoint at '{}' (saved {}); starting fresh",
                    existing.action,
                    existing.step,
                    existing.last_updated.format("%Y-%m-%d %H:%M:%S")
                );
            }
            return Ok(WorkflowState::None);
        }

        let Some(checkpoint) = checkpoint else {
            log::info!("No checkpoint found, starting {} fresh", self.kind);
            return Ok(WorkflowState::None);
        };

        if checkpoint.action != self.kind {
            return Err(ScaleError::InvalidUsage(format!(
                "checkpoint belongs to {}, not {}",
                checkpoint.action, self.kind
            )));
        }
        start_index(self.kind, checkpoint.step)?;
        Ok(checkpoint.step)
    }

    /// Steps that would run from `state`.
    pub fn plan(&self, state: WorkflowState) -> Result<Plan, ScaleError> {
        let steps = match start_index(self.kind, state)? {
            Some(first) => self.kind.steps()[first..].to_vec(),
            None => Vec::new(),
        };
        Ok(Plan {
            kind: self.kind,
            hosts: self.hosts.names().to_vec(),
            steps,
        })
    }
}

/// Carry out `op`.
///
/// `store` holds the real checkpoint. In dry-run mode it is only read: the
/// walk persists into an in-memory copy.
pub fn execute(
    op: &Operation,
    store: &mut dyn StateStore,
    runner: &dyn StepRunner,
    callback: &mut dyn WorkflowCallback,
) -> Result<Outcome> {
    let checkpoint = if op.resume || op.mode != ExecutionMode::Plan {
        read_checkpoint(op, store)?
    } else {
        None
    };
    let from = op.starting_state(checkpoint.as_ref())?;

    log::info!(
        "{} of {} hosts ({:?}, from '{}')",
        op.kind,
        op.hosts.len(),
        op.mode,
        from
    );

    match op.mode {
        ExecutionMode::Plan => Ok(Outcome::Planned(op.plan(from)?)),
        ExecutionMode::DryRun => {
            let mut scratch = MemoryStateStore::seeded(checkpoint);
            walk(op, from, &mut scratch, runner, callback)?;
            Ok(Outcome::Completed {
                from,
                simulated: true,
            })
        }
        ExecutionMode::Run => {
            walk(op, from, store, runner, callback)?;
            Ok(Outcome::Completed {
                from,
                simulated: false,
            })
        }
    }
}

/// Load the checkpoint. Only a resume needs it to be readable; a fresh run
/// overwrites whatever is there.
fn read_checkpoint(op: &Operation, store: &dyn StateStore) -> Result<Option<Checkpoint>> {
    match store.load() {
        Ok(checkpoint) => Ok(checkpoint),
        Err(err) if !op.resume => {
            log::warn!("Ignoring unreadable checkpoint ({}); starting fresh", err);
            Ok(None)
        }
        Err(err) => Err(err).context("Failed to read checkpoint"),
    }
}

fn walk(
    op: &Operation,
    from: WorkflowState,
    store: &mut dyn StateStore,
    runner: &dyn StepRunner,
    callback: &mut dyn WorkflowCallback,
) -> Result<()> {
    if from.is_done() {
        log::info!("Checkpoint says {} is done; finalizing", op.kind);
    }

    let end = Workflow::new(op.kind, store, runner, callback).run(from)?;
    if end.is_done() {
        store.clear().context("Failed to clear checkpoint")?;
    }
    Ok(())
}
