//! Walks an operation's step list, persisting the resume marker as it goes.

use super::step::{OperationKind, Step};
use super::steps::StepRunner;
use crate::error::{ScaleError, WorkflowError};
use crate::state::{Checkpoint, StateStore, WorkflowState};

/// Progress notifications for a workflow walk.
pub trait WorkflowCallback {
    /// Called once the step's marker is persisted, before it runs.
    ///
    /// # Arguments
    /// * `step` - The step about to run
    /// * `index` - Position in the operation (0-indexed)
    /// * `total` - Number of steps in the operation
    fn on_step_start(&mut self, step: Step, index: usize, total: usize);

    /// Called when a step completes.
    fn on_step_complete(&mut self, step: Step);

    /// Called when a step fails. The walk stops right after.
    fn on_step_failed(&mut self, step: Step, error: &ScaleError);
}

/// No-op callback.
pub struct NoProgress;

impl WorkflowCallback for NoProgress {
    fn on_step_start(&mut self, _step: Step, _index: usize, _total: usize) {}
    fn on_step_complete(&mut self, _step: Step) {}
    fn on_step_failed(&mut self, _step: Step, _error: &ScaleError) {}
}

/// Index of the first step to run when starting from `state`.
///
/// Returns `None` when the operation is already done. A step that does not
/// belong to `kind` is a usage error.
pub fn start_index(
    kind: OperationKind,
    state: WorkflowState,
) -> Result<Option<usize>, ScaleError> {
    match state {
        WorkflowState::None => Ok(Some(0)),
        WorkflowState::Done => Ok(None),
        WorkflowState::At(step) => kind.position(step).map(Some).ok_or_else(|| {
            ScaleError::InvalidUsage(format!("step {} is not part of {}", step, kind))
        }),
    }
}

/// One operation's step walk.
pub struct Workflow<'a> {
    kind: OperationKind,
    store: &'a mut dyn StateStore,
    runner: &'a dyn StepRunner,
    callback: &'a mut dyn WorkflowCallback,
}

impl<'a> Workflow<'a> {
    pub fn new(
        kind: OperationKind,
        store: &'a mut dyn StateStore,
        runner: &'a dyn StepRunner,
        callback: &'a mut dyn WorkflowCallback,
    ) -> Self {
        Self {
            kind,
            store,
            runner,
            callback,
        }
    }

    /// Run from `from` to the end.
    ///
    /// The in-flight step is persisted before it runs and stays persisted if
    /// it fails, so the next resume repeats it. Returns the final state,
    /// which is always [`WorkflowState::Done`] on success.
    pub fn run(&mut self, from: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        let steps = self.kind.steps();
        let first = start_index(self.kind, from).map_err(|source| WorkflowError {
            step: from.step().unwrap_or(steps[0]),
            source,
        })?;

        let Some(first) = first else {
            log::info!("{} already done, nothing to run", self.kind);
            return Ok(WorkflowState::Done);
        };

        if first > 0 {
            log::info!("Resuming {} at {}", self.kind, steps[first]);
        }

        for (index, &step) in steps.iter().enumerate().skip(first) {
            self.persist(WorkflowState::At(step))
                .map_err(|source| WorkflowError { step, source })?;

            log::info!("[{}/{}] {}", index + 1, steps.len(), step);
            self.callback.on_step_start(step, index, steps.len());

            if let Err(source) = self.runner.run(step) {
                log::error!("{} failed: {}", step, source);
                self.callback.on_step_failed(step, &source);
                return Err(WorkflowError { step, source });
            }

            self.callback.on_step_complete(step);
            log::debug!("{} completed", step);
        }

        let last = steps[steps.len() - 1];
        self.persist(WorkflowState::Done)
            .map_err(|source| WorkflowError { step: last, source })?;

        log::info!("{} done", self.kind);
        Ok(WorkflowState::Done)
    }

    fn persist(&mut self, state: WorkflowState) -> Result<(), ScaleError> {
        self.store.save(&Checkpoint::new(self.kind, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStateStore;
    use std::cell::RefCell;

    /// Runner that records steps and fails on request.
    #[derive(Default)]
    struct FakeRunner {
        ran: RefCell<Vec<Step>>,
        fail_at: Option<Step>,
    }

    impl FakeRunner {
        fn failing_at(step: Step) -> Self {
            Self {
                fail_at: Some(step),
                ..Default::default()
            }
        }

        fn ran(&self) -> Vec<Step> {
            self.ran.borrow().clone()
        }
    }

    impl StepRunner for FakeRunner {
        fn run(&self, step: Step) -> Result<(), ScaleError> {
            self.ran.borrow_mut().push(step);
            if self.fail_at == Some(step) {
                return Err(ScaleError::CommandFailed {
                    id: 42,
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl WorkflowCallback for Recorder {
        fn on_step_start(&mut self, step: Step, index: usize, total: usize) {
            self.events.push(format!("start {} {}/{}", step, index + 1, total));
        }
        fn on_step_complete(&mut self, step: Step) {
            self.events.push(format!("ok {}", step));
        }
        fn on_step_failed(&mut self, step: Step, _error: &ScaleError) {
            self.events.push(format!("fail {}", step));
        }
    }

    #[test]
    fn test_fresh_scale_up_runs_every_step() {
        let mut store = MemoryStateStore::new();
        let runner = FakeRunner::default();
        let mut progress = NoProgress;

        let end = Workflow::new(OperationKind::ScaleUp, &mut store, &runner, &mut progress)
            .run(WorkflowState::None)
            .unwrap();

        assert_eq!(end, WorkflowState::Done);
        assert_eq!(runner.ran(), OperationKind::ScaleUp.steps());

        let mut expected: Vec<_> = OperationKind::ScaleUp
            .steps()
            .iter()
            .map(|s| WorkflowState::At(*s))
            .collect();
        expected.push(WorkflowState::Done);
        assert_eq!(store.history(), expected.as_slice());
    }

    #[test]
    fn test_resume_skips_completed_steps() {
        let mut store = MemoryStateStore::new();
        let runner = FakeRunner::default();
        let mut progress = NoProgress;

        Workflow::new(OperationKind::ScaleUp, &mut store, &runner, &mut progress)
            .run(WorkflowState::At(Step::ApplyHostTemplate))
            .unwrap();

        assert_eq!(
            runner.ran(),
            vec![
                Step::ApplyHostTemplate,
                Step::VerifyTags,
                Step::ApplyStaleConfigs
            ]
        );
        assert!(!runner.ran().contains(&Step::InstallHosts));
        assert!(!runner.ran().contains(&Step::RegisterInCluster));
    }

    #[test]
    fn test_failure_leaves_marker() {
        let mut store = MemoryStateStore::new();
        let runner = FakeRunner::failing_at(Step::VerifyCommission);
        let mut recorder = Recorder::default();

        let err = Workflow::new(OperationKind::ScaleUp, &mut store, &runner, &mut recorder)
            .run(WorkflowState::None)
            .unwrap_err();

        assert_eq!(err.step, Step::VerifyCommission);
        assert!(matches!(err.source, ScaleError::CommandFailed { id: 42, .. }));
        assert_eq!(
            store.load().unwrap().unwrap().step,
            WorkflowState::At(Step::VerifyCommission)
        );
        assert_eq!(runner.ran().last(), Some(&Step::VerifyCommission));
        assert_eq!(recorder.events.last().unwrap(), "fail verify_commission");
    }

    #[test]
    fn test_done_runs_nothing() {
        let mut store = MemoryStateStore::new();
        let runner = FakeRunner::default();
        let mut progress = NoProgress;

        let end = Workflow::new(OperationKind::ScaleDown, &mut store, &runner, &mut progress)
            .run(WorkflowState::Done)
            .unwrap();

        assert_eq!(end, WorkflowState::Done);
        assert!(runner.ran().is_empty());
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_foreign_step_is_rejected() {
        let mut store = MemoryStateStore::new();
        let runner = FakeRunner::default();
        let mut progress = NoProgress;

        let err = Workflow::new(OperationKind::ScaleDown, &mut store, &runner, &mut progress)
            .run(WorkflowState::At(Step::VerifyTags))
            .unwrap_err();

        assert!(matches!(err.source, ScaleError::InvalidUsage(_)));
        assert!(runner.ran().is_empty());
    }

    #[test]
    fn test_callback_sees_each_transition() {
        let mut store = MemoryStateStore::new();
        let runner = FakeRunner::default();
        let mut recorder = Recorder::default();

        Workflow::new(OperationKind::ScaleDown, &mut store, &runner, &mut recorder)
            .run(WorkflowState::None)
            .unwrap();

        assert_eq!(
            recorder.events,
            vec![
                "start remove_hosts 1/2",
                "ok remove_hosts",
                "start apply_stale_configs 2/2",
                "ok apply_stale_configs",
            ]
        );
    }

    #[test]
    fn test_start_index() {
        assert_eq!(
            start_index(OperationKind::ScaleUp, WorkflowState::None).unwrap(),
            Some(0)
        );
        assert_eq!(
            start_index(OperationKind::ScaleDown, WorkflowState::At(Step::ApplyStaleConfigs))
                .unwrap(),
            Some(1)
        );
        assert_eq!(
            start_index(OperationKind::ScaleUp, WorkflowState::Done).unwrap(),
            None
        );
    }
}
