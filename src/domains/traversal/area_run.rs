use super::area::AreaDefinition;
use super::events::{RunEvent, RunState};
use super::navigator::PathNavigator;
use super::path::Path;
use super::ports::Clock;
use super::waiter::{StopSignal, WaitOutcome};
use crate::common::{TraversalError, TraversalResult};
use crate::domains::obstacle_tracking::ObstacleRegistry;
use chrono::{DateTime, Utc};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// One traversal of one area: enter, walk the gated path, act at the
/// destination and return.
///
/// Each `tick` runs at most one stage. `Completed` and `Failed` are terminal
/// until `reset`.
pub struct AreaRun {
    run_id: String,
    area: Arc<AreaDefinition>,
    path: Path,
    registry: ObstacleRegistry,
    state: RunState,
    stopped: bool,
    stop_signal: StopSignal,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    last_error: Option<TraversalError>,
    clock: Arc<dyn Clock>,
    uncommitted_events: Vec<RunEvent>,
}

impl AreaRun {
    pub fn new(area: Arc<AreaDefinition>, clock: Arc<dyn Clock>) -> Self {
        let registry = ObstacleRegistry::with_obstacles(area.obstacles.iter().copied());
        let path = Path::new(Arc::clone(&area.checkpoints));
        Self {
            run_id: Uuid::new_v4().to_string(),
            area,
            path,
            registry,
            state: RunState::Idle,
            stopped: false,
            stop_signal: StopSignal::new(),
            started_at: None,
            completed_at: None,
            last_error: None,
            clock,
            uncommitted_events: Vec::new(),
        }
    }

    /// Share a stop flag that cancels the current stage from any thread.
    pub fn with_stop_signal(mut self, signal: StopSignal) -> Self {
        self.stop_signal = signal;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn area(&self) -> &Arc<AreaDefinition> {
        &self.area
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &ObstacleRegistry {
        &self.registry
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn last_error(&self) -> Option<&TraversalError> {
        self.last_error.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The next tick does nothing but reset the run to `Idle`.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn uncommitted_events(&self) -> &[RunEvent] {
        &self.uncommitted_events
    }

    pub fn mark_events_as_committed(&mut self) {
        self.uncommitted_events.clear();
    }

    pub fn take_events(&mut self) -> Vec<RunEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }

    /// Back to `Idle` with the cursor at the first checkpoint and no obstacle
    /// history. Safe to call in any state.
    pub fn reset(&mut self) {
        if self.state != RunState::Idle || self.path.cursor() != 0 {
            let event = RunEvent::RunReset {
                run_id: self.run_id.clone(),
                area_id: self.area.id.clone(),
                timestamp: self.clock.now(),
            };
            self.uncommitted_events.push(event);
        }
        self.state = RunState::Idle;
        self.path.rewind();
        self.registry.clear();
        self.stopped = false;
        self.started_at = None;
    }

    pub fn tick(&mut self, navigator: &PathNavigator) -> RunState {
        if self.stopped || self.stop_signal.is_raised() {
            self.cancel();
            return self.state;
        }

        match self.state {
            RunState::Completed | RunState::Failed => self.state,
            RunState::Idle => {
                self.start();
                self.state
            }
            stage => {
                if !navigator.collaborators().supervisor.is_run_active() {
                    self.cancel();
                    return self.state;
                }

                let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_stage(stage, navigator)));
                match result {
                    Ok(Ok(next)) => self.transition(next),
                    Ok(Err(error)) if error.is_cancellation() => self.cancel(),
                    Ok(Err(error)) => self.fail(error),
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        let action = self.stage_action(stage).to_string();
                        self.fail(TraversalError::StageActionFailure { action, reason });
                    }
                }
                self.state
            }
        }
    }

    fn start(&mut self) {
        let now = self.clock.now();
        self.run_id = Uuid::new_v4().to_string();
        self.started_at = Some(now);
        self.completed_at = None;
        self.last_error = None;
        self.uncommitted_events.push(RunEvent::RunStarted {
            run_id: self.run_id.clone(),
            area_id: self.area.id.clone(),
            timestamp: now,
        });
        self.transition(RunState::Entering);
    }

    fn run_stage(&mut self, stage: RunState, navigator: &PathNavigator) -> TraversalResult<RunState> {
        let collaborators = navigator.collaborators().clone();
        let settings = navigator.settings().clone();
        let supervisor = collaborators.supervisor.clone();
        let area = self.area.clone();
        let stop = self.stop_signal.clone();
        let inactive = move || stop.is_raised() || !supervisor.is_run_active();

        match stage {
            RunState::Entering => {
                self.perform(navigator, &area.stages.enter)?;
                let outcome = navigator.waiter().wait(
                    || navigator.agent_is_at(&area.start),
                    settings.poll_interval(),
                    settings.enter_timeout(),
                    inactive,
                );
                match outcome {
                    WaitOutcome::Satisfied => Ok(RunState::Navigating),
                    WaitOutcome::TimedOut => Err(TraversalError::MovementTimeout {
                        target: format!("start {}", area.start),
                    }),
                    WaitOutcome::Cancelled => Err(TraversalError::Cancelled),
                }
            }
            RunState::Navigating => {
                let before = self.path.cursor();
                let result = navigator.navigate_path(&mut self.path, &mut self.registry, &area.bounds, inactive);
                self.record_checkpoints(before);
                result.map(|_| RunState::Acting)
            }
            RunState::Acting => {
                if !navigator.is_within(&area.bounds) {
                    return Err(TraversalError::AreaExitFailsafe {
                        stage: RunState::Acting.to_string(),
                    });
                }
                self.perform(navigator, &area.stages.act)?;
                let agent = collaborators.agent.clone();
                let outcome = navigator.waiter().wait(
                    || !agent.is_contained_in(&area.bounds) && !agent.is_animating(),
                    settings.poll_interval(),
                    settings.act_timeout(),
                    inactive,
                );
                match outcome {
                    WaitOutcome::Satisfied => Ok(RunState::Returning),
                    WaitOutcome::TimedOut => Err(TraversalError::StageActionFailure {
                        action: area.stages.act.clone(),
                        reason: "agent did not leave the area after acting".to_string(),
                    }),
                    WaitOutcome::Cancelled => Err(TraversalError::Cancelled),
                }
            }
            RunState::Returning => {
                self.perform(navigator, &area.stages.return_home)?;
                Ok(RunState::Completed)
            }
            other => Ok(other),
        }
    }

    fn perform(&self, navigator: &PathNavigator, action: &str) -> TraversalResult<()> {
        match navigator.collaborators().actions.perform(action) {
            Ok(true) => Ok(()),
            Ok(false) => Err(TraversalError::StageActionFailure {
                action: action.to_string(),
                reason: "action reported failure".to_string(),
            }),
            Err(e) => Err(TraversalError::StageActionFailure {
                action: action.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn record_checkpoints(&mut self, from: usize) {
        let now = self.clock.now();
        let to = self.path.cursor();
        for index in from..to {
            let label = self.path.checkpoints()[index].label.clone();
            self.uncommitted_events.push(RunEvent::CheckpointReached {
                run_id: self.run_id.clone(),
                area_id: self.area.id.clone(),
                label,
                index,
                timestamp: now,
            });
        }
    }

    fn transition(&mut self, next: RunState) {
        if next == self.state {
            return;
        }
        let now = self.clock.now();
        self.uncommitted_events.push(RunEvent::StageEntered {
            run_id: self.run_id.clone(),
            area_id: self.area.id.clone(),
            from: self.state,
            to: next,
            timestamp: now,
        });
        self.state = next;

        if next == RunState::Completed {
            self.completed_at = Some(now);
            let duration_ms = self
                .started_at
                .map(|s| now.signed_duration_since(s).num_milliseconds().max(0) as u64)
                .unwrap_or(0);
            self.uncommitted_events.push(RunEvent::RunCompleted {
                run_id: self.run_id.clone(),
                area_id: self.area.id.clone(),
                duration_ms,
                timestamp: now,
            });
        }
    }

    fn fail(&mut self, error: TraversalError) {
        let stage = self.state;
        self.uncommitted_events.push(RunEvent::RunFailed {
            run_id: self.run_id.clone(),
            area_id: self.area.id.clone(),
            stage,
            error_kind: error.kind().to_string(),
            reason: error.to_string(),
            timestamp: self.clock.now(),
        });
        self.last_error = Some(error);
        self.transition(RunState::Failed);
    }

    fn cancel(&mut self) {
        if self.state.is_active() {
            self.uncommitted_events.push(RunEvent::RunCancelled {
                run_id: self.run_id.clone(),
                area_id: self.area.id.clone(),
                stage: self.state,
                timestamp: self.clock.now(),
            });
        }
        self.reset();
    }

    fn stage_action(&self, stage: RunState) -> &str {
        match stage {
            RunState::Entering => &self.area.stages.enter,
            RunState::Acting => &self.area.stages.act,
            RunState::Returning => &self.area.stages.return_home,
            _ => "navigate",
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "stage handler panicked".to_string()
    }
}
