use super::area::AreaBounds;
use super::path::{Checkpoint, Path};
use super::ports::Collaborators;
use super::settings::EngineSettings;
use super::waiter::{PollingWaiter, WaitOutcome};
use crate::common::{TraversalError, TraversalResult};
use crate::domains::obstacle_tracking::{Coordinate, ObstacleRegistry};
use crate::domains::requirements::{RequirementEvaluator, RequirementReport};

/// Moves the agent checkpoint by checkpoint, holding at each one until its
/// requirements pass.
#[derive(Clone)]
pub struct PathNavigator {
    collaborators: Collaborators,
    waiter: PollingWaiter,
    settings: EngineSettings,
}

impl PathNavigator {
    pub fn new(collaborators: Collaborators, settings: EngineSettings) -> Self {
        let waiter = PollingWaiter::new(collaborators.clock.clone());
        Self {
            collaborators,
            waiter,
            settings,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn waiter(&self) -> &PollingWaiter {
        &self.waiter
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn is_within(&self, bounds: &AreaBounds) -> bool {
        self.collaborators.agent.is_contained_in(bounds)
    }

    pub fn agent_is_at(&self, target: &Coordinate) -> bool {
        self.collaborators
            .agent
            .position()
            .map(|p| p.is_within(target, self.settings.arrival_tolerance))
            .unwrap_or(false)
    }

    /// Sample, purge and evaluate one checkpoint's requirements once.
    pub fn check_requirements(&self, checkpoint: &Checkpoint, registry: &mut ObstacleRegistry) -> RequirementReport {
        let now = self.collaborators.clock.now();
        registry.sample(self.collaborators.sensor.as_ref(), now);
        registry.purge_stale(now, self.settings.freshness_window());
        RequirementEvaluator::evaluate_all(&checkpoint.requirements, registry, self.collaborators.agent.position())
    }

    /// Walk to a single checkpoint without gating on its requirements.
    pub fn advance_to<F>(&self, checkpoint: &Checkpoint, registry: &mut ObstacleRegistry, is_within_area: F) -> TraversalResult<()>
    where
        F: FnMut() -> bool,
    {
        self.advance_to_with(checkpoint, registry, is_within_area, || false)
    }

    fn advance_to_with<F, C>(
        &self,
        checkpoint: &Checkpoint,
        registry: &mut ObstacleRegistry,
        mut is_within_area: F,
        mut cancel: C,
    ) -> TraversalResult<()>
    where
        F: FnMut() -> bool,
        C: FnMut() -> bool,
    {
        if self.agent_is_at(&checkpoint.target) {
            tracing::debug!(checkpoint = %checkpoint.label, "already at checkpoint");
            return Ok(());
        }

        self.collaborators.agent.move_to(checkpoint.target);

        let sensor = self.collaborators.sensor.clone();
        let clock = self.collaborators.clock.clone();
        let mut interrupted = None;
        let outcome = self.waiter.wait(
            || {
                // keep movement vectors current for the next gate
                registry.sample(sensor.as_ref(), clock.now());
                self.agent_is_at(&checkpoint.target)
            },
            self.settings.poll_interval(),
            self.settings.movement_timeout(),
            || interruption(&mut cancel, &mut is_within_area, "navigating", &mut interrupted),
        );

        match outcome {
            WaitOutcome::Satisfied => {}
            WaitOutcome::TimedOut => {
                return Err(TraversalError::MovementTimeout {
                    target: format!("{} {}", checkpoint.label, checkpoint.target),
                })
            }
            WaitOutcome::Cancelled => return Err(interrupted.unwrap_or(TraversalError::Cancelled)),
        }

        if checkpoint.settle_ms > 0 {
            let mut interrupted = None;
            let settled = self.waiter.wait(
                || false,
                self.settings.poll_interval(),
                checkpoint.settle(),
                || interruption(&mut cancel, &mut is_within_area, "navigating", &mut interrupted),
            );
            if settled == WaitOutcome::Cancelled {
                return Err(interrupted.unwrap_or(TraversalError::Cancelled));
            }
        }

        tracing::debug!(checkpoint = %checkpoint.label, "arrived");
        Ok(())
    }

    /// Traverse the path from its cursor to the end. Any timeout, area exit
    /// or cancellation aborts the remaining checkpoints.
    pub fn navigate_path<C>(
        &self,
        path: &mut Path,
        registry: &mut ObstacleRegistry,
        bounds: &AreaBounds,
        mut cancel: C,
    ) -> TraversalResult<()>
    where
        C: FnMut() -> bool,
    {
        let agent = self.collaborators.agent.clone();
        let mut contained = || agent.is_contained_in(bounds);

        let checkpoints = path.shared();
        while let Some(checkpoint) = checkpoints.get(path.cursor()) {
            if cancel() {
                return Err(TraversalError::Cancelled);
            }
            if !contained() {
                tracing::warn!(checkpoint = %checkpoint.label, "agent outside area, aborting path");
                return Err(TraversalError::AreaExitFailsafe {
                    stage: "navigating".to_string(),
                });
            }

            let mut last_report = None;
            let mut interrupted = None;
            let outcome = self.waiter.wait(
                || {
                    let report = self.check_requirements(checkpoint, registry);
                    let passed = report.passed();
                    last_report = Some(report);
                    passed
                },
                self.settings.poll_interval(),
                self.settings.requirement_timeout(),
                || interruption(&mut cancel, &mut contained, "navigating", &mut interrupted),
            );

            match outcome {
                WaitOutcome::Satisfied => {}
                WaitOutcome::TimedOut => {
                    let failing = last_report.map(|r| r.failing).unwrap_or_default();
                    tracing::warn!(checkpoint = %checkpoint.label, ?failing, "requirements never passed");
                    return Err(TraversalError::RequirementTimeout {
                        checkpoint: checkpoint.label.clone(),
                        failing,
                    });
                }
                WaitOutcome::Cancelled => return Err(interrupted.unwrap_or(TraversalError::Cancelled)),
            }

            self.advance_to_with(checkpoint, registry, &mut contained, &mut cancel)?;
            path.advance();
            tracing::debug!(
                checkpoint = %checkpoint.label,
                progress = path.percent_complete(),
                "checkpoint reached"
            );
        }
        Ok(())
    }
}

/// Shared cancel check for every wait: an external stop wins over the area
/// failsafe, and the reason is kept for the caller.
fn interruption<C, F>(cancel: &mut C, contained: &mut F, stage: &str, reason: &mut Option<TraversalError>) -> bool
where
    C: FnMut() -> bool,
    F: FnMut() -> bool,
{
    if cancel() {
        *reason = Some(TraversalError::Cancelled);
        return true;
    }
    if !contained() {
        *reason = Some(TraversalError::AreaExitFailsafe {
            stage: stage.to_string(),
        });
        return true;
    }
    false
}
