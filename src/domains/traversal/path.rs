use crate::domains::obstacle_tracking::Coordinate;
use crate::domains::requirements::Requirement;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One target tile on a path, gated by requirements that must all hold
/// before the agent is sent toward it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub label: String,
    pub target: Coordinate,
    /// Pause after arrival, in milliseconds.
    #[serde(default)]
    pub settle_ms: u64,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl Checkpoint {
    pub fn new(label: impl Into<String>, target: Coordinate) -> Self {
        Self {
            label: label.into(),
            target,
            settle_ms: 0,
            requirements: Vec::new(),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle_ms = settle.as_millis() as u64;
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Immutable checkpoint sequence plus the run's position in it.
#[derive(Debug, Clone)]
pub struct Path {
    checkpoints: Arc<[Checkpoint]>,
    cursor: usize,
}

impl Path {
    pub fn new(checkpoints: impl Into<Arc<[Checkpoint]>>) -> Self {
        Self {
            checkpoints: checkpoints.into(),
            cursor: 0,
        }
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Handle on the checkpoint table that outlives borrows of the path.
    pub fn shared(&self) -> Arc<[Checkpoint]> {
        Arc::clone(&self.checkpoints)
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Checkpoint> {
        self.checkpoints.get(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.checkpoints.len()
    }

    pub fn advance(&mut self) {
        if !self.is_finished() {
            self.cursor += 1;
        }
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn percent_complete(&self) -> f64 {
        if self.checkpoints.is_empty() {
            return 100.0;
        }
        self.cursor as f64 * 100.0 / self.checkpoints.len() as f64
    }
}
