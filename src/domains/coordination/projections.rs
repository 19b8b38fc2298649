use crate::domains::traversal::{RunEvent, RunState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaStatistics {
    pub area_id: String,
    pub runs_started: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub checkpoints_reached: u64,
    pub consecutive_failures: u32,
    pub last_failure: Option<String>,
    pub last_failed_stage: Option<RunState>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub fastest_run_ms: Option<u64>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl AreaStatistics {
    pub fn new(area_id: String) -> Self {
        Self {
            area_id,
            runs_started: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
            checkpoints_reached: 0,
            consecutive_failures: 0,
            last_failure: None,
            last_failed_stage: None,
            last_completed_at: None,
            fastest_run_ms: None,
            last_activity: None,
        }
    }

    pub fn apply_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { timestamp, .. } => {
                self.runs_started += 1;
                self.last_activity = Some(*timestamp);
            }
            RunEvent::CheckpointReached { timestamp, .. } => {
                self.checkpoints_reached += 1;
                self.last_activity = Some(*timestamp);
            }
            RunEvent::RunCompleted { duration_ms, timestamp, .. } => {
                self.completed += 1;
                self.consecutive_failures = 0;
                self.last_completed_at = Some(*timestamp);
                self.fastest_run_ms = Some(self.fastest_run_ms.map_or(*duration_ms, |f| f.min(*duration_ms)));
                self.last_activity = Some(*timestamp);
            }
            RunEvent::RunFailed { stage, reason, timestamp, .. } => {
                self.failed += 1;
                self.consecutive_failures += 1;
                self.last_failure = Some(reason.clone());
                self.last_failed_stage = Some(*stage);
                self.last_activity = Some(*timestamp);
            }
            RunEvent::RunCancelled { timestamp, .. } => {
                self.cancelled += 1;
                self.last_activity = Some(*timestamp);
            }
            RunEvent::StageEntered { .. } | RunEvent::RunReset { .. } => {}
        }
    }
}

/// Per-area counters built from run events.
#[derive(Debug, Default)]
pub struct RunStatistics {
    pub areas: HashMap<String, AreaStatistics>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_event(&mut self, event: &RunEvent) {
        let area_id = event.area_id();
        self.areas
            .entry(area_id.to_string())
            .or_insert_with(|| AreaStatistics::new(area_id.to_string()))
            .apply_event(event);
    }

    pub fn area(&self, area_id: &str) -> Option<&AreaStatistics> {
        self.areas.get(area_id)
    }

    pub fn total_completed(&self) -> u64 {
        self.areas.values().map(|a| a.completed).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.areas.values().map(|a| a.failed).sum()
    }
}
