use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and tolerance knobs for waits and movement. All durations in
/// milliseconds so they map one-to-one onto the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub poll_interval_ms: u64,
    /// Budget for a checkpoint's requirement set to pass.
    pub requirement_timeout_ms: u64,
    /// Budget for the agent to reach a checkpoint once moving.
    pub movement_timeout_ms: u64,
    pub enter_timeout_ms: u64,
    pub act_timeout_ms: u64,
    pub arrival_tolerance: f64,
    pub freshness_window_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 150,
            requirement_timeout_ms: 120_000,
            movement_timeout_ms: 10_000,
            enter_timeout_ms: 10_000,
            act_timeout_ms: 10_000,
            arrival_tolerance: 0.5,
            freshness_window_ms: 5_000,
        }
    }
}

impl EngineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn requirement_timeout(&self) -> Duration {
        Duration::from_millis(self.requirement_timeout_ms)
    }

    pub fn movement_timeout(&self) -> Duration {
        Duration::from_millis(self.movement_timeout_ms)
    }

    pub fn enter_timeout(&self) -> Duration {
        Duration::from_millis(self.enter_timeout_ms)
    }

    pub fn act_timeout(&self) -> Duration {
        Duration::from_millis(self.act_timeout_ms)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_millis(self.freshness_window_ms)
    }
}
