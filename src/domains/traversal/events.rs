use crate::common::DomainEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Entering,
    Navigating,
    Acting,
    Returning,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::Entering | RunState::Navigating | RunState::Acting | RunState::Returning
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Entering => "entering",
            RunState::Navigating => "navigating",
            RunState::Acting => "acting",
            RunState::Returning => "returning",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        area_id: String,
        timestamp: DateTime<Utc>,
    },
    StageEntered {
        run_id: String,
        area_id: String,
        from: RunState,
        to: RunState,
        timestamp: DateTime<Utc>,
    },
    CheckpointReached {
        run_id: String,
        area_id: String,
        label: String,
        index: usize,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: String,
        area_id: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    RunFailed {
        run_id: String,
        area_id: String,
        stage: RunState,
        error_kind: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RunCancelled {
        run_id: String,
        area_id: String,
        stage: RunState,
        timestamp: DateTime<Utc>,
    },
    RunReset {
        run_id: String,
        area_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn area_id(&self) -> &str {
        match self {
            RunEvent::RunStarted { area_id, .. } => area_id,
            RunEvent::StageEntered { area_id, .. } => area_id,
            RunEvent::CheckpointReached { area_id, .. } => area_id,
            RunEvent::RunCompleted { area_id, .. } => area_id,
            RunEvent::RunFailed { area_id, .. } => area_id,
            RunEvent::RunCancelled { area_id, .. } => area_id,
            RunEvent::RunReset { area_id, .. } => area_id,
        }
    }
}

impl DomainEvent for RunEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "RunStarted",
            RunEvent::StageEntered { .. } => "StageEntered",
            RunEvent::CheckpointReached { .. } => "CheckpointReached",
            RunEvent::RunCompleted { .. } => "RunCompleted",
            RunEvent::RunFailed { .. } => "RunFailed",
            RunEvent::RunCancelled { .. } => "RunCancelled",
            RunEvent::RunReset { .. } => "RunReset",
        }
    }

    fn aggregate_id(&self) -> &str {
        match self {
            RunEvent::RunStarted { run_id, .. } => run_id,
            RunEvent::StageEntered { run_id, .. } => run_id,
            RunEvent::CheckpointReached { run_id, .. } => run_id,
            RunEvent::RunCompleted { run_id, .. } => run_id,
            RunEvent::RunFailed { run_id, .. } => run_id,
            RunEvent::RunCancelled { run_id, .. } => run_id,
            RunEvent::RunReset { run_id, .. } => run_id,
        }
    }

    fn event_version(&self) -> u64 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RunEvent::RunStarted { timestamp, .. } => *timestamp,
            RunEvent::StageEntered { timestamp, .. } => *timestamp,
            RunEvent::CheckpointReached { timestamp, .. } => *timestamp,
            RunEvent::RunCompleted { timestamp, .. } => *timestamp,
            RunEvent::RunFailed { timestamp, .. } => *timestamp,
            RunEvent::RunCancelled { timestamp, .. } => *timestamp,
            RunEvent::RunReset { timestamp, .. } => *timestamp,
        }
    }
}
