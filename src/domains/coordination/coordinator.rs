use super::commands::{self, CommandSender, CoordinatorCommand};
use super::projections::RunStatistics;
use crate::common::{DomainEvent, EventEnvelope, EventMetadata, RunJournal};
use crate::domains::logger::DynLogger;
use crate::domains::traversal::{AreaDefinition, AreaRun, PathNavigator, RunEvent, RunState, StopSignal};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// Area ids eligible for selection, in round-robin order.
    pub selection: Vec<String>,
    /// Minimum time between a completed run and the next run of that area.
    pub cooldown_ms: u64,
    /// Bench an area after this many failures in a row. 0 disables benching.
    pub max_consecutive_failures: u32,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            selection: Vec::new(),
            cooldown_ms: 0,
            max_consecutive_failures: 5,
        }
    }
}

/// What a single `tick` did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Halted,
    Maintenance { succeeded: bool },
    /// Nothing eligible to run right now.
    Idle,
    Advanced { area_id: String, state: RunState },
    /// A collaborator panicked outside any stage; the active run was reset.
    Recovered { reason: String },
}

/// Owns the active run and decides what the control loop does each tick.
pub struct RunCoordinator {
    navigator: PathNavigator,
    areas: HashMap<String, Arc<AreaDefinition>>,
    settings: CoordinatorSettings,
    next_index: usize,
    active: Option<AreaRun>,
    completions: HashMap<String, DateTime<Utc>>,
    benched: HashSet<String>,
    halted: bool,
    stop_signal: StopSignal,
    command_sender: CommandSender,
    commands: mpsc::UnboundedReceiver<CoordinatorCommand>,
    statistics: RunStatistics,
    logger: DynLogger,
    journal: Option<Arc<dyn RunJournal>>,
}

impl RunCoordinator {
    pub fn new(
        navigator: PathNavigator,
        areas: Vec<AreaDefinition>,
        settings: CoordinatorSettings,
        logger: DynLogger,
    ) -> Self {
        let (command_sender, commands) = commands::command_channel();
        let areas = areas
            .into_iter()
            .map(|area| (area.id.clone(), Arc::new(area)))
            .collect();
        Self {
            navigator,
            areas,
            settings,
            next_index: 0,
            active: None,
            completions: HashMap::new(),
            benched: HashSet::new(),
            halted: false,
            stop_signal: command_sender.stop_signal(),
            command_sender,
            commands,
            statistics: RunStatistics::new(),
            logger,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn RunJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn command_sender(&self) -> CommandSender {
        self.command_sender.clone()
    }

    pub fn active_run(&self) -> Option<&AreaRun> {
        self.active.as_ref()
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    pub fn selection(&self) -> &[String] {
        &self.settings.selection
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_benched(&self, area_id: &str) -> bool {
        self.benched.contains(area_id)
    }

    /// Halt the loop; the active run resets to `Idle` on its next tick.
    pub fn stop(&mut self) {
        self.halted = true;
        self.stop_signal.raise();
        if let Some(run) = self.active.as_mut() {
            run.stop();
        }
        self.logger.info("Coordinator stopped");
    }

    /// Resume after `stop` and give benched areas another chance.
    pub fn resume(&mut self) {
        self.halted = false;
        self.stop_signal.clear();
        self.benched.clear();
        self.logger.info("Coordinator resumed");
    }

    pub fn select_areas(&mut self, area_ids: Vec<String>) {
        for id in &area_ids {
            if !self.areas.contains_key(id) {
                self.logger.warn(&format!("Selected area '{}' is not in the catalog", id));
            }
        }
        self.settings.selection = area_ids;
        self.next_index = 0;
    }

    /// One turn of the control loop. Never panics and never returns an error.
    pub fn tick(&mut self) -> TickOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.tick_inner())) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "collaborator panicked".to_string());
                self.logger.error(&format!("Recovered from panic during tick: {}", reason));
                if let Some(run) = self.active.as_mut() {
                    run.reset();
                }
                self.flush_events();
                TickOutcome::Recovered { reason }
            }
        }
    }

    fn tick_inner(&mut self) -> TickOutcome {
        for command in commands::drain(&mut self.commands) {
            match command {
                CoordinatorCommand::SelectAreas(ids) => self.select_areas(ids),
                CoordinatorCommand::Stop => self.stop(),
                CoordinatorCommand::Resume => self.resume(),
            }
        }

        if self.halted {
            if let Some(run) = self.active.as_mut() {
                if run.is_stopped() {
                    run.tick(&self.navigator);
                }
            }
            self.flush_events();
            return TickOutcome::Halted;
        }

        let supervisor = self.navigator.collaborators().supervisor.clone();

        // Externally paused: let an in-flight run unwind, start nothing new and
        // leave maintenance for later.
        let paused = !supervisor.is_run_active();
        let in_flight = self.active.as_ref().map(|r| r.state().is_active()).unwrap_or(false);
        if paused && !in_flight {
            return TickOutcome::Idle;
        }

        if !paused && supervisor.is_capacity_exhausted() {
            return self.run_maintenance();
        }

        if self.needs_selection() {
            match self.select_next() {
                Some(area) => {
                    self.logger.info(&format!("Starting run for {}", area.display_name()));
                    let clock = self.navigator.collaborators().clock.clone();
                    self.active = Some(AreaRun::new(area, clock).with_stop_signal(self.stop_signal.clone()));
                }
                None => {
                    if self.active.as_ref().map(|r| r.state() == RunState::Completed).unwrap_or(false) {
                        self.active = None;
                    }
                    return TickOutcome::Idle;
                }
            }
        }

        let Some(run) = self.active.as_mut() else {
            return TickOutcome::Idle;
        };
        let area_id = run.area().id.clone();
        let state = run.tick(&self.navigator);

        match state {
            RunState::Completed => {
                if let Some(at) = run.completed_at() {
                    self.completions.insert(area_id.clone(), at);
                }
                self.flush_events();
            }
            RunState::Failed => {
                let reason = run
                    .last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown failure".to_string());
                run.reset();
                self.flush_events();
                self.logger.error(&format!("Run in {} failed: {}", area_id, reason));
                self.bench_if_failing(&area_id);
            }
            _ => self.flush_events(),
        }

        TickOutcome::Advanced { area_id, state }
    }

    fn run_maintenance(&mut self) -> TickOutcome {
        if let Some(run) = self.active.as_mut() {
            if run.state() != RunState::Idle {
                self.logger
                    .info(&format!("Capacity exhausted, abandoning {} run in stage {}", run.area().id, run.state()));
                run.reset();
            }
        }
        self.flush_events();

        let succeeded = self.navigator.collaborators().supervisor.perform_maintenance();
        if succeeded {
            self.logger.info("Maintenance routine finished");
        } else {
            self.logger.warn("Maintenance routine failed");
        }
        TickOutcome::Maintenance { succeeded }
    }

    fn needs_selection(&self) -> bool {
        match &self.active {
            None => true,
            Some(run) => match run.state() {
                RunState::Completed => true,
                RunState::Idle => !self.settings.selection.contains(&run.area().id) || self.is_benched(&run.area().id),
                _ => false,
            },
        }
    }

    fn is_eligible(&self, area_id: &str, now: DateTime<Utc>) -> bool {
        if !self.areas.contains_key(area_id) || self.benched.contains(area_id) {
            return false;
        }
        match self.completions.get(area_id) {
            Some(completed) => {
                let cooldown = ChronoDuration::milliseconds(self.settings.cooldown_ms as i64);
                now.signed_duration_since(*completed) >= cooldown
            }
            None => true,
        }
    }

    fn select_next(&mut self) -> Option<Arc<AreaDefinition>> {
        let len = self.settings.selection.len();
        if len == 0 {
            return None;
        }
        let now = self.navigator.collaborators().clock.now();
        for offset in 0..len {
            let index = (self.next_index + offset) % len;
            let id = &self.settings.selection[index];
            if self.is_eligible(id, now) {
                self.next_index = (index + 1) % len;
                return self.areas.get(id).cloned();
            }
        }
        None
    }

    fn bench_if_failing(&mut self, area_id: &str) {
        let limit = self.settings.max_consecutive_failures;
        if limit == 0 {
            return;
        }
        let failures = self
            .statistics
            .area(area_id)
            .map(|s| s.consecutive_failures)
            .unwrap_or(0);
        if failures >= limit {
            self.benched.insert(area_id.to_string());
            self.logger.warn(&format!(
                "Benching {} after {} consecutive failures",
                area_id, failures
            ));
        }
    }

    fn flush_events(&mut self) {
        let Some(run) = self.active.as_mut() else {
            return;
        };
        let events = run.take_events();
        if events.is_empty() {
            return;
        }

        for event in &events {
            self.statistics.apply_event(event);
            self.log_event(event);
        }

        if let Some(journal) = &self.journal {
            let correlation_id = Some(Uuid::new_v4());
            let envelopes: Result<Vec<EventEnvelope>, _> = events
                .iter()
                .map(|event| {
                    let metadata = EventMetadata {
                        correlation_id,
                        causation_id: None,
                        source: "RunCoordinator".to_string(),
                    };
                    EventEnvelope::new(event, "AreaRun", metadata)
                })
                .collect();
            let appended = envelopes
                .map_err(|e| format!("Failed to create event envelope: {}", e))
                .and_then(|envelopes| journal.append(&envelopes));
            if let Err(e) = appended {
                self.logger.warn(&format!("Run journal unavailable: {}", e));
            }
        }
    }

    fn log_event(&self, event: &RunEvent) {
        match event {
            RunEvent::StageEntered { area_id, from, to, .. } => {
                self.logger.info(&format!("[{}] {} -> {}", area_id, from, to));
            }
            RunEvent::CheckpointReached { area_id, label, index, .. } => {
                self.logger.info(&format!("[{}] reached checkpoint {} '{}'", area_id, index, label));
            }
            RunEvent::RunCompleted { area_id, duration_ms, .. } => {
                self.logger.info(&format!("[{}] run completed in {} ms", area_id, duration_ms));
            }
            RunEvent::RunFailed { area_id, stage, error_kind, .. } => {
                self.logger.warn(&format!("[{}] {} during {}", area_id, error_kind, stage));
            }
            RunEvent::RunCancelled { area_id, stage, .. } => {
                self.logger.info(&format!("[{}] run cancelled during {}", area_id, stage));
            }
            other => tracing::debug!(event = other.event_type(), run = other.aggregate_id(), "run event"),
        }
    }
}
