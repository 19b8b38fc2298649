// Traversal Service - wires catalog, collaborators and journal into a coordinator
use crate::adapters::inbound::FileRunJournal;
use crate::common::{ApplicationResult, DomainError};
use crate::config::Config;
use crate::domains::coordination::{CommandSender, RunCoordinator, RunStatistics, TickOutcome};
use crate::domains::logger::DynLogger;
use crate::domains::traversal::{AreaDefinition, AreaSource, Collaborators, PathNavigator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct TraversalService {
    coordinator: RunCoordinator,
    collaborators: Collaborators,
    idle_pause: std::time::Duration,
    logger: DynLogger,
}

impl TraversalService {
    pub fn new(coordinator: RunCoordinator, collaborators: Collaborators, config: &Config, logger: DynLogger) -> Self {
        Self {
            coordinator,
            collaborators,
            idle_pause: config.engine.poll_interval(),
            logger,
        }
    }

    /// Load the configured areas (or every area the source lists when the
    /// selection is empty) and build a coordinator over them. Areas that
    /// fail to load are logged and left out of the selection.
    pub fn from_config(
        config: &Config,
        source: &dyn AreaSource,
        collaborators: Collaborators,
        logger: DynLogger,
    ) -> ApplicationResult<Self> {
        let requested = if config.coordinator.selection.is_empty() {
            source.list_areas()?
        } else {
            config.coordinator.selection.clone()
        };

        let mut areas: Vec<AreaDefinition> = Vec::new();
        for id in &requested {
            match source.load_area(id) {
                Ok(area) => areas.push(area),
                Err(e) => logger.error(&format!("Skipping area {}: {}", id, e)),
            }
        }
        if areas.is_empty() {
            return Err(DomainError::InvalidCommand {
                reason: "no loadable areas selected".to_string(),
            }
            .into());
        }

        let mut settings = config.coordinator.clone();
        settings.selection = areas.iter().map(|a| a.id.clone()).collect();

        let navigator = PathNavigator::new(collaborators.clone(), config.engine.clone());
        let mut coordinator = RunCoordinator::new(navigator, areas, settings, logger.clone());
        if let Some(directory) = &config.journal.directory {
            coordinator = coordinator.with_journal(Arc::new(FileRunJournal::new(directory.clone())));
        }

        logger.info(&format!("Loaded {} area(s): {:?}", coordinator.selection().len(), coordinator.selection()));
        Ok(Self::new(coordinator, collaborators, config, logger))
    }

    pub fn command_sender(&self) -> CommandSender {
        self.coordinator.command_sender()
    }

    pub fn coordinator(&self) -> &RunCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut RunCoordinator {
        &mut self.coordinator
    }

    pub fn statistics(&self) -> &RunStatistics {
        self.coordinator.statistics()
    }

    /// One tick; pauses for a poll interval when there was nothing to do so an
    /// idle loop does not spin.
    pub fn step(&mut self) -> TickOutcome {
        let outcome = self.coordinator.tick();
        if matches!(outcome, TickOutcome::Idle | TickOutcome::Halted) {
            self.collaborators.clock.sleep(self.idle_pause);
        }
        outcome
    }

    /// Tick until `shutdown` is raised, then stop the coordinator and let the
    /// active run unwind. Returns the number of ticks taken.
    pub fn run_until(&mut self, shutdown: &AtomicBool) -> u64 {
        let mut ticks = 0;
        while !shutdown.load(Ordering::SeqCst) {
            self.step();
            ticks += 1;
        }
        self.shutdown();
        ticks
    }

    pub fn shutdown(&mut self) {
        self.coordinator.stop();
        self.coordinator.tick();
        let stats = self.coordinator.statistics();
        self.logger.info(&format!(
            "Shut down after {} completed and {} failed run(s)",
            stats.total_completed(),
            stats.total_failed()
        ));
    }
}
