use crate::domains::obstacle_tracking::{Coordinate, ObstacleId};
use crate::domains::traversal::{
    ActionError, AgentControl, AreaBounds, Clock, ObstacleSensor, RunSupervisor, StageActionPort,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Upper bound on game ticks replayed in one catch-up, so a long idle gap
/// cannot stall the caller.
const MAX_CATCH_UP_TICKS: i64 = 10_000;

/// What a scripted stage action does to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimAction {
    /// Place the agent at `to` immediately.
    Teleport { to: Coordinate },
    /// Fill `load` units of capacity and start walking to `exit`.
    Collect { exit: Coordinate, load: u32 },
    /// The action is attempted but reports failure.
    Refuse,
    /// The action cannot be attempted at all.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatrolRoute {
    pub obstacle: ObstacleId,
    /// Waypoints visited in order, looping back to the first.
    pub route: Vec<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub seed: u64,
    pub game_tick_ms: u64,
    /// Probability that a single obstacle observation comes back empty.
    pub dropout: f64,
    /// Capacity before maintenance is needed. 0 means unlimited.
    pub capacity: u32,
    pub maintenance_ms: u64,
    pub agent_start: Coordinate,
    pub patrols: Vec<PatrolRoute>,
    pub actions: HashMap<String, SimAction>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: 7,
            game_tick_ms: 600,
            dropout: 0.0,
            capacity: 0,
            maintenance_ms: 3_000,
            agent_start: Coordinate::new(0.0, 0.0),
            patrols: Vec::new(),
            actions: HashMap::new(),
        }
    }
}

struct Patrol {
    route: Vec<Coordinate>,
    next: usize,
    position: Coordinate,
}

impl Patrol {
    fn step(&mut self) {
        let Some(waypoint) = self.route.get(self.next).copied() else {
            return;
        };
        self.position = self.position.step_toward(&waypoint);
        if self.position == waypoint {
            self.next = (self.next + 1) % self.route.len();
        }
    }
}

struct WorldState {
    last_update: DateTime<Utc>,
    agent: Coordinate,
    destination: Option<Coordinate>,
    patrols: BTreeMap<ObstacleId, Patrol>,
    load: u32,
    maintenance_runs: u32,
    performed: Vec<String>,
}

impl WorldState {
    fn step(&mut self) {
        for patrol in self.patrols.values_mut() {
            patrol.step();
        }
        if let Some(destination) = self.destination {
            self.agent = self.agent.step_toward(&destination);
            if self.agent == destination {
                self.destination = None;
            }
        }
    }
}

/// A patrolled area in miniature. Obstacles walk their routes and the agent
/// walks toward its destination, each one tile per game tick, on whatever
/// clock the world is given.
pub struct SimulatedWorld {
    settings: SimulationSettings,
    clock: Arc<dyn Clock>,
    state: Mutex<WorldState>,
    rng: Mutex<StdRng>,
    run_active: AtomicBool,
}

impl SimulatedWorld {
    pub fn new(settings: SimulationSettings, clock: Arc<dyn Clock>) -> Self {
        let patrols = settings
            .patrols
            .iter()
            .filter_map(|p| {
                let first = *p.route.first()?;
                Some((
                    p.obstacle,
                    Patrol {
                        route: p.route.clone(),
                        next: 1 % p.route.len(),
                        position: first,
                    },
                ))
            })
            .collect();

        let state = WorldState {
            last_update: clock.now(),
            agent: settings.agent_start,
            destination: None,
            patrols,
            load: 0,
            maintenance_runs: 0,
            performed: Vec::new(),
        };

        Self {
            rng: Mutex::new(StdRng::seed_from_u64(settings.seed)),
            settings,
            clock,
            state: Mutex::new(state),
            run_active: AtomicBool::new(true),
        }
    }

    pub fn set_run_active(&self, active: bool) {
        self.run_active.store(active, Ordering::SeqCst);
    }

    pub fn agent_position(&self) -> Coordinate {
        self.synced().agent
    }

    /// Place the agent without walking, cancelling any destination.
    pub fn place_agent(&self, position: Coordinate) {
        let mut state = self.synced();
        state.agent = position;
        state.destination = None;
    }

    pub fn load(&self) -> u32 {
        self.synced().load
    }

    pub fn maintenance_runs(&self) -> u32 {
        self.synced().maintenance_runs
    }

    /// Action ids performed so far, in order.
    pub fn performed_actions(&self) -> Vec<String> {
        self.synced().performed.clone()
    }

    /// Replay the game ticks that have elapsed since the last query.
    fn synced(&self) -> MutexGuard<'_, WorldState> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let tick_ms = self.settings.game_tick_ms.max(1) as i64;
        let now = self.clock.now();
        let elapsed = now.signed_duration_since(state.last_update).num_milliseconds();
        let ticks = elapsed / tick_ms;
        if ticks > 0 {
            for _ in 0..ticks.min(MAX_CATCH_UP_TICKS) {
                state.step();
            }
            state.last_update += chrono::Duration::milliseconds(ticks * tick_ms);
        }
        state
    }

    fn observation_dropped(&self) -> bool {
        if self.settings.dropout <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_bool(self.settings.dropout.min(1.0))
    }
}

impl ObstacleSensor for SimulatedWorld {
    fn obstacle_position(&self, id: ObstacleId) -> Option<Coordinate> {
        let position = self.synced().patrols.get(&id).map(|p| p.position)?;
        if self.observation_dropped() {
            tracing::trace!(obstacle = %id, "observation dropped");
            return None;
        }
        Some(position)
    }
}

impl AgentControl for SimulatedWorld {
    fn position(&self) -> Option<Coordinate> {
        Some(self.synced().agent)
    }

    fn is_animating(&self) -> bool {
        self.synced().destination.is_some()
    }

    fn move_to(&self, target: Coordinate) {
        let mut state = self.synced();
        state.destination = if state.agent == target { None } else { Some(target) };
    }

    fn is_contained_in(&self, bounds: &AreaBounds) -> bool {
        bounds.contains(&self.synced().agent)
    }
}

impl StageActionPort for SimulatedWorld {
    fn perform(&self, action_id: &str) -> Result<bool, ActionError> {
        let action = self
            .settings
            .actions
            .get(action_id)
            .ok_or_else(|| ActionError(format!("no scripted action '{}'", action_id)))?;

        let mut state = self.synced();
        state.performed.push(action_id.to_string());
        match action {
            SimAction::Teleport { to } => {
                state.agent = *to;
                state.destination = None;
                Ok(true)
            }
            SimAction::Collect { exit, load } => {
                state.load = state.load.saturating_add(*load);
                state.destination = Some(*exit);
                Ok(true)
            }
            SimAction::Refuse => Ok(false),
            SimAction::Unavailable { reason } => Err(ActionError(reason.clone())),
        }
    }
}

impl RunSupervisor for SimulatedWorld {
    fn is_run_active(&self) -> bool {
        self.run_active.load(Ordering::SeqCst)
    }

    fn is_capacity_exhausted(&self) -> bool {
        self.settings.capacity > 0 && self.synced().load >= self.settings.capacity
    }

    fn perform_maintenance(&self) -> bool {
        self.clock.sleep(Duration::from_millis(self.settings.maintenance_ms));
        let mut state = self.synced();
        state.load = 0;
        state.maintenance_runs += 1;
        true
    }
}

impl Clock for SimulatedWorld {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::ManualClock;

    fn world(settings: SimulationSettings) -> (Arc<ManualClock>, SimulatedWorld) {
        let clock = Arc::new(ManualClock::default());
        let world = SimulatedWorld::new(settings, clock.clone());
        (clock, world)
    }

    #[test]
    fn test_patrol_moves_one_tile_per_game_tick() {
        let settings = SimulationSettings {
            patrols: vec![PatrolRoute {
                obstacle: ObstacleId(1),
                route: vec![Coordinate::new(0.0, 0.0), Coordinate::new(3.0, 0.0)],
            }],
            ..Default::default()
        };
        let (clock, world) = world(settings);

        assert_eq!(world.obstacle_position(ObstacleId(1)), Some(Coordinate::new(0.0, 0.0)));
        clock.advance(Duration::from_millis(599));
        assert_eq!(world.obstacle_position(ObstacleId(1)), Some(Coordinate::new(0.0, 0.0)));
        clock.advance(Duration::from_millis(1));
        assert_eq!(world.obstacle_position(ObstacleId(1)), Some(Coordinate::new(1.0, 0.0)));
        clock.advance(Duration::from_millis(1_800));
        // Four ticks in total: 0 -> 3 takes three, then one step back.
        assert_eq!(world.obstacle_position(ObstacleId(1)), Some(Coordinate::new(2.0, 0.0)));
        assert_eq!(world.obstacle_position(ObstacleId(2)), None);
    }

    #[test]
    fn test_agent_walks_and_stops_animating() {
        let (clock, world) = world(SimulationSettings::default());
        world.move_to(Coordinate::new(2.0, 1.0));
        assert!(world.is_animating());

        clock.advance(Duration::from_millis(1_200));
        assert_eq!(world.position(), Some(Coordinate::new(2.0, 1.0)));
        assert!(!world.is_animating());
    }

    #[test]
    fn test_actions_and_capacity() {
        let mut actions = HashMap::new();
        actions.insert(
            "collect".to_string(),
            SimAction::Collect { exit: Coordinate::new(0.0, 5.0), load: 10 },
        );
        actions.insert("refuse".to_string(), SimAction::Refuse);
        let settings = SimulationSettings {
            capacity: 10,
            actions,
            ..Default::default()
        };
        let (clock, world) = world(settings);

        assert_eq!(world.perform("refuse"), Ok(false));
        assert!(world.perform("missing").is_err());
        assert_eq!(world.perform("collect"), Ok(true));
        assert!(world.is_capacity_exhausted());

        let before = clock.elapsed();
        assert!(world.perform_maintenance());
        assert_eq!(clock.elapsed() - before, Duration::from_millis(3_000));
        assert!(!world.is_capacity_exhausted());
        assert_eq!(world.maintenance_runs(), 1);
        assert_eq!(world.performed_actions(), vec!["refuse", "collect"]);
    }

    #[test]
    fn test_full_dropout_hides_every_obstacle() {
        let settings = SimulationSettings {
            dropout: 1.0,
            patrols: vec![PatrolRoute {
                obstacle: ObstacleId(1),
                route: vec![Coordinate::new(0.0, 0.0)],
            }],
            ..Default::default()
        };
        let (_clock, world) = world(settings);
        assert_eq!(world.obstacle_position(ObstacleId(1)), None);
    }
}
