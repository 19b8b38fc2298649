#![allow(dead_code)]

use guarded_traversal::adapters::outbound::ManualClock;
use guarded_traversal::domains::coordination::CommandSender;
use guarded_traversal::domains::obstacle_tracking::{Coordinate, ObstacleId};
use guarded_traversal::domains::traversal::{
    ActionError, AgentControl, AreaBounds, AreaDefinition, Checkpoint, Clock, Collaborators, EngineSettings,
    ObstacleSensor, PathNavigator, RunSupervisor, StageActionPort, StageScript,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ActionScript {
    Succeed,
    Refuse,
    Unavailable,
    Panic,
    TeleportTo(Coordinate),
}

#[derive(Default)]
struct ScriptState {
    agent: Option<Coordinate>,
    walks: bool,
    forced_outside: bool,
    timelines: HashMap<ObstacleId, Vec<(u64, Option<Coordinate>)>>,
    moves: Vec<Coordinate>,
    actions: HashMap<String, ActionScript>,
    performed: Vec<String>,
    run_inactive: bool,
    capacity_exhausted: bool,
    supervisor_panics: bool,
    maintenance_calls: u32,
    queued_stop: Option<(Duration, CommandSender)>,
}

/// Fully scripted collaborators on a manual clock. Obstacles follow
/// timelines keyed by elapsed milliseconds; the agent arrives instantly
/// unless `freeze_agent` was called.
pub struct ScriptedWorld {
    pub clock: Arc<ManualClock>,
    bounds: AreaBounds,
    state: Mutex<ScriptState>,
}

impl ScriptedWorld {
    pub fn new(bounds: AreaBounds, agent: Coordinate) -> Arc<Self> {
        Arc::new(Self {
            clock: Arc::new(ManualClock::default()),
            bounds,
            state: Mutex::new(ScriptState {
                agent: Some(agent),
                walks: true,
                ..Default::default()
            }),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap()
    }

    pub fn place_obstacle(&self, id: u32, position: Coordinate) {
        self.state().timelines.insert(ObstacleId(id), vec![(0, Some(position))]);
    }

    /// Positions from the given elapsed millisecond onward.
    pub fn script_obstacle(&self, id: u32, timeline: Vec<(u64, Option<Coordinate>)>) {
        self.state().timelines.insert(ObstacleId(id), timeline);
    }

    pub fn script_action(&self, action: &str, script: ActionScript) {
        self.state().actions.insert(action.to_string(), script);
    }

    pub fn freeze_agent(&self) {
        self.state().walks = false;
    }

    pub fn force_outside(&self, outside: bool) {
        self.state().forced_outside = outside;
    }

    pub fn set_agent(&self, position: Coordinate) {
        self.state().agent = Some(position);
    }

    pub fn set_run_inactive(&self, inactive: bool) {
        self.state().run_inactive = inactive;
    }

    pub fn set_capacity_exhausted(&self, exhausted: bool) {
        self.state().capacity_exhausted = exhausted;
    }

    pub fn set_supervisor_panics(&self, panics: bool) {
        self.state().supervisor_panics = panics;
    }

    /// Queue a stop through `sender` from the first supervisor poll at or
    /// after `at`, the way another thread would.
    pub fn queue_stop_at(&self, at: Duration, sender: CommandSender) {
        self.state().queued_stop = Some((at, sender));
    }

    pub fn moves(&self) -> Vec<Coordinate> {
        self.state().moves.clone()
    }

    pub fn performed(&self) -> Vec<String> {
        self.state().performed.clone()
    }

    pub fn maintenance_calls(&self) -> u32 {
        self.state().maintenance_calls
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }
}

impl ObstacleSensor for ScriptedWorld {
    fn obstacle_position(&self, id: ObstacleId) -> Option<Coordinate> {
        let elapsed = self.clock.elapsed().as_millis() as u64;
        let state = self.state();
        let timeline = state.timelines.get(&id)?;
        timeline
            .iter()
            .rev()
            .find(|(from, _)| *from <= elapsed)
            .and_then(|(_, position)| *position)
    }
}

impl AgentControl for ScriptedWorld {
    fn position(&self) -> Option<Coordinate> {
        self.state().agent
    }

    fn is_animating(&self) -> bool {
        false
    }

    fn move_to(&self, target: Coordinate) {
        let mut state = self.state();
        state.moves.push(target);
        if state.walks {
            state.agent = Some(target);
        }
    }

    fn is_contained_in(&self, bounds: &AreaBounds) -> bool {
        let state = self.state();
        !state.forced_outside && state.agent.map(|a| bounds.contains(&a)).unwrap_or(false)
    }
}

impl StageActionPort for ScriptedWorld {
    fn perform(&self, action_id: &str) -> Result<bool, ActionError> {
        let script = {
            let mut state = self.state();
            state.performed.push(action_id.to_string());
            state.actions.get(action_id).cloned().unwrap_or(ActionScript::Succeed)
        };
        match script {
            ActionScript::Succeed => Ok(true),
            ActionScript::Refuse => Ok(false),
            ActionScript::Unavailable => Err(ActionError(format!("{} unavailable", action_id))),
            ActionScript::Panic => panic!("scripted panic in {}", action_id),
            ActionScript::TeleportTo(position) => {
                self.set_agent(position);
                Ok(true)
            }
        }
    }
}

impl RunSupervisor for ScriptedWorld {
    fn is_run_active(&self) -> bool {
        let mut state = self.state();
        let due = matches!(&state.queued_stop, Some((at, _)) if self.clock.elapsed() >= *at);
        if due {
            if let Some((_, sender)) = state.queued_stop.take() {
                sender.stop().unwrap();
            }
        }
        !state.run_inactive
    }

    fn is_capacity_exhausted(&self) -> bool {
        let panics = self.state().supervisor_panics;
        if panics {
            panic!("supervisor unreachable");
        }
        self.state().capacity_exhausted
    }

    fn perform_maintenance(&self) -> bool {
        let mut state = self.state();
        state.maintenance_calls += 1;
        state.capacity_exhausted = false;
        true
    }
}

impl Clock for ScriptedWorld {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }
}

pub fn bounds() -> AreaBounds {
    AreaBounds {
        min_x: 0.0,
        max_x: 20.0,
        min_y: 0.0,
        max_y: 20.0,
    }
}

pub fn outside() -> Coordinate {
    Coordinate::new(30.0, 30.0)
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        poll_interval_ms: 100,
        requirement_timeout_ms: 5_000,
        movement_timeout_ms: 2_000,
        enter_timeout_ms: 2_000,
        act_timeout_ms: 2_000,
        ..EngineSettings::default()
    }
}

pub fn navigator(world: &Arc<ScriptedWorld>) -> PathNavigator {
    PathNavigator::new(Collaborators::from_world(world.clone()), settings())
}

/// Three checkpoints along y = 5 guarded by obstacle 1, which the caller
/// scripts. The act action teleports the agent out of the area.
pub fn area(id: &str, checkpoints: Vec<Checkpoint>) -> AreaDefinition {
    AreaDefinition {
        id: id.to_string(),
        name: String::new(),
        bounds: bounds(),
        start: Coordinate::new(1.0, 5.0),
        stages: StageScript {
            enter: format!("{}:enter", id),
            act: format!("{}:act", id),
            return_home: format!("{}:return", id),
        },
        obstacles: vec![ObstacleId(1)],
        checkpoints: checkpoints.into(),
    }
}

pub fn open_checkpoints() -> Vec<Checkpoint> {
    vec![
        Checkpoint::new("first", Coordinate::new(5.0, 5.0)),
        Checkpoint::new("second", Coordinate::new(10.0, 5.0)),
        Checkpoint::new("third", Coordinate::new(15.0, 5.0)),
    ]
}

/// A world where every stage of `area` succeeds.
pub fn world_for(area: &AreaDefinition) -> Arc<ScriptedWorld> {
    let world = ScriptedWorld::new(area.bounds, outside());
    world.script_action(&area.stages.enter, ActionScript::TeleportTo(area.start));
    world.script_action(&area.stages.act, ActionScript::TeleportTo(outside()));
    world
}
