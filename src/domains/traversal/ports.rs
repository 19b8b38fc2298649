use super::area::{AreaBounds, AreaDefinition};
use crate::common::DomainResult;
use crate::domains::obstacle_tracking::{Coordinate, ObstacleId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Port the traversal domain uses to observe hazards.
pub trait ObstacleSensor: Send + Sync {
    /// Latest observed coordinate, `None` when not currently observable.
    fn obstacle_position(&self, id: ObstacleId) -> Option<Coordinate>;
}

/// Port onto the controlled agent. Movement is fire-and-forget; arrival is
/// observed through `position`.
pub trait AgentControl: Send + Sync {
    fn position(&self) -> Option<Coordinate>;
    fn is_animating(&self) -> bool;
    fn move_to(&self, target: Coordinate);
    fn is_contained_in(&self, bounds: &AreaBounds) -> bool;
}

/// Raised by a stage action that could not even be attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionError(pub String);

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single external interaction ("open gate", "harvest", "teleport home").
pub trait StageActionPort: Send + Sync {
    fn perform(&self, action_id: &str) -> Result<bool, ActionError>;
}

/// External run control and the carrying-capacity signal.
pub trait RunSupervisor: Send + Sync {
    fn is_run_active(&self) -> bool;
    fn is_capacity_exhausted(&self) -> bool;
    /// Travel to a depot, unload and come back. Returns success.
    fn perform_maintenance(&self) -> bool;
}

/// Port for loading area definitions (waypoint and requirement tables).
pub trait AreaSource: Send + Sync {
    fn list_areas(&self) -> DomainResult<Vec<String>>;
    fn load_area(&self, id: &str) -> DomainResult<AreaDefinition>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time with a blocking thread sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Every external collaborator the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub sensor: Arc<dyn ObstacleSensor>,
    pub agent: Arc<dyn AgentControl>,
    pub actions: Arc<dyn StageActionPort>,
    pub supervisor: Arc<dyn RunSupervisor>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Wire all ports to one object implementing every trait, as a simulator
    /// or a single client binding does.
    pub fn from_world<W>(world: Arc<W>) -> Self
    where
        W: ObstacleSensor + AgentControl + StageActionPort + RunSupervisor + Clock + 'static,
    {
        Self {
            sensor: world.clone(),
            agent: world.clone(),
            actions: world.clone(),
            supervisor: world.clone(),
            clock: world,
        }
    }
}
