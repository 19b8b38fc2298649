use super::types::{Coordinate, MovementVector, ObstacleId};
use crate::domains::traversal::ports::ObstacleSensor;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub current: Option<Coordinate>,
    pub previous: Option<Coordinate>,
    pub last_sample: Option<DateTime<Utc>>,
}

impl Obstacle {
    pub fn new(id: ObstacleId) -> Self {
        Self {
            id,
            current: None,
            previous: None,
            last_sample: None,
        }
    }

    /// Defined only once two known positions are on record.
    pub fn movement(&self) -> Option<MovementVector> {
        match (&self.previous, &self.current) {
            (Some(previous), Some(current)) => Some(MovementVector::between(previous, current)),
            _ => None,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.last_sample {
            Some(at) => now.signed_duration_since(at) <= to_chrono(window),
            None => false,
        }
    }

    fn observe(&mut self, position: Option<Coordinate>, now: DateTime<Utc>) {
        match position {
            Some(observed) => {
                // Sampling twice at one instant is a single observation.
                if self.last_sample == Some(now) && self.current == Some(observed) {
                    return;
                }
                self.previous = self.current;
                self.current = Some(observed);
                self.last_sample = Some(now);
            }
            None => {
                self.previous = self.current.take();
            }
        }
    }
}

/// Tracked obstacles of one area run and their last two observed positions.
///
/// The set of registered ids is the run's interest set and survives purges;
/// only the per-obstacle samples are dropped when they go stale, and they are
/// recreated on the next successful observation.
#[derive(Debug, Clone, Default)]
pub struct ObstacleRegistry {
    tracked: BTreeSet<ObstacleId>,
    obstacles: BTreeMap<ObstacleId, Obstacle>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_obstacles<I: IntoIterator<Item = ObstacleId>>(ids: I) -> Self {
        let mut registry = Self::new();
        for id in ids {
            registry.register(id);
        }
        registry
    }

    pub fn register(&mut self, id: ObstacleId) {
        self.tracked.insert(id);
        self.obstacles.entry(id).or_insert_with(|| Obstacle::new(id));
    }

    pub fn tracked_ids(&self) -> impl Iterator<Item = &ObstacleId> {
        self.tracked.iter()
    }

    /// Refresh every tracked obstacle from the sensor. Never fails: an
    /// unobservable obstacle just loses its current position.
    pub fn sample(&mut self, sensor: &dyn ObstacleSensor, now: DateTime<Utc>) {
        for id in &self.tracked {
            let observed = sensor.obstacle_position(*id);
            match self.obstacles.get_mut(id) {
                Some(obstacle) => obstacle.observe(observed, now),
                None => {
                    if observed.is_some() {
                        let mut obstacle = Obstacle::new(*id);
                        obstacle.observe(observed, now);
                        self.obstacles.insert(*id, obstacle);
                    }
                }
            }
        }
        tracing::trace!(
            tracked = self.tracked.len(),
            known = self.obstacles.values().filter(|o| o.current.is_some()).count(),
            "sampled obstacles"
        );
    }

    /// Drop samples older than `window`. Returns the ids removed.
    pub fn purge_stale(&mut self, now: DateTime<Utc>, window: Duration) -> Vec<ObstacleId> {
        let stale: Vec<ObstacleId> = self
            .obstacles
            .values()
            .filter(|o| !o.is_active(now, window))
            .map(|o| o.id)
            .collect();
        for id in &stale {
            self.obstacles.remove(id);
        }
        stale
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    pub fn position(&self, id: ObstacleId) -> Option<Coordinate> {
        self.get(id).and_then(|o| o.current)
    }

    pub fn movement(&self, id: ObstacleId) -> Option<MovementVector> {
        self.get(id).and_then(Obstacle::movement)
    }

    pub fn is_active(&self, id: ObstacleId, now: DateTime<Utc>, window: Duration) -> bool {
        self.get(id).map(|o| o.is_active(now, window)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Forget all samples; registered ids start over with unknown positions.
    pub fn clear(&mut self) {
        self.obstacles.clear();
        for id in &self.tracked {
            self.obstacles.insert(*id, Obstacle::new(*id));
        }
    }
}

fn to_chrono(window: Duration) -> ChronoDuration {
    ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::weeks(52 * 100))
}
