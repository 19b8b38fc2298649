use super::requirement::{DistanceReference, PositionMatch, Requirement, RequirementKind};
use crate::domains::obstacle_tracking::{Coordinate, Direction, ObstacleRegistry};

/// Outcome of checking one checkpoint's requirement set.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementReport {
    pub total: usize,
    pub failing: Vec<String>,
}

impl RequirementReport {
    pub fn passed(&self) -> bool {
        self.failing.is_empty()
    }
}

/// Stateless evaluation of requirements against the current registry.
///
/// Unknown state fails closed everywhere except `AvoidPositions`, where an
/// obstacle that cannot be seen cannot be shown to sit on an avoided tile.
pub struct RequirementEvaluator;

impl RequirementEvaluator {
    pub fn evaluate(
        requirement: &Requirement,
        registry: &ObstacleRegistry,
        agent_position: Option<Coordinate>,
    ) -> bool {
        let id = requirement.obstacle;
        let position = registry.position(id);

        match &requirement.kind {
            RequirementKind::ExactPosition { target, direction, tolerance } => {
                Self::matches_position(registry, requirement, position, target, *direction, *tolerance)
            }
            RequirementKind::MultiplePositions { positions, tolerance } => {
                positions.iter().any(|PositionMatch { position: target, direction }| {
                    Self::matches_position(registry, requirement, position, target, *direction, *tolerance)
                })
            }
            RequirementKind::AvoidPositions { positions, tolerance } => match position {
                Some(current) => positions.iter().all(|avoid| current.distance_to(avoid) > *tolerance),
                None => true,
            },
            RequirementKind::MinDistance { reference, min_distance } => {
                let reference = match reference {
                    DistanceReference::Fixed(c) => Some(*c),
                    DistanceReference::Agent => agent_position,
                };
                match (position, reference) {
                    (Some(current), Some(reference)) => current.distance_to(&reference) >= *min_distance,
                    _ => false,
                }
            }
            RequirementKind::MovingDirection { direction, negate } => match registry.movement(id) {
                Some(vector) => vector.matches(*direction) != *negate,
                None => false,
            },
        }
    }

    /// Evaluate every requirement, without short-circuiting, and collect the
    /// ones that did not hold.
    pub fn evaluate_all(
        requirements: &[Requirement],
        registry: &ObstacleRegistry,
        agent_position: Option<Coordinate>,
    ) -> RequirementReport {
        let failing = requirements
            .iter()
            .filter(|r| !Self::evaluate(r, registry, agent_position))
            .map(|r| r.to_string())
            .collect();
        RequirementReport {
            total: requirements.len(),
            failing,
        }
    }

    fn matches_position(
        registry: &ObstacleRegistry,
        requirement: &Requirement,
        position: Option<Coordinate>,
        target: &Coordinate,
        direction: Option<Direction>,
        tolerance: f64,
    ) -> bool {
        let Some(current) = position else {
            return false;
        };
        if !current.is_within(target, tolerance) {
            return false;
        }
        match direction {
            Some(required) => registry
                .movement(requirement.obstacle)
                .map(|vector| vector.matches(required))
                .unwrap_or(false),
            None => true,
        }
    }
}
