use crate::domains::obstacle_tracking::{Coordinate, Direction, ObstacleId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point a `MinDistance` requirement measures from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceReference {
    Fixed(Coordinate),
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionMatch {
    pub position: Coordinate,
    #[serde(default)]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequirementKind {
    ExactPosition {
        target: Coordinate,
        #[serde(default)]
        direction: Option<Direction>,
        #[serde(default)]
        tolerance: f64,
    },
    MultiplePositions {
        positions: Vec<PositionMatch>,
        #[serde(default)]
        tolerance: f64,
    },
    AvoidPositions {
        positions: Vec<Coordinate>,
        #[serde(default)]
        tolerance: f64,
    },
    MinDistance {
        reference: DistanceReference,
        min_distance: f64,
    },
    MovingDirection {
        direction: Direction,
        #[serde(default)]
        negate: bool,
    },
}

/// A condition on exactly one obstacle. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub obstacle: ObstacleId,
    #[serde(flatten)]
    pub kind: RequirementKind,
}

impl Requirement {
    pub fn exact_position(obstacle: ObstacleId, target: Coordinate, tolerance: f64) -> Self {
        Self {
            obstacle,
            kind: RequirementKind::ExactPosition { target, direction: None, tolerance },
        }
    }

    pub fn exact_position_moving(
        obstacle: ObstacleId,
        target: Coordinate,
        direction: Direction,
        tolerance: f64,
    ) -> Self {
        Self {
            obstacle,
            kind: RequirementKind::ExactPosition {
                target,
                direction: Some(direction),
                tolerance,
            },
        }
    }

    pub fn any_of(obstacle: ObstacleId, positions: Vec<PositionMatch>, tolerance: f64) -> Self {
        Self {
            obstacle,
            kind: RequirementKind::MultiplePositions { positions, tolerance },
        }
    }

    pub fn avoid(obstacle: ObstacleId, positions: Vec<Coordinate>, tolerance: f64) -> Self {
        Self {
            obstacle,
            kind: RequirementKind::AvoidPositions { positions, tolerance },
        }
    }

    pub fn min_distance(obstacle: ObstacleId, reference: DistanceReference, min_distance: f64) -> Self {
        Self {
            obstacle,
            kind: RequirementKind::MinDistance { reference, min_distance },
        }
    }

    pub fn moving(obstacle: ObstacleId, direction: Direction) -> Self {
        Self {
            obstacle,
            kind: RequirementKind::MovingDirection { direction, negate: false },
        }
    }

    pub fn not_moving(obstacle: ObstacleId, direction: Direction) -> Self {
        Self {
            obstacle,
            kind: RequirementKind::MovingDirection { direction, negate: true },
        }
    }

    /// Tolerances and distances must be finite and non-negative.
    pub fn validate(&self) -> Result<(), String> {
        let check = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(format!("{} for {} must be a non-negative number, got {}", name, self.obstacle, value))
            }
        };
        match &self.kind {
            RequirementKind::ExactPosition { tolerance, .. } => check("tolerance", *tolerance),
            RequirementKind::MultiplePositions { positions, tolerance } => {
                if positions.is_empty() {
                    return Err(format!("multiple_positions for {} lists no positions", self.obstacle));
                }
                check("tolerance", *tolerance)
            }
            RequirementKind::AvoidPositions { tolerance, .. } => check("tolerance", *tolerance),
            RequirementKind::MinDistance { min_distance, .. } => check("min_distance", *min_distance),
            RequirementKind::MovingDirection { .. } => Ok(()),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RequirementKind::ExactPosition { target, direction, tolerance } => match direction {
                Some(d) => write!(f, "{} at {}±{} moving {:?}", self.obstacle, target, tolerance, d),
                None => write!(f, "{} at {}±{}", self.obstacle, target, tolerance),
            },
            RequirementKind::MultiplePositions { positions, tolerance } => {
                write!(f, "{} at one of {} positions ±{}", self.obstacle, positions.len(), tolerance)
            }
            RequirementKind::AvoidPositions { positions, tolerance } => {
                write!(f, "{} away from {} positions ±{}", self.obstacle, positions.len(), tolerance)
            }
            RequirementKind::MinDistance { reference, min_distance } => match reference {
                DistanceReference::Fixed(c) => write!(f, "{} at least {} from {}", self.obstacle, min_distance, c),
                DistanceReference::Agent => write!(f, "{} at least {} from agent", self.obstacle, min_distance),
            },
            RequirementKind::MovingDirection { direction, negate } => {
                if *negate {
                    write!(f, "{} not moving {:?}", self.obstacle, direction)
                } else {
                    write!(f, "{} moving {:?}", self.obstacle, direction)
                }
            }
        }
    }
}
