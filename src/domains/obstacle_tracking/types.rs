use serde::{Deserialize, Serialize};
use std::fmt;

/// Tile-space position. Distances are Euclidean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_within(&self, other: &Coordinate, tolerance: f64) -> bool {
        self.distance_to(other) <= tolerance
    }

    /// One tile step toward `target` on each axis.
    pub fn step_toward(&self, target: &Coordinate) -> Coordinate {
        Coordinate {
            x: self.x + (target.x - self.x).clamp(-1.0, 1.0),
            y: self.y + (target.y - self.y).clamp(-1.0, 1.0),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleId(pub u32);

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obstacle-{}", self.0)
    }
}

/// Cardinal movement direction. North is increasing Y, East is increasing X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Signed delta between an obstacle's previous and current position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementVector {
    pub dx: f64,
    pub dy: f64,
}

impl MovementVector {
    pub fn between(previous: &Coordinate, current: &Coordinate) -> Self {
        Self {
            dx: current.x - previous.x,
            dy: current.y - previous.y,
        }
    }

    /// Strict sign test on the axis the direction names. A diagonal step
    /// matches both of its cardinal components.
    pub fn matches(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.dy > 0.0,
            Direction::South => self.dy < 0.0,
            Direction::East => self.dx > 0.0,
            Direction::West => self.dx < 0.0,
        }
    }

    /// Dominant cardinal direction, `None` for a zero vector.
    pub fn dominant(&self) -> Option<Direction> {
        if self.dx == 0.0 && self.dy == 0.0 {
            return None;
        }
        if self.dy.abs() >= self.dx.abs() {
            Some(if self.dy > 0.0 { Direction::North } else { Direction::South })
        } else {
            Some(if self.dx > 0.0 { Direction::East } else { Direction::West })
        }
    }
}
