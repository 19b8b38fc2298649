use super::path::Checkpoint;
use crate::common::{DomainError, DomainResult};
use crate::domains::obstacle_tracking::{Coordinate, ObstacleId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl AreaBounds {
    pub fn contains(&self, position: &Coordinate) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.y >= self.min_y
            && position.y <= self.max_y
    }
}

/// Action ids handed to the stage action port for each external interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageScript {
    pub enter: String,
    pub act: String,
    pub return_home: String,
}

/// Everything needed to run one patrolled area. Loaded as data and shared
/// read-only between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub bounds: AreaBounds,
    pub start: Coordinate,
    pub stages: StageScript,
    pub obstacles: Vec<ObstacleId>,
    pub checkpoints: Arc<[Checkpoint]>,
}

impl AreaDefinition {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        let invalid = |reason: String| DomainError::InvalidArea {
            id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("area id is empty".to_string()));
        }
        if self.bounds.min_x > self.bounds.max_x || self.bounds.min_y > self.bounds.max_y {
            return Err(invalid("bounds are inverted".to_string()));
        }
        if !self.bounds.contains(&self.start) {
            return Err(invalid(format!("start {} lies outside the area bounds", self.start)));
        }
        if self.checkpoints.is_empty() {
            return Err(invalid("no checkpoints".to_string()));
        }
        for checkpoint in self.checkpoints.iter() {
            for requirement in &checkpoint.requirements {
                if !self.obstacles.contains(&requirement.obstacle) {
                    return Err(invalid(format!(
                        "checkpoint '{}' references untracked {}",
                        checkpoint.label, requirement.obstacle
                    )));
                }
                requirement.validate().map_err(invalid)?;
            }
        }
        Ok(())
    }
}
