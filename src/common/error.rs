use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Area not found: {id}")]
    AreaNotFound { id: String },

    #[error("Invalid area definition {id}: {reason}")]
    InvalidArea { id: String, reason: String },

    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

/// Why a traversal stage stopped short.
///
/// Everything except `Cancelled` moves the run to `Failed`. Cancellation is an
/// external stop and resets the run without counting as a failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraversalError {
    #[error("Requirements for checkpoint '{checkpoint}' not met in time (failing: {failing:?})")]
    RequirementTimeout {
        checkpoint: String,
        failing: Vec<String>,
    },

    #[error("Agent did not reach {target} in time")]
    MovementTimeout { target: String },

    #[error("Agent left the area during {stage}")]
    AreaExitFailsafe { stage: String },

    #[error("Stage action '{action}' failed: {reason}")]
    StageActionFailure { action: String, reason: String },

    #[error("Run cancelled")]
    Cancelled,
}

impl TraversalError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TraversalError::Cancelled)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TraversalError::RequirementTimeout { .. } => "RequirementTimeout",
            TraversalError::MovementTimeout { .. } => "MovementTimeout",
            TraversalError::AreaExitFailsafe { .. } => "AreaExitFailsafe",
            TraversalError::StageActionFailure { .. } => "StageActionFailure",
            TraversalError::Cancelled => "Cancelled",
        }
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type TraversalResult<T> = Result<T, TraversalError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
