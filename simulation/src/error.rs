//! Error types for the simulation layer

use mirrorsim_core::{LinkId, StructureError};
use thiserror::Error;

use crate::types::LinkState;

/// Failures while configuring or driving a simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Link {link} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        link: LinkId,
        from: LinkState,
        to: LinkState,
    },

    #[error("Unknown link: {0}")]
    UnknownLink(LinkId),

    #[error("Degree {degree} cannot be met by {mirrors} mirrors")]
    UnsatisfiableDegree { degree: usize, mirrors: usize },

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimulationError>;
