//! Session error type
//!
//! Every fatal condition of a job ends up as a [`SessionError`]. Its
//! `Display` text is what the failure receipt reports.

use super::SessionState;
use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::models::RegistryError;
use crate::primaries::PrimariesError;
use crate::wire::WireError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Primaries(#[from] PrimariesError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot {operation} while the session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("{0} - particle not found in Geant4 particle/ion table!")]
    ParticleNotInTable(String),

    #[error("Material {0} cannot have the same name as the G4NistManager name")]
    MaterialSameName(String),

    #[error("Monitor {monitor}: particle {particle} not found")]
    MonitorParticleNotFound { monitor: String, particle: String },

    #[error("Crossing reported for unknown monitor #{0}")]
    UnknownMonitor(usize),
}

impl SessionError {
    /// Adapter for `map_err` on I/O results
    pub fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> SessionError {
        let context = context.into();
        move |source| SessionError::Io { context, source }
    }
}
