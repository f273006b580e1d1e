//! G4ants Session Core - Rust Engine
//!
//! Data pipeline around a particle-transport engine: reads a JSON job
//! description and a primaries file, feeds events to the engine, records
//! what the engine reports and writes a receipt when the job ends.
//!
//! # Architecture
//!
//! - **config**: Job document parsing and validation
//! - **primaries**: Event-by-event primaries reader (text and binary)
//! - **wire**: Tagged binary and `%g` text record codec
//! - **output**: Deposition, history and exit-particle writers
//! - **monitor**: Boundary-crossing histograms
//! - **engine**: Traits the transport engine implements and calls back into
//! - **recorders**: Engine callback adapters writing to the outputs
//! - **session**: Lifecycle coordinator, receipt and host status lines
//! - **driver**: One job from config file to receipt
//!
//! # Critical Invariants
//!
//! 1. The receipt file is written exactly once per job, success or failure
//! 2. Library code never exits the process; fatal errors are values
//! 3. Output records of an event follow that event's marker

pub mod config;
pub mod driver;
pub mod engine;
pub mod models;
pub mod monitor;
pub mod output;
pub mod primaries;
pub mod recorders;
pub mod session;
pub mod wire;

pub use config::{ConfigError, HistoryMode, JobConfig, MonitorConfig, PrimariesFormat};
pub use driver::run_job;
pub use engine::{
    BoundaryCrossing, EngineError, EventCallbacks, HitInfo, SimulationEngine, StepInfo,
    TrackControl, TrackInfo,
};
pub use models::{EventId, IonSpec, ParticleHandle, ParticleRecord};
pub use monitor::{Histogram1D, Histogram2D, Monitor};
pub use primaries::{PrimariesError, PrimaryReader};
pub use recorders::Recorders;
pub use session::{Receipt, Session, SessionError, SessionState};
pub use wire::{OutputFormat, WireError};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn g4ants_session_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ffi::decode_deposition, m)?)?;
    Ok(())
}
