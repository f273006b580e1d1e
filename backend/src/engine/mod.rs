//! Simulation engine collaborator
//!
//! The transport engine (geometry, physics, tracking) is external. The
//! session talks to it through [`SimulationEngine`], and the engine reports
//! back through the callback traits below, one trait per callback kind.
//!
//! # Critical Invariants
//!
//! 1. `beam_on` processes exactly one event and invokes callbacks
//!    synchronously, on the calling thread, before it returns.
//! 2. A callback error aborts the event: the engine must stop transport and
//!    return that error from `beam_on` unchanged.
//! 3. Track ids are assigned by the engine in creation order starting at 1
//!    for each event, primaries first.

use crate::models::{ParticleHandle, ParticleRecord};
use crate::session::SessionError;
use std::path::Path;
use thiserror::Error;

/// Errors reported by the engine itself
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Physics list error: {0}")]
    Physics(String),

    #[error("Material error: {0}")]
    Material(String),

    #[error("Engine command failed: {0}")]
    Command(String),
}

// ============================================================================
// Callback payloads
// ============================================================================

/// A placed physical volume
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRef {
    pub name: String,
    pub copy_number: i32,
    /// Name of the volume's material
    pub material: String,
}

/// Energy deposit inside a sensitive volume
#[derive(Debug, Clone, PartialEq)]
pub struct HitInfo {
    pub particle: String,
    /// Material at the pre-step point
    pub material: String,
    /// Deposited energy (keV)
    pub energy_deposit: f64,
    /// Post-step position (mm)
    pub position: [f64; 3],
    /// Post-step global time (ns)
    pub time: f64,
}

/// Process that limited a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepProcess {
    Transportation,
    Interaction(String),
    /// Engine could not name the process
    Unknown,
}

/// Post-step kinematics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPoint {
    pub position: [f64; 3],
    pub direction: [f64; 3],
    pub time: f64,
    pub kinetic_energy: f64,
}

/// A completed step
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub track_id: i32,
    pub parent_id: i32,
    pub particle: String,
    pub process: StepProcess,
    /// Logical volume at the pre-step point
    pub pre_volume: String,
    pub post: StepPoint,
    /// Volume at the post-step point, `None` once the track left the world
    pub post_volume: Option<VolumeRef>,
    /// Post-step point lies on a geometric boundary
    pub leaves_volume: bool,
    /// Energy deposited along the step (keV)
    pub energy_deposit: f64,
    /// Secondaries created on this step
    pub num_secondaries: usize,
}

/// A track about to be transported
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub track_id: i32,
    pub parent_id: i32,
    pub particle: String,
    pub position: [f64; 3],
    pub time: f64,
    pub kinetic_energy: f64,
    pub volume: VolumeRef,
}

/// Rigid transform from global to a volume's local frame
///
/// `local = rotation · global + translation`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl Default for LocalFrame {
    fn default() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }
}

impl LocalFrame {
    fn rotate(&self, v: &[f64; 3]) -> [f64; 3] {
        let r = &self.rotation;
        [
            r[0][0] * v[0] + r[0][1] * v[1] + r[0][2] * v[2],
            r[1][0] * v[0] + r[1][1] * v[1] + r[1][2] * v[2],
            r[2][0] * v[0] + r[2][1] * v[1] + r[2][2] * v[2],
        ]
    }

    pub fn to_local_point(&self, global: &[f64; 3]) -> [f64; 3] {
        let rotated = self.rotate(global);
        [
            rotated[0] + self.translation[0],
            rotated[1] + self.translation[1],
            rotated[2] + self.translation[2],
        ]
    }

    pub fn to_local_axis(&self, global: &[f64; 3]) -> [f64; 3] {
        self.rotate(global)
    }
}

/// A step ending inside a monitor volume
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCrossing {
    pub track_id: i32,
    pub parent_id: i32,
    pub particle: ParticleHandle,
    /// Pre-step point lies on the monitor's boundary
    pub at_boundary: bool,
    /// Global position (mm)
    pub position: [f64; 3],
    /// Global direction
    pub direction: [f64; 3],
    pub time: f64,
    /// keV
    pub kinetic_energy: f64,
    /// Monitor volume's frame at the crossing point
    pub frame: LocalFrame,
}

/// What the engine should do with the current track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackControl {
    Continue,
    Kill,
}

// ============================================================================
// Callback traits
// ============================================================================

/// Sensitive-detector hits
pub trait HitProcessor {
    /// Returns whether the hit was recorded
    fn process_hit(&mut self, hit: &HitInfo) -> Result<bool, SessionError>;
}

/// Steps inside monitor volumes; `monitor` is the index passed to
/// [`SimulationEngine::attach_monitor`]
pub trait MonitorProcessor {
    fn process_monitor_crossing(
        &mut self,
        monitor: usize,
        crossing: &BoundaryCrossing,
    ) -> Result<TrackControl, SessionError>;
}

/// Every completed step
pub trait StepProcessor {
    fn user_stepping_action(&mut self, step: &StepInfo) -> Result<TrackControl, SessionError>;
}

/// Track start and end
pub trait TrackProcessor {
    fn pre_tracking_action(&mut self, track: &TrackInfo) -> Result<(), SessionError>;
    fn post_tracking_action(&mut self, track_id: i32) -> Result<(), SessionError>;
}

/// All callbacks the engine invokes during one event
pub trait EventCallbacks: HitProcessor + MonitorProcessor + StepProcessor + TrackProcessor {}

impl<T> EventCallbacks for T where T: HitProcessor + MonitorProcessor + StepProcessor + TrackProcessor {}

// ============================================================================
// Engine
// ============================================================================

/// The transport engine as seen by the session
pub trait SimulationEngine {
    fn load_geometry(&mut self, gdml: &Path) -> Result<(), EngineError>;

    fn configure_physics(
        &mut self,
        physics_list: &str,
        thermal_neutron_scattering: bool,
    ) -> Result<(), EngineError>;

    /// Names of all logical volumes in the loaded geometry
    fn logical_volume_names(&self) -> Vec<String>;

    fn attach_sensitive_detector(&mut self, volume: &str) -> Result<(), EngineError>;

    fn attach_monitor(&mut self, volume: &str, monitor: usize) -> Result<(), EngineError>;

    fn set_step_limit(&mut self, volume: &str, max_step_mm: f64) -> Result<(), EngineError>;

    /// Rebuild `original` from the standard material library entry `standard`
    fn rebuild_material(&mut self, original: &str, standard: &str) -> Result<(), EngineError>;

    fn find_particle(&self, name: &str) -> Option<ParticleHandle>;

    fn find_ion(&self, z: u32, a: u32, excitation_kev: f64) -> Option<ParticleHandle>;

    fn set_random_seed(&mut self, seed: i64);

    fn apply_command(&mut self, command: &str) -> Result<(), EngineError>;

    /// Transport one event started by `primaries`
    fn beam_on(
        &mut self,
        primaries: &[ParticleRecord],
        callbacks: &mut dyn EventCallbacks,
    ) -> Result<(), SessionError>;
}
