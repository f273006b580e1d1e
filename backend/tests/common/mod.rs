//! Shared fixtures for integration tests
//!
//! [`ScriptedEngine`] stands in for the transport engine: it knows a fixed
//! particle table and a list of logical volumes, records every setup call
//! and, on `beam_on`, runs a test-provided script against the recorders.

#![allow(dead_code)]

use g4ants_session_core::engine::{
    BoundaryCrossing, EngineError, EventCallbacks, HitInfo, LocalFrame, SimulationEngine,
    StepInfo, StepPoint, StepProcess, TrackInfo, VolumeRef,
};
use g4ants_session_core::{ParticleHandle, ParticleRecord, SessionError};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

// ============================================================================
// Scripted engine
// ============================================================================

pub type EventScript =
    Box<dyn FnMut(usize, &[ParticleRecord], &mut dyn EventCallbacks) -> Result<(), SessionError>>;

/// What the engine was asked to do
#[derive(Debug, Default)]
pub struct EngineLog {
    pub calls: Vec<String>,
    pub primaries: Vec<Vec<ParticleRecord>>,
    pub seed: Option<i64>,
}

pub struct ScriptedEngine {
    volumes: Vec<String>,
    particles: HashMap<String, ParticleHandle>,
    log: Rc<RefCell<EngineLog>>,
    script: Option<EventScript>,
    events: usize,
}

pub const GAMMA: ParticleHandle = ParticleHandle(22);
pub const ELECTRON: ParticleHandle = ParticleHandle(11);
pub const NEUTRON: ParticleHandle = ParticleHandle(2112);

impl ScriptedEngine {
    pub fn new(volumes: &[&str]) -> Self {
        let particles = [("gamma", GAMMA), ("e-", ELECTRON), ("neutron", NEUTRON)]
            .into_iter()
            .map(|(name, handle)| (name.to_string(), handle))
            .collect();
        Self {
            volumes: volumes.iter().map(|v| v.to_string()).collect(),
            particles,
            log: Rc::new(RefCell::new(EngineLog::default())),
            script: None,
            events: 0,
        }
    }

    pub fn with_script<F>(mut self, script: F) -> Self
    where
        F: FnMut(usize, &[ParticleRecord], &mut dyn EventCallbacks) -> Result<(), SessionError>
            + 'static,
    {
        self.script = Some(Box::new(script));
        self
    }

    pub fn log(&self) -> Rc<RefCell<EngineLog>> {
        Rc::clone(&self.log)
    }

    fn record(&self, call: String) {
        self.log.borrow_mut().calls.push(call);
    }
}

/// Handle the mock issues for an ion, PDG style
pub fn ion_handle(z: u32, a: u32) -> ParticleHandle {
    ParticleHandle(1_000_000_000 + z * 10_000 + a * 10)
}

impl SimulationEngine for ScriptedEngine {
    fn load_geometry(&mut self, gdml: &Path) -> Result<(), EngineError> {
        self.record(format!("geometry {}", gdml.display()));
        Ok(())
    }

    fn configure_physics(&mut self, physics_list: &str, thermal: bool) -> Result<(), EngineError> {
        self.record(format!("physics {} {}", physics_list, thermal));
        Ok(())
    }

    fn logical_volume_names(&self) -> Vec<String> {
        self.volumes.clone()
    }

    fn attach_sensitive_detector(&mut self, volume: &str) -> Result<(), EngineError> {
        self.record(format!("sensitive {}", volume));
        Ok(())
    }

    fn attach_monitor(&mut self, volume: &str, monitor: usize) -> Result<(), EngineError> {
        self.record(format!("monitor {} {}", volume, monitor));
        Ok(())
    }

    fn set_step_limit(&mut self, volume: &str, max_step_mm: f64) -> Result<(), EngineError> {
        self.record(format!("step-limit {} {}", volume, max_step_mm));
        Ok(())
    }

    fn rebuild_material(&mut self, original: &str, standard: &str) -> Result<(), EngineError> {
        if !standard.starts_with("G4_") {
            return Err(EngineError::Material(format!(
                "{} is not in the standard library",
                standard
            )));
        }
        self.record(format!("rebuild {} {}", original, standard));
        Ok(())
    }

    fn find_particle(&self, name: &str) -> Option<ParticleHandle> {
        self.particles.get(name).copied()
    }

    fn find_ion(&self, z: u32, a: u32, _excitation_kev: f64) -> Option<ParticleHandle> {
        (z <= 100).then(|| ion_handle(z, a))
    }

    fn set_random_seed(&mut self, seed: i64) {
        self.log.borrow_mut().seed = Some(seed);
    }

    fn apply_command(&mut self, command: &str) -> Result<(), EngineError> {
        self.record(format!("command {}", command));
        Ok(())
    }

    fn beam_on(
        &mut self,
        primaries: &[ParticleRecord],
        callbacks: &mut dyn EventCallbacks,
    ) -> Result<(), SessionError> {
        self.log.borrow_mut().primaries.push(primaries.to_vec());
        let event = self.events;
        self.events += 1;
        match &mut self.script {
            Some(script) => script(event, primaries, callbacks),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Callback payload builders
// ============================================================================

pub fn hit(particle: &str, material: &str, energy: f64) -> HitInfo {
    HitInfo {
        particle: particle.to_string(),
        material: material.to_string(),
        energy_deposit: energy,
        position: [1.0, 2.0, 3.0],
        time: 0.5,
    }
}

pub fn volume(name: &str, material: &str) -> VolumeRef {
    VolumeRef {
        name: name.to_string(),
        copy_number: 0,
        material: material.to_string(),
    }
}

pub fn track(track_id: i32, parent_id: i32, particle: &str) -> TrackInfo {
    TrackInfo {
        track_id,
        parent_id,
        particle: particle.to_string(),
        position: [0.0; 3],
        time: 0.0,
        kinetic_energy: 1000.0,
        volume: volume("Det", "Water"),
    }
}

pub fn step(track_id: i32, process: StepProcess, secondaries: usize) -> StepInfo {
    StepInfo {
        track_id,
        parent_id: 0,
        particle: "gamma".to_string(),
        process,
        pre_volume: "Det".to_string(),
        post: StepPoint {
            position: [0.0, 0.0, 5.0],
            direction: [0.0, 0.0, 1.0],
            time: 1.0,
            kinetic_energy: 500.0,
        },
        post_volume: Some(volume("Det", "Water")),
        leaves_volume: false,
        energy_deposit: 0.0,
        num_secondaries: secondaries,
    }
}

pub fn crossing(track_id: i32, parent_id: i32, particle: ParticleHandle) -> BoundaryCrossing {
    BoundaryCrossing {
        track_id,
        parent_id,
        particle,
        at_boundary: true,
        position: [0.0, 0.0, 1.0],
        direction: [0.0, 0.0, -1.0],
        time: 15.0,
        kinetic_energy: 25.0,
        frame: LocalFrame::default(),
    }
}

// ============================================================================
// Job files
// ============================================================================

/// Temporary directory holding one job's inputs and outputs
pub struct JobFixture {
    dir: TempDir,
}

impl JobFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("read output file")
    }

    pub fn read_bytes(&self, name: &str) -> Vec<u8> {
        fs::read(self.path(name)).expect("read output file")
    }

    /// Minimal valid job: particles gamma and e-, material Water, volume Det
    pub fn base_config(&self) -> Value {
        json!({
            "File_Receipt": self.path("receipt.json"),
            "GDML": self.path("detector.gdml"),
            "PhysicsList": "QGSP_BIC_HP",
            "Seed": 12345,
            "File_Primaries": self.path("primaries.txt"),
            "File_Deposition": self.path("deposition.txt"),
            "SensitiveVolumes": ["Det"],
            "Particles": ["gamma", "e-"],
            "Materials": ["Water"],
            "NumEvents": 1
        })
    }

    pub fn write_config(&self, config: &Value) -> PathBuf {
        self.write("config.json", serde_json::to_string_pretty(config).expect("json"))
    }

    pub fn receipt(&self) -> Value {
        serde_json::from_str(&self.read("receipt.json")).expect("receipt json")
    }
}
