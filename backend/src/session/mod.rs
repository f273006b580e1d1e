//! Session coordinator
//!
//! Drives one job through its lifecycle:
//!
//! ```text
//! Unstarted --start_session--> Started --run_simulation--> Running
//!     Started/Running --end_session--> Ended
//!     any --terminate_session--> Terminated
//! ```
//!
//! `start_session` prepares the engine (geometry, physics, materials,
//! sensitive volumes, monitors, step limits, particle table), opens the
//! primaries and output files and seeds the engine. `run_simulation` feeds
//! the engine one event at a time until the primaries run out.
//! `end_session` flushes everything and writes the success receipt.
//!
//! # Critical Invariants
//!
//! 1. Every fatal condition comes back as a [`SessionError`]; nothing here
//!    exits the process. The caller turns it into a failure receipt with
//!    [`Session::terminate_session`].
//! 2. Each event writes its marker to every active stream before the engine
//!    sees its primaries.
//! 3. Primaries claim track ids 1..=n of their event before transport starts.
//!
//! # Example
//!
//! ```rust,ignore
//! use g4ants_session_core::{JobConfig, Session};
//!
//! let config = JobConfig::from_json_str(&text)?;
//! let mut session = Session::new(engine, config);
//! let receipt = session
//!     .start_session()
//!     .and_then(|()| session.run_simulation())
//!     .and_then(|()| session.end_session())
//!     .unwrap_or_else(|err| session.terminate_session(&err));
//! ```

pub mod context;
pub mod error;
pub mod progress;
pub mod receipt;

pub use context::{ExitFilter, SessionContext, TrackIdPredictor};
pub use error::SessionError;
pub use progress::{progress_line, status_line, ProgressReporter};
pub use receipt::Receipt;

use crate::config::{JobConfig, ParticleDeclaration};
use crate::engine::SimulationEngine;
use crate::models::{EventId, IonSpec, MaterialRegistry, ParticleHandle, ParticleRegistry};
use crate::monitor::{Monitor, MonitorReport};
use crate::output::{DepositionWriter, ExitWriter, HistoryWriter};
use crate::primaries::{ParticleResolver, PrimariesError, PrimaryReader};
use crate::recorders::Recorders;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, error, info, warn};

/// Command that finalizes the engine's run setup
const RUN_INITIALIZE: &str = "/run/initialize";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    Started,
    Running,
    Ended,
    Terminated,
}

// ============================================================================
// Particle resolution for the primaries reader
// ============================================================================

struct EngineResolver<'a, E> {
    engine: &'a E,
    particles: &'a ParticleRegistry,
}

impl<E: SimulationEngine> ParticleResolver for EngineResolver<'_, E> {
    fn resolve_index(&self, index: usize) -> Option<ParticleHandle> {
        self.particles.handle(index)
    }

    fn resolve_name(&self, name: &str) -> Result<ParticleHandle, PrimariesError> {
        if let Some(handle) = self.engine.find_particle(name) {
            return Ok(handle);
        }
        let ion = IonSpec::parse(name)
            .ok_or_else(|| PrimariesError::UnknownParticle(name.to_string()))?;
        self.engine
            .find_ion(ion.z, ion.a, ion.excitation)
            .ok_or_else(|| PrimariesError::IonUnavailable(name.to_string()))
    }
}

/// Name lookup shared by particle declarations and monitor filters
fn find_named_particle<E: SimulationEngine>(engine: &E, name: &str) -> Option<ParticleHandle> {
    engine.find_particle(name).or_else(|| {
        IonSpec::parse(name).and_then(|ion| engine.find_ion(ion.z, ion.a, ion.excitation))
    })
}

// ============================================================================
// Session
// ============================================================================

pub struct Session<E: SimulationEngine> {
    engine: E,
    config: JobConfig,
    state: SessionState,
    context: SessionContext,
    reader: Option<PrimaryReader>,
    event_id: Option<EventId>,
    progress: ProgressReporter,
    /// Non-fatal problems found while preparing the engine
    warnings: Vec<String>,
}

impl<E: SimulationEngine> Session<E> {
    pub fn new(engine: E, config: JobConfig) -> Self {
        let progress = ProgressReporter::new(config.num_events);
        Self {
            engine,
            config,
            state: SessionState::Unstarted,
            context: SessionContext::default(),
            reader: None,
            event_id: None,
            progress,
            warnings: Vec::new(),
        }
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn warn_session(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Prepare the engine and open every input and output file
    pub fn start_session(&mut self) -> Result<(), SessionError> {
        self.require("start the session", &[SessionState::Unstarted])?;
        info!(
            fingerprint = %self.config.fingerprint,
            seed = self.config.seed,
            "starting session"
        );

        self.engine.load_geometry(&self.config.gdml_file)?;
        self.engine
            .configure_physics(&self.config.physics_list, self.config.thermal_neutron_scattering)?;

        self.setup_materials()?;
        self.setup_sensitive_volumes()?;
        self.setup_step_limits()?;
        self.setup_particles()?;
        self.setup_monitors()?;

        let reader = PrimaryReader::open(&self.config.primaries_file, self.config.primaries_format)?;
        self.event_id = Some(reader.next_event_id().clone());
        self.reader = Some(reader);

        self.open_outputs()?;

        self.engine.set_random_seed(self.config.seed);
        for command in &self.config.commands {
            debug!(command = %command, "applying engine command");
            self.engine.apply_command(command)?;
        }
        self.engine.apply_command(RUN_INITIALIZE)?;

        self.state = SessionState::Started;
        Ok(())
    }

    fn setup_materials(&mut self) -> Result<(), SessionError> {
        let mut materials = MaterialRegistry::from_names(self.config.materials.as_slice());
        for rebuild in &self.config.material_rebuilds {
            if rebuild.original == rebuild.standard {
                return Err(SessionError::MaterialSameName(rebuild.original.clone()));
            }
            self.engine.rebuild_material(&rebuild.original, &rebuild.standard)?;
            materials.alias(&rebuild.standard, &rebuild.original)?;
            debug!(original = %rebuild.original, standard = %rebuild.standard, "rebuilt material");
        }
        self.context.materials = materials;
        Ok(())
    }

    fn setup_sensitive_volumes(&mut self) -> Result<(), SessionError> {
        let volumes = self.engine.logical_volume_names();
        let patterns = self.config.sensitive_volumes.clone();
        for pattern in &patterns {
            let matching: Vec<&String> = volumes.iter().filter(|v| pattern.matches(v)).collect();
            if matching.is_empty() {
                self.warn_session(format!(
                    "Sensitive volume pattern {} does not match any volume",
                    pattern.as_str()
                ));
                continue;
            }
            for volume in matching {
                self.engine.attach_sensitive_detector(volume)?;
            }
        }
        Ok(())
    }

    fn setup_step_limits(&mut self) -> Result<(), SessionError> {
        let volumes = self.engine.logical_volume_names();
        let limits = self.config.step_limits.clone();
        for limit in &limits {
            if volumes.iter().any(|v| *v == limit.volume) {
                self.engine.set_step_limit(&limit.volume, limit.max_step)?;
            } else {
                self.warn_session(format!(
                    "Step limit cannot be set: volume {} not found",
                    limit.volume
                ));
            }
        }
        Ok(())
    }

    fn setup_particles(&mut self) -> Result<(), SessionError> {
        let mut particles = ParticleRegistry::new();
        for declaration in &self.config.particles {
            let handle = match declaration {
                ParticleDeclaration::Name(name) => self.engine.find_particle(name),
                ParticleDeclaration::Ion { z, a, .. } => self.engine.find_ion(*z, *a, 0.0),
            }
            .ok_or_else(|| SessionError::ParticleNotInTable(declaration.name().to_string()))?;
            particles.register(declaration.name(), handle);
        }
        self.context.particles = particles;
        Ok(())
    }

    fn setup_monitors(&mut self) -> Result<(), SessionError> {
        let mut monitors = Vec::with_capacity(self.config.monitors.len());
        for (index, config) in self.config.monitors.iter().enumerate() {
            let particle = if config.particle_name.is_empty() {
                None
            } else {
                let handle = find_named_particle(&self.engine, &config.particle_name).ok_or_else(
                    || SessionError::MonitorParticleNotFound {
                        monitor: config.name.clone(),
                        particle: config.particle_name.clone(),
                    },
                )?;
                Some(handle)
            };
            self.engine.attach_monitor(&config.name, index)?;
            monitors.push(Monitor::new(config.clone(), particle));
        }
        self.context.monitors_require_stepping = monitors.iter().any(Monitor::requires_stepping);
        self.context.monitors = monitors;
        Ok(())
    }

    fn open_outputs(&mut self) -> Result<(), SessionError> {
        let config = &self.config;
        let precision = config.precision;

        self.context.deposition =
            DepositionWriter::create(&config.deposition_file, config.output_format, precision)
                .map_err(SessionError::io("Cannot open file to store deposition data"))?;

        self.context.history_mode = config.history;
        self.context.history = match (&config.tracks_file, config.history.is_on()) {
            (Some(path), true) => HistoryWriter::create(path, config.output_format, precision)
                .map_err(SessionError::io("Cannot open file to export history/tracks data"))?,
            _ => HistoryWriter::disabled(),
        };

        let Some(exit) = config.exit_particles.clone() else {
            return Ok(());
        };
        let volumes = self.engine.logical_volume_names();
        if !volumes.iter().any(|v| *v == exit.volume_name) {
            self.warn_session(format!(
                "Exit particles volume {} not found, export disabled",
                exit.volume_name
            ));
            return Ok(());
        }
        self.context.exit = ExitWriter::create(&exit.file, exit.format, precision)
            .map_err(SessionError::io("Cannot open file to export exiting particle data"))?;
        self.context.exit_filter = Some(ExitFilter {
            volume: exit.volume_name,
            time_window: exit.time_window,
            kill: exit.kill_on_exit,
        });
        Ok(())
    }

    /// Transport every event of the primaries file
    pub fn run_simulation(&mut self) -> Result<(), SessionError> {
        self.require("run the simulation", &[SessionState::Started])?;
        self.state = SessionState::Running;
        self.context.reset_totals();
        self.progress = ProgressReporter::new(self.config.num_events);

        let reader = self.reader.as_mut().ok_or(SessionError::InvalidState {
            operation: "run the simulation",
            state: SessionState::Running,
        })?;

        while !reader.is_end_of_input()? {
            let event_id = reader.next_event_id().clone();
            self.context.begin_event(&event_id)?;
            self.event_id = Some(event_id);

            let resolver = EngineResolver {
                engine: &self.engine,
                particles: &self.context.particles,
            };
            let primaries = reader.read_next_event(&resolver)?;
            for _ in primaries {
                self.context.track_ids.issue();
            }

            self.engine
                .beam_on(primaries, &mut Recorders::new(&mut self.context))?;

            if let Some(percent) = self.progress.advance() {
                println!("{}", progress_line(percent));
            }
        }

        info!(events = self.progress.events_done(), "simulation finished");
        Ok(())
    }

    /// Flush outputs, save monitor data and write the success receipt
    pub fn end_session(&mut self) -> Result<Receipt, SessionError> {
        self.require("end the session", &[SessionState::Started, SessionState::Running])?;

        if let Some(path) = &self.config.monitors_file {
            self.save_monitors(path)?;
        }

        self.context
            .deposition
            .finish()
            .map_err(SessionError::io("Cannot write deposition data"))?;
        self.context
            .history
            .finish()
            .map_err(SessionError::io("Cannot write history/tracks data"))?;
        self.context
            .exit
            .finish()
            .map_err(SessionError::io("Cannot write exiting particle data"))?;

        let mut receipt = Receipt::success();
        self.fill_totals(&mut receipt);

        receipt
            .write_to(&self.config.receipt_file)
            .map_err(SessionError::io("Cannot write the receipt file"))?;

        self.state = SessionState::Ended;
        Ok(receipt)
    }

    fn save_monitors(&self, path: &std::path::Path) -> Result<(), SessionError> {
        let reports: Vec<MonitorReport<'_>> =
            self.context.monitors.iter().map(Monitor::report).collect();
        let file = File::create(path).map_err(SessionError::io("Cannot open file to save monitor data"))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &reports).map_err(|e| SessionError::Io {
            context: "Cannot save monitor data".to_string(),
            source: e.into(),
        })?;
        out.flush()
            .map_err(SessionError::io("Cannot save monitor data"))
    }

    /// Totals, unregistered particle names and warnings, on success or failure
    fn fill_totals(&self, receipt: &mut Receipt) {
        receipt.depo_by_registered = self.context.deposited_by_registered();
        receipt.depo_by_not_registered = self.context.deposited_by_not_registered();
        receipt.seen_not_registered = self
            .context
            .particles
            .seen_unregistered()
            .map(str::to_string)
            .collect();
        receipt.warnings = self
            .config
            .warnings
            .iter()
            .chain(&self.warnings)
            .cloned()
            .collect();
    }

    /// Report a fatal error to the host and write the failure receipt
    ///
    /// A receipt that cannot be written is logged; the returned value is
    /// still the failure receipt.
    pub fn terminate_session(&mut self, err: &SessionError) -> Receipt {
        let message = err.to_string();
        println!("{}", status_line(&message));
        error!(error = %message, state = ?self.state, "session terminated");

        let mut receipt = Receipt::failure(message);
        self.fill_totals(&mut receipt);
        if let Err(write_err) = receipt.write_to(&self.config.receipt_file) {
            warn!(error = %write_err, "cannot write the failure receipt");
        }

        self.state = SessionState::Terminated;
        receipt
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn events_done(&self) -> u64 {
        self.progress.events_done()
    }

    /// Marker of the event being transported, or the next one before the run
    pub fn event_id(&self) -> Option<&EventId> {
        self.event_id.as_ref()
    }
}
