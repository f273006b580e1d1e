//! Job configuration
//!
//! The job document is a JSON object. [`JobConfig::from_json_str`] checks it
//! and turns it into the typed settings used by the rest of the pipeline.
//!
//! # Critical Invariants
//!
//! 1. The receipt path is checked first, so every later failure can still be
//!    reported to the receipt file.
//! 2. Required keys are checked in a fixed order and the first failure wins.
//! 3. Missing optional keys fall back to disabled features, never to errors.
//!
//! # Example
//!
//! ```
//! use g4ants_session_core::config::{HistoryMode, JobConfig};
//!
//! let config = JobConfig::from_json_str(r#"{
//!     "File_Receipt": "receipt.json",
//!     "GDML": "detector.gdml",
//!     "PhysicsList": "QGSP_BIC_HP",
//!     "Seed": 12345,
//!     "File_Primaries": "primaries.txt",
//!     "File_Deposition": "deposition.txt",
//!     "SensitiveVolumes": ["Det"],
//!     "Particles": ["gamma", "e-"],
//!     "Materials": ["Water"]
//! }"#).unwrap();
//!
//! assert_eq!(config.seed, 12345);
//! assert_eq!(config.precision, 6);
//! assert_eq!(config.history, HistoryMode::Off);
//! ```

pub mod monitor;

pub use monitor::{MonitorConfig, MonitorShape};

use crate::wire::OutputFormat;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;

/// Significant digits used for text output when `Precision` is absent or 0
pub const DEFAULT_PRECISION: usize = 6;

/// Errors raised while validating a job configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("File name for receipt was not provided")]
    MissingReceiptFile,

    #[error("GDML file name is not provided")]
    MissingGeometry,

    #[error("Reference physics list is not provided")]
    MissingPhysicsList,

    #[error("File name with primaries to generate was not provided")]
    MissingPrimariesFile,

    #[error("File name for deposition output was not provided")]
    MissingDepositionFile,

    #[error("Seed is not provided in the config file")]
    MissingSeed,

    #[error("Format error for the random generator seed in the config file")]
    InvalidSeed,

    #[error("Seed: read from the config file failed")]
    ZeroSeed,

    #[error("Particles are not defined in the configuration file!")]
    MissingParticles,

    #[error("Bad format of particle record in config")]
    BadParticleRecord,

    #[error("Materials are not defined in the configuration file!")]
    MissingMaterials,

    #[error("MaterialsToRebuild json element should be array of arrays [[name, G4_name], ...]")]
    BadMaterialRebuild,

    #[error("File name with tracks to export was not provided")]
    MissingTracksFile,

    #[error("File name for exit particles was not provided")]
    MissingExitFile,

    #[error("Monitor '{name}': {reason}")]
    InvalidMonitor { name: String, reason: String },
}

// ============================================================================
// Raw document
// ============================================================================

/// Job document with the original key names
///
/// Keys whose JSON type varies between producers stay as [`Value`] and are
/// checked during validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawJobConfig {
    #[serde(rename = "File_Receipt")]
    receipt_file: Option<String>,
    #[serde(rename = "GDML")]
    gdml: Option<String>,
    #[serde(rename = "PhysicsList")]
    physics_list: Option<String>,
    #[serde(rename = "ActivateThermalScattering")]
    thermal_scattering: bool,
    #[serde(rename = "Primaries_G4ants")]
    primaries_by_name: bool,
    #[serde(rename = "Primaries_Binary")]
    primaries_binary: bool,
    #[serde(rename = "File_Primaries")]
    primaries_file: Option<String>,
    #[serde(rename = "File_Deposition")]
    deposition_file: Option<String>,
    #[serde(rename = "File_Monitors")]
    monitors_file: Option<String>,
    #[serde(rename = "SensitiveVolumes")]
    sensitive_volumes: Vec<String>,
    #[serde(rename = "Commands")]
    commands: Vec<String>,
    #[serde(rename = "Seed")]
    seed: Option<Value>,
    #[serde(rename = "Particles")]
    particles: Vec<Value>,
    #[serde(rename = "Materials")]
    materials: Vec<String>,
    #[serde(rename = "MaterialsToRebuild")]
    materials_to_rebuild: Vec<Value>,
    #[serde(rename = "StepLimits")]
    step_limits: Vec<Value>,
    #[serde(rename = "BinaryOutput")]
    binary_output: bool,
    #[serde(rename = "SaveExitParticles")]
    exit_particles: Option<RawExitParticles>,
    #[serde(rename = "NumEvents")]
    num_events: u64,
    #[serde(rename = "BuildTracks")]
    build_tracks: bool,
    #[serde(rename = "LogHistory")]
    log_history: bool,
    #[serde(rename = "MaxTracks")]
    max_tracks: i64,
    #[serde(rename = "File_Tracks")]
    tracks_file: Option<String>,
    #[serde(rename = "Precision")]
    precision: usize,
    #[serde(rename = "Monitors")]
    monitors: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExitParticles {
    #[serde(rename = "Enabled")]
    enabled: bool,
    #[serde(rename = "UseBinary")]
    use_binary: bool,
    #[serde(rename = "UseTimeWindow")]
    use_time_window: bool,
    #[serde(rename = "TimeFrom")]
    time_from: f64,
    #[serde(rename = "TimeTo")]
    time_to: f64,
    #[serde(rename = "StopTrack")]
    stop_track: bool,
    #[serde(rename = "FileName")]
    file_name: String,
    #[serde(rename = "VolumeName")]
    volume_name: String,
}

// ============================================================================
// Typed configuration
// ============================================================================

/// How the primaries file encodes particles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimariesFormat {
    /// Text lines starting with an index into the declared particle list
    TextIndexed,
    /// Text lines starting with a particle or ion name
    TextNamed,
    /// Tagged binary records with particle names
    Binary,
}

/// One entry of the `Particles` list
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleDeclaration {
    /// Particle known to the engine's table by name
    Name(String),
    /// Ion given as `[name, Z, A]`
    Ion { name: String, z: u32, a: u32 },
}

impl ParticleDeclaration {
    pub fn name(&self) -> &str {
        match self {
            ParticleDeclaration::Name(name) => name,
            ParticleDeclaration::Ion { name, .. } => name,
        }
    }

    fn from_value(value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::String(name) if !name.is_empty() => Ok(ParticleDeclaration::Name(name.clone())),
            Value::Array(items) if items.len() >= 3 => {
                let name = items[0].as_str().unwrap_or_default();
                if name.is_empty() {
                    return Err(ConfigError::BadParticleRecord);
                }
                let number = |item: &Value| {
                    item.as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or(ConfigError::BadParticleRecord)
                };
                Ok(ParticleDeclaration::Ion {
                    name: name.to_string(),
                    z: number(&items[1])?,
                    a: number(&items[2])?,
                })
            }
            _ => Err(ConfigError::BadParticleRecord),
        }
    }
}

/// Volume name pattern for sensitive detectors
///
/// A trailing `*` turns the pattern into a prefix match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumePattern(String);

impl VolumePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, volume: &str) -> bool {
        match self.0.strip_suffix('*') {
            Some(prefix) => volume.starts_with(prefix),
            None => volume == self.0,
        }
    }
}

/// `[original, standard]` entry of `MaterialsToRebuild`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRebuild {
    pub original: String,
    pub standard: String,
}

/// Maximum step length (mm) for one logical volume
#[derive(Debug, Clone, PartialEq)]
pub struct StepLimit {
    pub volume: String,
    pub max_step: f64,
}

/// Settings of the exit-particle export
#[derive(Debug, Clone, PartialEq)]
pub struct ExitParticlesConfig {
    pub file: PathBuf,
    pub format: OutputFormat,
    pub volume_name: String,
    /// Only particles leaving inside `[from, to]` (ns) are exported
    pub time_window: Option<(f64, f64)>,
    pub kill_on_exit: bool,
}

/// Which tracking data goes to the history stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Off,
    /// Track starts and interaction steps for the first N tracks
    BoundedTracks(u32),
    /// Every step including transportation inside the world
    FullLog,
}

impl HistoryMode {
    pub fn is_on(self) -> bool {
        self != HistoryMode::Off
    }
}

/// Validated job configuration
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub receipt_file: PathBuf,
    pub gdml_file: PathBuf,
    pub physics_list: String,
    pub thermal_neutron_scattering: bool,
    pub primaries_file: PathBuf,
    pub primaries_format: PrimariesFormat,
    pub deposition_file: PathBuf,
    pub monitors_file: Option<PathBuf>,
    pub sensitive_volumes: Vec<VolumePattern>,
    pub commands: Vec<String>,
    pub seed: i64,
    pub particles: Vec<ParticleDeclaration>,
    pub materials: Vec<String>,
    pub material_rebuilds: Vec<MaterialRebuild>,
    pub step_limits: Vec<StepLimit>,
    pub output_format: OutputFormat,
    pub exit_particles: Option<ExitParticlesConfig>,
    pub num_events: u64,
    pub history: HistoryMode,
    pub tracks_file: Option<PathBuf>,
    /// Significant digits for text output
    pub precision: usize,
    pub monitors: Vec<MonitorConfig>,
    /// Non-fatal findings surfaced in the receipt
    pub warnings: Vec<String>,
    /// SHA-256 of the raw document text
    pub fingerprint: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Receipt path of a document that may be otherwise invalid
///
/// Lets the driver report a validation failure to the operator's receipt.
pub fn receipt_path_of(text: &str) -> Option<PathBuf> {
    let value: Value = serde_json::from_str(text).ok()?;
    value
        .get("File_Receipt")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

impl JobConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value, text)
    }

    /// Validate an already-parsed document; `raw_text` feeds the fingerprint
    pub fn from_value(value: Value, raw_text: &str) -> Result<Self, ConfigError> {
        let raw: RawJobConfig = serde_json::from_value(value)?;
        let mut warnings = Vec::new();

        let receipt_file = non_empty(raw.receipt_file).ok_or(ConfigError::MissingReceiptFile)?;
        let gdml_file = non_empty(raw.gdml).ok_or(ConfigError::MissingGeometry)?;
        let physics_list = non_empty(raw.physics_list).ok_or(ConfigError::MissingPhysicsList)?;

        let primaries_format = match (raw.primaries_by_name, raw.primaries_binary) {
            (true, true) => PrimariesFormat::Binary,
            (true, false) => PrimariesFormat::TextNamed,
            (false, _) => PrimariesFormat::TextIndexed,
        };
        let primaries_file = non_empty(raw.primaries_file).ok_or(ConfigError::MissingPrimariesFile)?;
        let deposition_file =
            non_empty(raw.deposition_file).ok_or(ConfigError::MissingDepositionFile)?;
        let monitors_file = non_empty(raw.monitors_file).map(PathBuf::from);

        if raw.sensitive_volumes.is_empty() {
            warnings.push("Sensitive volumes are not provided in the configuration file!".to_string());
        }
        let sensitive_volumes = raw.sensitive_volumes.into_iter().map(VolumePattern).collect();

        let seed = parse_seed(raw.seed.as_ref())?;

        if raw.particles.is_empty() {
            return Err(ConfigError::MissingParticles);
        }
        let particles = raw
            .particles
            .iter()
            .map(ParticleDeclaration::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        if raw.materials.is_empty() {
            return Err(ConfigError::MissingMaterials);
        }

        let material_rebuilds = raw
            .materials_to_rebuild
            .iter()
            .map(|entry| match entry.as_array() {
                Some(pair) if pair.len() >= 2 => Ok(MaterialRebuild {
                    original: pair[0].as_str().unwrap_or_default().to_string(),
                    standard: pair[1].as_str().unwrap_or_default().to_string(),
                }),
                _ => Err(ConfigError::BadMaterialRebuild),
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Short entries are skipped
        let step_limits = raw
            .step_limits
            .iter()
            .filter_map(|entry| {
                let pair = entry.as_array().filter(|p| p.len() > 1)?;
                Some(StepLimit {
                    volume: pair[0].as_str().unwrap_or_default().to_string(),
                    max_step: pair[1].as_f64().unwrap_or(0.0),
                })
            })
            .collect();

        let exit_particles = match raw.exit_particles {
            Some(exit) if exit.enabled => {
                if exit.file_name.is_empty() {
                    return Err(ConfigError::MissingExitFile);
                }
                Some(ExitParticlesConfig {
                    file: PathBuf::from(exit.file_name),
                    format: OutputFormat::from_binary_flag(exit.use_binary),
                    volume_name: exit.volume_name,
                    time_window: exit
                        .use_time_window
                        .then_some((exit.time_from, exit.time_to)),
                    kill_on_exit: exit.stop_track,
                })
            }
            _ => None,
        };

        let tracks_file = non_empty(raw.tracks_file).map(PathBuf::from);
        if (raw.build_tracks || raw.log_history) && tracks_file.is_none() {
            return Err(ConfigError::MissingTracksFile);
        }
        let history = if raw.log_history {
            HistoryMode::FullLog
        } else if raw.build_tracks && raw.max_tracks > 0 {
            HistoryMode::BoundedTracks(raw.max_tracks.min(u32::MAX as i64) as u32)
        } else {
            HistoryMode::Off
        };

        let precision = if raw.precision == 0 {
            DEFAULT_PRECISION
        } else {
            raw.precision
        };

        let monitors = if monitors_file.is_some() {
            raw.monitors
                .into_iter()
                .map(|entry| {
                    let monitor: MonitorConfig = serde_json::from_value(entry)?;
                    monitor.validate()?;
                    Ok(monitor)
                })
                .collect::<Result<Vec<_>, ConfigError>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            receipt_file: PathBuf::from(receipt_file),
            gdml_file: PathBuf::from(gdml_file),
            physics_list,
            thermal_neutron_scattering: raw.thermal_scattering,
            primaries_file: PathBuf::from(primaries_file),
            primaries_format,
            deposition_file: PathBuf::from(deposition_file),
            monitors_file,
            sensitive_volumes,
            commands: raw.commands,
            seed,
            particles,
            materials: raw.materials,
            material_rebuilds,
            step_limits,
            output_format: OutputFormat::from_binary_flag(raw.binary_output),
            exit_particles,
            num_events: raw.num_events,
            history,
            tracks_file,
            precision,
            monitors,
            warnings,
            fingerprint: fingerprint(raw_text),
        })
    }

    /// True when some monitor needs direct/indirect bookkeeping
    pub fn monitors_require_stepping(&self) -> bool {
        self.monitors
            .iter()
            .any(MonitorConfig::requires_interaction_tracking)
    }
}

fn parse_seed(value: Option<&Value>) -> Result<i64, ConfigError> {
    let value = value.ok_or(ConfigError::MissingSeed)?;
    if !value.is_number() {
        return Err(ConfigError::InvalidSeed);
    }
    let seed = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .ok_or(ConfigError::InvalidSeed)?;
    if seed == 0 {
        return Err(ConfigError::ZeroSeed);
    }
    Ok(seed)
}

fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
