//! Monitor configuration block
//!
//! One entry of the `Monitors` array. Keys follow the job-file names; absent
//! keys take the defaults below (acceptance flags default to accepting).

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Footprint of a monitor's spatial histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorShape {
    /// Half-widths `size1` (x) and `size2` (y)
    Rectangular,
    /// Radius `size1` for both axes
    Round,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Logical volume the monitor is bound to
    #[serde(rename = "Name")]
    pub name: String,

    /// Only this particle is recorded; empty means any particle
    #[serde(rename = "ParticleName")]
    pub particle_name: String,

    /// 0 = rectangular, 1 = round
    pub shape: u8,

    #[serde(rename = "bUpper")]
    pub accept_upper: bool,
    #[serde(rename = "bLower")]
    pub accept_lower: bool,
    #[serde(rename = "bPrimary")]
    pub accept_primary: bool,
    #[serde(rename = "bSecondary")]
    pub accept_secondary: bool,
    #[serde(rename = "bDirect")]
    pub accept_direct: bool,
    #[serde(rename = "bIndirect")]
    pub accept_indirect: bool,
    #[serde(rename = "bStopTracking")]
    pub stop_tracking: bool,

    /// Time histogram (ns)
    #[serde(rename = "timeBins")]
    pub time_bins: usize,
    #[serde(rename = "timeFrom")]
    pub time_from: f64,
    #[serde(rename = "timeTo")]
    pub time_to: f64,

    /// Angle-to-normal histogram (degrees)
    #[serde(rename = "angleBins")]
    pub angle_bins: usize,
    #[serde(rename = "angleFrom")]
    pub angle_from: f64,
    #[serde(rename = "angleTo")]
    pub angle_to: f64,

    /// Kinetic energy histogram, in `energy_units`
    #[serde(rename = "energyBins")]
    pub energy_bins: usize,
    #[serde(rename = "energyFrom")]
    pub energy_from: f64,
    #[serde(rename = "energyTo")]
    pub energy_to: f64,
    /// 0 = meV, 1 = eV, 2 = keV, 3 = MeV
    #[serde(rename = "energyUnits")]
    pub energy_units: u8,

    /// Spatial histogram (mm)
    pub xbins: usize,
    pub ybins: usize,
    pub size1: f64,
    pub size2: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            particle_name: String::new(),
            shape: 0,
            accept_upper: true,
            accept_lower: true,
            accept_primary: true,
            accept_secondary: true,
            accept_direct: true,
            accept_indirect: true,
            stop_tracking: false,
            time_bins: 10,
            time_from: 0.0,
            time_to: 1000.0,
            angle_bins: 90,
            angle_from: 0.0,
            angle_to: 90.0,
            energy_bins: 10,
            energy_from: 0.0,
            energy_to: 100.0,
            energy_units: 2,
            xbins: 10,
            ybins: 10,
            size1: 100.0,
            size2: 100.0,
        }
    }
}

impl MonitorConfig {
    pub fn shape(&self) -> MonitorShape {
        if self.shape == 1 {
            MonitorShape::Round
        } else {
            MonitorShape::Rectangular
        }
    }

    /// True when the monitor needs per-track direct/indirect bookkeeping
    pub fn requires_interaction_tracking(&self) -> bool {
        !self.accept_direct || !self.accept_indirect
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| ConfigError::InvalidMonitor {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(fail("monitor volume name is empty".to_string()));
        }
        if self.shape > 1 {
            return Err(fail(format!("unknown shape {}", self.shape)));
        }
        if self.energy_units > 3 {
            return Err(fail(format!("unknown energy units {}", self.energy_units)));
        }

        for (axis, bins, from, to) in [
            ("time", self.time_bins, self.time_from, self.time_to),
            ("angle", self.angle_bins, self.angle_from, self.angle_to),
            ("energy", self.energy_bins, self.energy_from, self.energy_to),
        ] {
            if bins == 0 {
                return Err(fail(format!("{} histogram has no bins", axis)));
            }
            if !(to > from) {
                return Err(fail(format!("{} range [{}, {}) is empty", axis, from, to)));
            }
        }

        if self.xbins == 0 || self.ybins == 0 {
            return Err(fail("spatial histogram has no bins".to_string()));
        }
        if !(self.size1 > 0.0) {
            return Err(fail("size1 must be positive".to_string()));
        }
        if self.shape() == MonitorShape::Rectangular && !(self.size2 > 0.0) {
            return Err(fail("size2 must be positive".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_keys_accept_everything() {
        let config: MonitorConfig = serde_json::from_str(r#"{"Name": "Mon"}"#).unwrap();
        assert!(config.accept_primary && config.accept_secondary);
        assert!(config.accept_direct && config.accept_indirect);
        assert!(config.accept_upper && config.accept_lower);
        assert!(!config.stop_tracking);
        assert!(!config.requires_interaction_tracking());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_job_file_keys() {
        let config: MonitorConfig = serde_json::from_str(
            r#"{"Name": "Mon", "ParticleName": "neutron", "shape": 1,
                "bPrimary": true, "bSecondary": false, "bIndirect": false,
                "energyUnits": 1, "energyBins": 5, "energyFrom": 1, "energyTo": 6}"#,
        )
        .unwrap();
        assert_eq!(config.particle_name, "neutron");
        assert_eq!(config.shape(), MonitorShape::Round);
        assert!(!config.accept_secondary);
        assert!(config.requires_interaction_tracking());
        assert_eq!(config.energy_units, 1);
        assert_eq!(config.energy_bins, 5);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let mut config = MonitorConfig {
            name: "Mon".to_string(),
            ..Default::default()
        };
        config.time_to = config.time_from;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMonitor { .. })
        ));

        let config = MonitorConfig {
            name: "Mon".to_string(),
            angle_bins: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            name: "Mon".to_string(),
            energy_units: 7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
