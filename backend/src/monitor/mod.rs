//! Monitor histogram aggregation
//!
//! A monitor watches particles crossing into one logical volume and
//! histograms the crossings it accepts: time, angle to the surface normal,
//! kinetic energy and local XY position.
//!
//! # Critical Invariants
//!
//! 1. Acceptance is checked in the order primary/secondary, direct/indirect,
//!    upper/lower face; a rejected crossing leaves every histogram untouched.
//! 2. An accepted crossing adds exactly one entry to each of the four
//!    histograms.
//! 3. Histograms only accumulate during a run.

pub mod histogram;

pub use histogram::{Histogram1D, Histogram2D};

use crate::config::{MonitorConfig, MonitorShape};
use crate::engine::BoundaryCrossing;
use crate::models::ParticleHandle;
use serde::Serialize;

/// keV per unit for `energyUnits` 0..=3 (meV, eV, keV, MeV)
const ENERGY_UNIT_KEV: [f64; 4] = [1e-6, 1e-3, 1.0, 1e3];

/// Result of offering a crossing to a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingVerdict {
    /// Not a boundary crossing by the monitored particle
    NotApplicable,
    /// Failed an acceptance predicate
    Rejected,
    /// Histogrammed; `kill` asks for the track to be stopped
    Recorded { kill: bool },
}

#[derive(Debug, Clone)]
pub struct Monitor {
    config: MonitorConfig,
    particle: Option<ParticleHandle>,
    energy_unit_kev: f64,
    time: Histogram1D,
    angle: Histogram1D,
    energy: Histogram1D,
    spatial: Histogram2D,
}

impl Monitor {
    /// Build an empty monitor
    ///
    /// `particle` is the resolved `ParticleName`, `None` to accept any
    /// particle. The configuration must have passed
    /// [`MonitorConfig::validate`].
    pub fn new(config: MonitorConfig, particle: Option<ParticleHandle>) -> Self {
        let (x_half, y_half) = match config.shape() {
            MonitorShape::Rectangular => (config.size1, config.size2),
            MonitorShape::Round => (config.size1, config.size1),
        };
        let energy_unit_kev = ENERGY_UNIT_KEV
            .get(config.energy_units as usize)
            .copied()
            .unwrap_or(1.0);

        Self {
            time: Histogram1D::new(config.time_bins, config.time_from, config.time_to),
            angle: Histogram1D::new(config.angle_bins, config.angle_from, config.angle_to),
            energy: Histogram1D::new(config.energy_bins, config.energy_from, config.energy_to),
            spatial: Histogram2D::new(
                config.xbins,
                (-x_half, x_half),
                config.ybins,
                (-y_half, y_half),
            ),
            energy_unit_kev,
            particle,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// True when this monitor needs to know whether a track interacted
    pub fn requires_stepping(&self) -> bool {
        self.config.requires_interaction_tracking()
    }

    /// Offer one crossing; `indirect` tells whether the track already had a
    /// non-transport interaction
    pub fn process_crossing(&mut self, crossing: &BoundaryCrossing, indirect: bool) -> CrossingVerdict {
        if !crossing.at_boundary {
            return CrossingVerdict::NotApplicable;
        }
        if self.particle.is_some_and(|p| p != crossing.particle) {
            return CrossingVerdict::NotApplicable;
        }

        let config = &self.config;
        let primary = crossing.parent_id == 0;
        if primary && !config.accept_primary || !primary && !config.accept_secondary {
            return CrossingVerdict::Rejected;
        }
        if indirect && !config.accept_indirect || !indirect && !config.accept_direct {
            return CrossingVerdict::Rejected;
        }

        let local = crossing.frame.to_local_point(&crossing.position);
        let upper = local[2] > 0.0;
        if upper && !config.accept_upper || !upper && !config.accept_lower {
            return CrossingVerdict::Rejected;
        }

        self.spatial.fill(local[0], local[1]);
        self.time.fill(crossing.time);
        self.energy.fill(crossing.kinetic_energy / self.energy_unit_kev);
        let axis = crossing.frame.to_local_axis(&crossing.direction);
        self.angle.fill(angle_to_normal(&axis));

        CrossingVerdict::Recorded {
            kill: self.config.stop_tracking,
        }
    }

    pub fn time(&self) -> &Histogram1D {
        &self.time
    }

    pub fn angle(&self) -> &Histogram1D {
        &self.angle
    }

    pub fn energy(&self) -> &Histogram1D {
        &self.energy
    }

    pub fn spatial(&self) -> &Histogram2D {
        &self.spatial
    }

    pub fn report(&self) -> MonitorReport<'_> {
        MonitorReport {
            name: &self.config.name,
            time: &self.time,
            angle: &self.angle,
            energy: &self.energy,
            spatial: SpatialReport {
                size1: self.config.size1,
                size2: self.config.size2,
                xbins: self.config.xbins,
                ybins: self.config.ybins,
                data: self.spatial.data(),
            },
        }
    }
}

/// Angle between a direction and the local z axis, folded into [0°, 90°]
fn angle_to_normal(direction: &[f64; 3]) -> f64 {
    let norm = direction.iter().map(|c| c * c).sum::<f64>().sqrt();
    if norm == 0.0 {
        return 0.0;
    }
    let cos = (direction[2] / norm).clamp(-1.0, 1.0);
    let angle = cos.acos().to_degrees();
    if angle > 90.0 {
        180.0 - angle
    } else {
        angle
    }
}

/// One entry of the monitors report
#[derive(Debug, Serialize)]
pub struct MonitorReport<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "Time")]
    pub time: &'a Histogram1D,
    #[serde(rename = "Angle")]
    pub angle: &'a Histogram1D,
    #[serde(rename = "Energy")]
    pub energy: &'a Histogram1D,
    #[serde(rename = "Spatial")]
    pub spatial: SpatialReport<'a>,
}

#[derive(Debug, Serialize)]
pub struct SpatialReport<'a> {
    pub size1: f64,
    pub size2: f64,
    pub xbins: usize,
    pub ybins: usize,
    pub data: &'a [Vec<f64>],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalFrame;

    fn crossing(parent_id: i32, z: f64) -> BoundaryCrossing {
        BoundaryCrossing {
            track_id: 1,
            parent_id,
            particle: ParticleHandle(1),
            at_boundary: true,
            position: [1.0, -1.0, z],
            direction: [0.0, 0.0, -1.0],
            time: 5.0,
            kinetic_energy: 50.0,
            frame: LocalFrame::default(),
        }
    }

    fn config() -> MonitorConfig {
        MonitorConfig {
            name: "Mon".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_angle_folding() {
        assert_eq!(angle_to_normal(&[0.0, 0.0, 1.0]), 0.0);
        assert_eq!(angle_to_normal(&[0.0, 0.0, -1.0]), 0.0);
        assert!((angle_to_normal(&[1.0, 0.0, 1.0]) - 45.0).abs() < 1e-9);
        assert!((angle_to_normal(&[1.0, 0.0, -1.0]) - 45.0).abs() < 1e-9);
        assert!((angle_to_normal(&[3.0, 0.0, 0.0]) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_recorded_crossing_fills_every_histogram() {
        let mut monitor = Monitor::new(config(), None);
        let verdict = monitor.process_crossing(&crossing(0, 0.5), false);
        assert_eq!(verdict, CrossingVerdict::Recorded { kill: false });
        assert_eq!(monitor.time().entries(), 1);
        assert_eq!(monitor.angle().entries(), 1);
        assert_eq!(monitor.energy().entries(), 1);
        assert_eq!(monitor.spatial().entries(), 1);
        // 50 keV into [0, 100) keV with 10 bins
        assert_eq!(monitor.energy().data()[6], 1.0);
    }

    #[test]
    fn test_energy_units_scale_bins() {
        let mut cfg = config();
        cfg.energy_units = 3; // MeV
        cfg.energy_from = 0.0;
        cfg.energy_to = 1.0;
        let mut monitor = Monitor::new(cfg, None);
        monitor.process_crossing(&crossing(0, 0.5), false);
        // 50 keV = 0.05 MeV, first bin of ten
        assert_eq!(monitor.energy().data()[1], 1.0);
    }

    #[test]
    fn test_face_filter() {
        let mut cfg = config();
        cfg.accept_lower = false;
        let mut monitor = Monitor::new(cfg, None);
        assert_eq!(
            monitor.process_crossing(&crossing(0, -0.5), false),
            CrossingVerdict::Rejected
        );
        assert_eq!(monitor.time().entries(), 0);
        assert!(matches!(
            monitor.process_crossing(&crossing(0, 0.5), false),
            CrossingVerdict::Recorded { .. }
        ));
    }

    #[test]
    fn test_direct_filter() {
        let mut cfg = config();
        cfg.accept_indirect = false;
        let mut monitor = Monitor::new(cfg, None);
        assert!(monitor.requires_stepping());
        assert_eq!(
            monitor.process_crossing(&crossing(0, 0.5), true),
            CrossingVerdict::Rejected
        );
    }

    #[test]
    fn test_particle_and_boundary_gate() {
        let mut monitor = Monitor::new(config(), Some(ParticleHandle(2)));
        assert_eq!(
            monitor.process_crossing(&crossing(0, 0.5), false),
            CrossingVerdict::NotApplicable
        );

        let mut monitor = Monitor::new(config(), None);
        let mut inside = crossing(0, 0.5);
        inside.at_boundary = false;
        assert_eq!(
            monitor.process_crossing(&inside, false),
            CrossingVerdict::NotApplicable
        );
    }

    #[test]
    fn test_stop_tracking_reported() {
        let mut cfg = config();
        cfg.stop_tracking = true;
        let mut monitor = Monitor::new(cfg, None);
        assert_eq!(
            monitor.process_crossing(&crossing(0, 0.5), false),
            CrossingVerdict::Recorded { kill: true }
        );
    }

    #[test]
    fn test_report_shape() {
        let mut monitor = Monitor::new(config(), None);
        monitor.process_crossing(&crossing(0, 0.5), false);
        let json = serde_json::to_value(monitor.report()).unwrap();
        assert_eq!(json["Name"], "Mon");
        assert_eq!(json["Time"]["bins"], 10);
        assert_eq!(json["Time"]["data"].as_array().unwrap().len(), 12);
        assert_eq!(json["Angle"]["to"], 90.0);
        assert_eq!(json["Spatial"]["data"].as_array().unwrap().len(), 12);
        assert!(json["Time"].get("entries").is_none());
    }
}
