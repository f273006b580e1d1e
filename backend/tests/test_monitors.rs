//! Monitor Tests
//!
//! Histogram conservation, acceptance predicates, and monitors run inside a
//! full job.

mod common;

use common::*;
use g4ants_session_core::config::MonitorConfig;
use g4ants_session_core::engine::{LocalFrame, MonitorProcessor, StepProcess, StepProcessor};
use g4ants_session_core::monitor::{CrossingVerdict, Histogram1D, Histogram2D, Monitor};
use g4ants_session_core::run_job;
use proptest::prelude::*;
use serde_json::{json, Value};

// ============================================================================
// Test Helpers
// ============================================================================

fn monitor(config: MonitorConfig) -> Monitor {
    config.validate().expect("valid monitor config");
    Monitor::new(config, Some(GAMMA))
}

fn named(name: &str) -> MonitorConfig {
    MonitorConfig {
        name: name.to_string(),
        particle_name: "gamma".to_string(),
        ..Default::default()
    }
}

fn histogram_sum(report: &Value, key: &str) -> f64 {
    report[key]["data"]
        .as_array()
        .expect("histogram data")
        .iter()
        .filter_map(Value::as_f64)
        .sum()
}

fn spatial_sum(report: &Value) -> f64 {
    report["Spatial"]["data"]
        .as_array()
        .expect("spatial rows")
        .iter()
        .flat_map(|row| row.as_array().cloned().unwrap_or_default())
        .filter_map(|v| v.as_f64())
        .sum()
}

// ============================================================================
// Histogram properties
// ============================================================================

proptest! {
    #[test]
    fn histogram_counts_are_conserved(
        bins in 1usize..50,
        from in -1e3f64..1e3,
        width in 1e-3f64..1e4,
        values in prop::collection::vec(prop::num::f64::ANY, 0..200),
    ) {
        let mut h = Histogram1D::new(bins, from, from + width);
        for v in &values {
            h.fill(*v);
        }
        prop_assert_eq!(h.entries(), values.len() as u64);
        prop_assert_eq!(h.data().iter().sum::<f64>(), values.len() as f64);
    }

    #[test]
    fn histogram2d_counts_are_conserved(
        points in prop::collection::vec((-200.0f64..200.0, -200.0f64..200.0), 0..100),
    ) {
        let mut h = Histogram2D::new(10, (-100.0, 100.0), 5, (-50.0, 50.0));
        for (x, y) in &points {
            h.fill(*x, *y);
        }
        prop_assert_eq!(h.entries(), points.len() as u64);
        prop_assert_eq!(h.total(), points.len() as f64);
    }

    #[test]
    fn in_range_values_land_in_their_bin(bin in 0usize..20, offset in 0.0f64..0.99) {
        let mut h = Histogram1D::new(20, 0.0, 20.0);
        h.fill(bin as f64 + offset);
        prop_assert_eq!(h.data()[bin + 1], 1.0);
    }
}

// ============================================================================
// Acceptance predicates
// ============================================================================

#[test]
fn test_secondary_rejected_when_primaries_only() {
    let mut mon = monitor(MonitorConfig {
        accept_secondary: false,
        ..named("Mon")
    });

    let verdict = mon.process_crossing(&crossing(5, 1, GAMMA), false);
    assert_eq!(verdict, CrossingVerdict::Rejected);
    assert_eq!(mon.time().entries(), 0);
    assert_eq!(mon.spatial().entries(), 0);

    let verdict = mon.process_crossing(&crossing(1, 0, GAMMA), false);
    assert_eq!(verdict, CrossingVerdict::Recorded { kill: false });
    for h in [mon.time(), mon.angle(), mon.energy()] {
        assert_eq!(h.entries(), 1);
    }
    assert_eq!(mon.spatial().total(), 1.0);
}

#[test]
fn test_other_particles_are_not_applicable() {
    let mut mon = monitor(named("Mon"));
    assert_eq!(
        mon.process_crossing(&crossing(1, 0, ELECTRON), false),
        CrossingVerdict::NotApplicable
    );

    let mut inside = crossing(1, 0, GAMMA);
    inside.at_boundary = false;
    assert_eq!(mon.process_crossing(&inside, false), CrossingVerdict::NotApplicable);
    assert_eq!(mon.time().entries(), 0);
}

#[test]
fn test_face_selection_uses_local_frame() {
    let mut mon = monitor(MonitorConfig {
        accept_lower: false,
        ..named("Mon")
    });

    // monitor centre 2 mm above the crossing point: local z = -1
    let mut below = crossing(1, 0, GAMMA);
    below.frame = LocalFrame {
        translation: [0.0, 0.0, -2.0],
        ..LocalFrame::default()
    };
    assert_eq!(mon.process_crossing(&below, false), CrossingVerdict::Rejected);
    assert_eq!(
        mon.process_crossing(&crossing(1, 0, GAMMA), false),
        CrossingVerdict::Recorded { kill: false }
    );
}

#[test]
fn test_indirect_tracks_filtered() {
    let mut mon = monitor(MonitorConfig {
        accept_indirect: false,
        ..named("Mon")
    });
    assert!(mon.requires_stepping());
    assert_eq!(mon.process_crossing(&crossing(1, 0, GAMMA), true), CrossingVerdict::Rejected);
    assert_eq!(
        mon.process_crossing(&crossing(1, 0, GAMMA), false),
        CrossingVerdict::Recorded { kill: false }
    );
}

#[test]
fn test_energy_units_and_angle() {
    let mut mon = monitor(MonitorConfig {
        energy_units: 3,
        energy_bins: 10,
        energy_from: 0.0,
        energy_to: 1.0,
        angle_bins: 9,
        ..named("Mon")
    });

    let mut c = crossing(1, 0, GAMMA);
    c.kinetic_energy = 250.0; // 0.25 MeV
    c.direction = [1.0, 0.0, 1.0]; // 45 degrees off the normal
    mon.process_crossing(&c, false);

    assert_eq!(mon.energy().data()[3], 1.0);
    assert_eq!(mon.angle().data()[5], 1.0);
}

#[test]
fn test_round_monitor_spatial_uses_radius() {
    let mut mon = monitor(MonitorConfig {
        shape: 1,
        size1: 10.0,
        xbins: 2,
        ybins: 2,
        ..named("Round")
    });
    let mut c = crossing(1, 0, GAMMA);
    c.position = [5.0, -5.0, 1.0];
    mon.process_crossing(&c, false);

    // row y = -5 is the first real row, column x = 5 the second real column
    assert_eq!(mon.spatial().data()[1][2], 1.0);
}

// ============================================================================
// Scenario C: monitors inside a job
// ============================================================================

fn monitor_job(monitor: Value) -> (JobFixture, std::path::PathBuf) {
    let job = JobFixture::new();
    job.write("primaries.txt", "#0\n0 1000 0 0 0 0 0 1 0\n#end\n");
    let mut config = job.base_config();
    config["File_Monitors"] = json!(job.path("monitors.json"));
    config["Monitors"] = json!([monitor]);
    let path = job.write_config(&config);
    (job, path)
}

#[test]
fn test_primary_only_monitor_in_job() {
    let (job, config) = monitor_job(json!({
        "Name": "Mon",
        "ParticleName": "gamma",
        "bPrimary": true,
        "bSecondary": false
    }));

    let engine = ScriptedEngine::new(&["Det", "Mon"]).with_script(|_, _, callbacks| {
        callbacks.process_monitor_crossing(0, &crossing(4, 1, GAMMA))?;
        callbacks.process_monitor_crossing(0, &crossing(1, 0, GAMMA))?;
        Ok(())
    });
    let receipt = run_job(&config, engine);
    assert!(receipt.success, "{:?}", receipt.error);

    let report: Value = serde_json::from_str(&job.read("monitors.json")).unwrap();
    let mon = &report[0];
    for key in ["Time", "Angle", "Energy"] {
        assert_eq!(histogram_sum(mon, key), 1.0, "{} histogram", key);
    }
    assert_eq!(spatial_sum(mon), 1.0);
    assert_eq!(mon["Time"]["bins"], json!(10));
    assert_eq!(mon["Spatial"]["size1"], json!(100.0));
}

#[test]
fn test_interaction_marks_track_indirect_in_job() {
    let (job, config) = monitor_job(json!({
        "Name": "Mon",
        "ParticleName": "",
        "bIndirect": false
    }));

    let engine = ScriptedEngine::new(&["Det", "Mon"]).with_script(|_, _, callbacks| {
        callbacks.user_stepping_action(&step(1, StepProcess::Transportation, 0))?;
        callbacks.process_monitor_crossing(0, &crossing(1, 0, GAMMA))?;
        callbacks.user_stepping_action(&step(1, StepProcess::Interaction("compt".into()), 1))?;
        callbacks.process_monitor_crossing(0, &crossing(1, 0, GAMMA))?;
        callbacks.process_monitor_crossing(0, &crossing(2, 1, ELECTRON))?;
        Ok(())
    });
    let receipt = run_job(&config, engine);
    assert!(receipt.success, "{:?}", receipt.error);

    let report: Value = serde_json::from_str(&job.read("monitors.json")).unwrap();
    // first gamma crossing and the electron; the gamma after compt is indirect
    assert_eq!(histogram_sum(&report[0], "Time"), 2.0);
}

#[test]
fn test_monitor_particle_must_exist() {
    let (job, config) = monitor_job(json!({
        "Name": "Mon",
        "ParticleName": "tachyon"
    }));

    let receipt = run_job(&config, ScriptedEngine::new(&["Det", "Mon"]));
    assert!(!receipt.success);
    assert!(receipt.error.unwrap().contains("tachyon"));
}

#[test]
fn test_invalid_monitor_rejected_at_config() {
    let (job, config) = monitor_job(json!({
        "Name": "Mon",
        "timeBins": 0
    }));

    let receipt = run_job(&config, ScriptedEngine::new(&["Det", "Mon"]));
    assert!(!receipt.success);
    assert!(job.receipt()["Error"].as_str().unwrap().starts_with("Monitor 'Mon'"));
}
