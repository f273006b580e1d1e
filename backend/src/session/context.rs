//! Per-job state shared with the recorders
//!
//! [`SessionContext`] owns everything the engine callbacks touch: registries,
//! output streams, monitors, the predicted track-id counter and the running
//! deposition totals. The coordinator lends it to the recorders for the
//! duration of one event.

use super::SessionError;
use crate::config::HistoryMode;
use crate::models::{EventId, MaterialRegistry, ParticleRegistry};
use crate::monitor::Monitor;
use crate::output::{DepositionWriter, ExitWriter, HistoryWriter};
use std::collections::HashSet;

/// Mirror of the engine's per-event track numbering
///
/// Track ids are handed out in creation order starting at 1, so the id a
/// secondary will receive is known when the step creating it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackIdPredictor {
    next: i32,
}

impl Default for TrackIdPredictor {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl TrackIdPredictor {
    pub fn reset(&mut self) {
        self.next = 1;
    }

    /// Claim the next id
    pub fn issue(&mut self) -> i32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn peek(&self) -> i32 {
        self.next
    }
}

/// Where and when particles leaving the exit volume are exported
#[derive(Debug, Clone, PartialEq)]
pub struct ExitFilter {
    pub volume: String,
    pub time_window: Option<(f64, f64)>,
    pub kill: bool,
}

impl ExitFilter {
    pub fn accepts_time(&self, time: f64) -> bool {
        match self.time_window {
            Some((from, to)) => time >= from && time <= to,
            None => true,
        }
    }
}

#[derive(Debug)]
pub struct SessionContext {
    pub(crate) particles: ParticleRegistry,
    pub(crate) materials: MaterialRegistry,
    pub(crate) deposition: DepositionWriter,
    pub(crate) history: HistoryWriter,
    pub(crate) exit: ExitWriter,
    pub(crate) monitors: Vec<Monitor>,
    pub(crate) history_mode: HistoryMode,
    pub(crate) track_ids: TrackIdPredictor,
    pub(crate) exit_filter: Option<ExitFilter>,
    /// Tracks that already had a non-transport interaction this event
    pub(crate) indirect_tracks: HashSet<i32>,
    pub(crate) monitors_require_stepping: bool,
    /// Set when a monitor stopped a track; the next step callback is dropped
    pub(crate) skip_next_step: bool,
    pub(crate) depo_registered: f64,
    pub(crate) depo_not_registered: f64,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            particles: ParticleRegistry::new(),
            materials: MaterialRegistry::new(),
            deposition: DepositionWriter::disabled(),
            history: HistoryWriter::disabled(),
            exit: ExitWriter::disabled(),
            monitors: Vec::new(),
            history_mode: HistoryMode::Off,
            track_ids: TrackIdPredictor::default(),
            exit_filter: None,
            indirect_tracks: HashSet::new(),
            monitors_require_stepping: false,
            skip_next_step: false,
            depo_registered: 0.0,
            depo_not_registered: 0.0,
        }
    }
}

impl SessionContext {
    /// Reset per-event bookkeeping and write the event's markers
    pub fn begin_event(&mut self, event: &EventId) -> Result<(), SessionError> {
        self.track_ids.reset();
        self.indirect_tracks.clear();
        self.skip_next_step = false;

        self.deposition.write_event_marker(event)?;
        if self.history_mode.is_on() {
            self.history.write_event_marker(event)?;
        }
        self.exit.write_event_marker(event)?;
        Ok(())
    }

    pub(crate) fn add_deposit(&mut self, registered: bool, energy: f64) {
        if registered {
            self.depo_registered += energy;
        } else {
            self.depo_not_registered += energy;
        }
    }

    pub(crate) fn reset_totals(&mut self) {
        self.depo_registered = 0.0;
        self.depo_not_registered = 0.0;
    }

    /// Count one finished track against a bounded history budget
    pub(crate) fn finish_track(&mut self) {
        if let HistoryMode::BoundedTracks(remaining) = self.history_mode {
            self.history_mode = if remaining <= 1 {
                HistoryMode::Off
            } else {
                HistoryMode::BoundedTracks(remaining - 1)
            };
        }
    }

    pub fn deposited_by_registered(&self) -> f64 {
        self.depo_registered
    }

    pub fn deposited_by_not_registered(&self) -> f64 {
        self.depo_not_registered
    }

    pub fn particles(&self) -> &ParticleRegistry {
        &self.particles
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn history_mode(&self) -> HistoryMode {
        self.history_mode
    }

    pub fn next_track_id(&self) -> i32 {
        self.track_ids.peek()
    }

    pub fn is_indirect(&self, track_id: i32) -> bool {
        self.indirect_tracks.contains(&track_id)
    }
}
