use super::{write_failed, Recorders};
use crate::engine::{BoundaryCrossing, MonitorProcessor, TrackControl};
use crate::monitor::CrossingVerdict;
use crate::session::SessionError;
use crate::wire::StepRecord;
use tracing::debug;

/// History label of a track stopped by a monitor
const MONITOR_STOP_LABEL: &str = "MonitorStop";

impl MonitorProcessor for Recorders<'_> {
    fn process_monitor_crossing(
        &mut self,
        monitor: usize,
        crossing: &BoundaryCrossing,
    ) -> Result<TrackControl, SessionError> {
        let ctx = &mut *self.ctx;
        let indirect = ctx.indirect_tracks.contains(&crossing.track_id);
        let target = ctx
            .monitors
            .get_mut(monitor)
            .ok_or(SessionError::UnknownMonitor(monitor))?;

        match target.process_crossing(crossing, indirect) {
            CrossingVerdict::Recorded { kill: true } => {
                debug!(
                    monitor = target.name(),
                    track = crossing.track_id,
                    "monitor stopped track"
                );
                if ctx.history_mode.is_on() {
                    ctx.history
                        .write_step(&StepRecord {
                            process: MONITOR_STOP_LABEL.to_string(),
                            position: crossing.position,
                            time: crossing.time,
                            kinetic_energy: crossing.kinetic_energy,
                            deposit: 0.0,
                            destination: None,
                            secondaries: Vec::new(),
                        })
                        .map_err(write_failed("history"))?;
                    // the engine still reports the killed step once more
                    ctx.skip_next_step = true;
                }
                Ok(TrackControl::Kill)
            }
            _ => Ok(TrackControl::Continue),
        }
    }
}
