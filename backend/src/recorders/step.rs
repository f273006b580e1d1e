use super::{write_failed, Recorders};
use crate::config::HistoryMode;
use crate::engine::{StepInfo, StepProcess, StepProcessor, TrackControl};
use crate::session::SessionError;
use crate::wire::{Destination, ParticleEntry, StepRecord};
use tracing::debug;

/// Process label of a transportation step inside the world
const TRANSPORT_LABEL: &str = "T";
/// Process label of a step leaving the world
const OUT_OF_WORLD_LABEL: &str = "O";
/// Process label when the engine names no process
const UNKNOWN_PROCESS_LABEL: &str = "?";

impl Recorders<'_> {
    /// Export the step if it leaves the exit volume; returns whether to kill
    fn record_exit(&mut self, step: &StepInfo) -> Result<bool, SessionError> {
        let ctx = &mut *self.ctx;
        let Some(filter) = &ctx.exit_filter else {
            return Ok(false);
        };
        if !step.leaves_volume || step.pre_volume != filter.volume {
            return Ok(false);
        }
        if !filter.accepts_time(step.post.time) {
            return Ok(false);
        }

        let kill = filter.kill;
        ctx.exit
            .write_particle(&ParticleEntry {
                name: step.particle.clone(),
                energy: step.post.kinetic_energy,
                position: step.post.position,
                direction: step.post.direction,
                time: step.post.time,
            })
            .map_err(write_failed("exit particle"))?;
        if kill {
            debug!(track = step.track_id, volume = %step.pre_volume, "exit volume stopped track");
        }
        Ok(kill)
    }
}

impl StepProcessor for Recorders<'_> {
    fn user_stepping_action(&mut self, step: &StepInfo) -> Result<TrackControl, SessionError> {
        let secondaries: Vec<i32> = (0..step.num_secondaries)
            .map(|_| self.ctx.track_ids.issue())
            .collect();

        if self.ctx.monitors_require_stepping {
            if let StepProcess::Interaction(_) = step.process {
                self.ctx.indirect_tracks.insert(step.track_id);
            }
        }

        let control = if self.record_exit(step)? {
            TrackControl::Kill
        } else {
            TrackControl::Continue
        };

        let ctx = &mut *self.ctx;
        if !ctx.history_mode.is_on() {
            return Ok(control);
        }
        if ctx.skip_next_step {
            ctx.skip_next_step = false;
            return Ok(control);
        }

        let (process, destination) = match &step.process {
            StepProcess::Transportation => match &step.post_volume {
                None => (OUT_OF_WORLD_LABEL, None),
                Some(_) if ctx.history_mode != HistoryMode::FullLog => return Ok(control),
                Some(volume) => (
                    TRANSPORT_LABEL,
                    Some(Destination {
                        material_index: ctx.materials.find(&volume.material)? as i32,
                        volume_name: volume.name.clone(),
                        copy_number: volume.copy_number,
                    }),
                ),
            },
            StepProcess::Interaction(name) => (name.as_str(), None),
            StepProcess::Unknown => (UNKNOWN_PROCESS_LABEL, None),
        };

        ctx.history
            .write_step(&StepRecord {
                process: process.to_string(),
                position: step.post.position,
                time: step.post.time,
                kinetic_energy: step.post.kinetic_energy,
                deposit: step.energy_deposit,
                destination,
                secondaries,
            })
            .map_err(write_failed("history"))?;
        Ok(control)
    }
}
