use super::{write_failed, Recorders};
use crate::engine::{TrackInfo, TrackProcessor};
use crate::session::SessionError;
use crate::wire::TrackStartRecord;

impl TrackProcessor for Recorders<'_> {
    fn pre_tracking_action(&mut self, track: &TrackInfo) -> Result<(), SessionError> {
        let ctx = &mut *self.ctx;
        if !ctx.history_mode.is_on() {
            return Ok(());
        }

        let material_index = ctx.materials.find(&track.volume.material)? as i32;
        ctx.history
            .write_track_start(&TrackStartRecord {
                track_id: track.track_id,
                parent_id: track.parent_id,
                particle: track.particle.clone(),
                position: track.position,
                time: track.time,
                kinetic_energy: track.kinetic_energy,
                material_index,
                volume_name: track.volume.name.clone(),
                copy_number: track.volume.copy_number,
            })
            .map_err(write_failed("history"))
    }

    fn post_tracking_action(&mut self, _track_id: i32) -> Result<(), SessionError> {
        self.ctx.finish_track();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{finish_and_read, text_context};
    use super::*;
    use crate::config::HistoryMode;
    use crate::engine::VolumeRef;
    use crate::models::EventId;

    fn track(track_id: i32, parent_id: i32) -> TrackInfo {
        TrackInfo {
            track_id,
            parent_id,
            particle: "e-".to_string(),
            position: [0.0, 1.0, 2.0],
            time: 0.5,
            kinetic_energy: 300.0,
            volume: VolumeRef {
                name: "Det".to_string(),
                copy_number: 0,
                material: "Water".to_string(),
            },
        }
    }

    #[test]
    fn test_track_budget_stops_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = text_context(dir.path(), HistoryMode::BoundedTracks(1));
        ctx.begin_event(&EventId::from_label("#0")).unwrap();
        {
            let mut recorders = Recorders::new(&mut ctx);
            recorders.pre_tracking_action(&track(1, 0)).unwrap();
            recorders.post_tracking_action(1).unwrap();
            recorders.pre_tracking_action(&track(2, 1)).unwrap();
            recorders.post_tracking_action(2).unwrap();
        }
        assert_eq!(ctx.history_mode(), HistoryMode::Off);
        // later events carry no history marker
        ctx.begin_event(&EventId::from_label("#1")).unwrap();
        assert_eq!(
            finish_and_read(&mut ctx, dir.path(), "history.txt"),
            "#0\n>1 0 e- 0 1 2 0.5 300 0 Det 0\n"
        );
    }

    #[test]
    fn test_no_track_records_when_off() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = text_context(dir.path(), HistoryMode::Off);
        let mut recorders = Recorders::new(&mut ctx);
        recorders.pre_tracking_action(&track(1, 0)).unwrap();
        recorders.post_tracking_action(1).unwrap();
    }
}
