use super::{write_failed, Recorders};
use crate::engine::{HitInfo, HitProcessor};
use crate::models::UNREGISTERED_INDEX;
use crate::session::SessionError;
use crate::wire::DepositionRecord;

impl HitProcessor for Recorders<'_> {
    fn process_hit(&mut self, hit: &HitInfo) -> Result<bool, SessionError> {
        if hit.energy_deposit == 0.0 {
            return Ok(false);
        }

        let ctx = &mut *self.ctx;
        let particle_index = ctx.particles.wire_index(&hit.particle);
        let material_index = ctx.materials.find(&hit.material)? as i32;

        ctx.add_deposit(particle_index != UNREGISTERED_INDEX, hit.energy_deposit);
        ctx.deposition
            .write_deposition(&DepositionRecord {
                particle_index,
                material_index,
                energy: hit.energy_deposit,
                position: hit.position,
                time: hit.time,
            })
            .map_err(write_failed("deposition"))?;
        Ok(true)
    }
}
