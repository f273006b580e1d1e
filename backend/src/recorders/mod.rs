//! Engine callback adapters
//!
//! [`Recorders`] borrows the [`SessionContext`] for one event and implements
//! every callback trait of [`crate::engine`]. Each callback kind lives in
//! its own file.
//!
//! # Critical Invariants
//!
//! 1. Secondary track ids are claimed on every step, in the order the engine
//!    reports steps, whether or not the step is written anywhere.
//! 2. Only a monitor stopping a track arms the one-shot step skip; exit-volume
//!    kills never do.

mod crossing;
mod hit;
mod step;
mod track;

use crate::session::{SessionContext, SessionError};

pub struct Recorders<'a> {
    ctx: &'a mut SessionContext,
}

impl<'a> Recorders<'a> {
    pub fn new(ctx: &'a mut SessionContext) -> Self {
        Self { ctx }
    }
}

fn write_failed(stream: &str) -> impl FnOnce(std::io::Error) -> SessionError + '_ {
    move |source| SessionError::Io {
        context: format!("Cannot write to the {} stream", stream),
        source,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::HistoryMode;
    use crate::models::{MaterialRegistry, ParticleHandle, ParticleRegistry};
    use crate::output::{DepositionWriter, ExitWriter, HistoryWriter};
    use crate::session::SessionContext;
    use crate::wire::OutputFormat;
    use std::path::Path;

    /// Context with text streams in `dir`, particles `gamma`, `e-` and
    /// materials `Water`, `Lead`
    pub fn text_context(dir: &Path, history_mode: HistoryMode) -> SessionContext {
        let mut particles = ParticleRegistry::new();
        particles.register("gamma", ParticleHandle(1));
        particles.register("e-", ParticleHandle(2));

        let history = if history_mode.is_on() {
            HistoryWriter::create(&dir.join("history.txt"), OutputFormat::Text, 6).unwrap()
        } else {
            HistoryWriter::disabled()
        };

        SessionContext {
            particles,
            materials: MaterialRegistry::from_names(&["Water", "Lead"]),
            deposition: DepositionWriter::create(&dir.join("deposition.txt"), OutputFormat::Text, 6)
                .unwrap(),
            history,
            exit: ExitWriter::create(&dir.join("exit.txt"), OutputFormat::Text, 6).unwrap(),
            history_mode,
            ..Default::default()
        }
    }

    /// Finish all streams and read one of them back
    pub fn finish_and_read(ctx: &mut SessionContext, dir: &Path, file: &str) -> String {
        ctx.deposition.finish().unwrap();
        ctx.history.finish().unwrap();
        ctx.exit.finish().unwrap();
        std::fs::read_to_string(dir.join(file)).unwrap_or_default()
    }
}
