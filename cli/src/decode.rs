//! Binary-to-text conversion of recorded streams

use anyhow::{Context, Result};
use clap::ValueEnum;
use g4ants_session_core::wire::{
    write_event_marker, DepositionFrame, FrameReader, HistoryFrame, ParticleFrame, WireRecord,
};
use g4ants_session_core::{EventId, OutputFormat};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Layout of the binary file being decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StreamKind {
    Deposition,
    History,
    Exit,
    Primaries,
}

/// Decode `path` as a `kind` stream, writing the text form to `out`
///
/// Returns the number of event markers seen.
pub fn decode_file<W: Write>(
    kind: StreamKind,
    path: &Path,
    precision: usize,
    out: &mut W,
) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    decode_stream(kind, BufReader::new(file), precision, out)
        .with_context(|| format!("Cannot decode {}", path.display()))
}

pub fn decode_stream<R: BufRead, W: Write>(
    kind: StreamKind,
    source: R,
    precision: usize,
    out: &mut W,
) -> Result<u64> {
    let mut frames = FrameReader::new(source);
    let mut events = 0;

    match kind {
        StreamKind::Deposition => {
            while let Some(frame) = frames.next_deposition()? {
                match frame {
                    DepositionFrame::EventStart(id) => {
                        events += 1;
                        marker(out, id)?;
                    }
                    DepositionFrame::Deposition(record) => record.write_text(out, precision)?,
                }
            }
        }
        StreamKind::History => {
            while let Some(frame) = frames.next_history()? {
                match frame {
                    HistoryFrame::EventStart(id) => {
                        events += 1;
                        marker(out, id)?;
                    }
                    HistoryFrame::TrackStart(record) => record.write_text(out, precision)?,
                    HistoryFrame::Step(record) => record.write_text(out, precision)?,
                }
            }
        }
        StreamKind::Exit | StreamKind::Primaries => {
            while let Some(frame) = frames.next_particle()? {
                match frame {
                    ParticleFrame::EventStart(id) => {
                        events += 1;
                        marker(out, id)?;
                    }
                    ParticleFrame::Particle(entry) => entry.write_text(out, precision)?,
                }
            }
        }
    }

    out.flush()?;
    Ok(events)
}

fn marker<W: Write>(out: &mut W, id: i32) -> Result<()> {
    write_event_marker(out, &EventId::from_index(id), OutputFormat::Text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use g4ants_session_core::output::DepositionWriter;
    use g4ants_session_core::wire::DepositionRecord;

    #[test]
    fn test_binary_deposition_decodes_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depo.bin");

        let mut writer = DepositionWriter::create(&path, OutputFormat::Binary, 6).unwrap();
        writer.write_event_marker(&EventId::from_index(0)).unwrap();
        writer
            .write_deposition(&DepositionRecord {
                particle_index: 0,
                material_index: 1,
                energy: 12.5,
                position: [1.0, 2.0, 3.0],
                time: 0.5,
            })
            .unwrap();
        writer.write_event_marker(&EventId::from_index(1)).unwrap();
        writer.finish().unwrap();

        let mut out = Vec::new();
        let events = decode_file(StreamKind::Deposition, &path, 6, &mut out).unwrap();
        assert_eq!(events, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "#0\n0 1 12.5 1 2 3 0.5\n#1\n");
    }

    #[test]
    fn test_wrong_layout_is_an_error() {
        let mut out = Vec::new();
        let garbage: &[u8] = &[0x42, 0x00];
        assert!(decode_stream(StreamKind::Exit, garbage, 6, &mut out).is_err());
    }
}
