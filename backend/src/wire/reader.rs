//! Binary record decoding
//!
//! [`FrameReader`] walks a tagged binary stream one frame at a time. The
//! typed `next_*` methods know which payload layout the plain `0xFF` tag has
//! in each kind of stream.

use super::records::{Destination, DepositionRecord, ParticleEntry, StepRecord, TrackStartRecord};
use super::{RecordTag, WireError};
use std::io::{self, BufRead, Read};

/// Upper bound on the secondaries buffer reserved from a count read off the wire
const MAX_PREALLOCATED_SECONDARIES: usize = 1024;

/// Frame of a deposition stream
#[derive(Debug, Clone, PartialEq)]
pub enum DepositionFrame {
    EventStart(i32),
    Deposition(DepositionRecord),
}

/// Frame of a history stream
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryFrame {
    EventStart(i32),
    TrackStart(TrackStartRecord),
    Step(StepRecord),
}

/// Frame of a particle stream (binary primaries, exit particles)
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleFrame {
    EventStart(i32),
    Particle(ParticleEntry),
}

/// Reader of tagged binary frames
pub struct FrameReader<R> {
    inner: R,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// True when no unread bytes remain
    pub fn at_end(&mut self) -> Result<bool, WireError> {
        Ok(self.inner.fill_buf()?.is_empty())
    }

    /// Next tag byte, `None` on a clean end of stream
    pub fn read_tag(&mut self) -> Result<Option<u8>, WireError> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &'static str) -> Result<(), WireError> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => WireError::Truncated(what),
            _ => WireError::Io(e),
        })
    }

    pub fn read_i32(&mut self, what: &'static str) -> Result<i32, WireError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf, what)?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self, what: &'static str) -> Result<f64, WireError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf, what)?;
        Ok(f64::from_le_bytes(buf))
    }

    pub fn read_vec3(&mut self, what: &'static str) -> Result<[f64; 3], WireError> {
        Ok([
            self.read_f64(what)?,
            self.read_f64(what)?,
            self.read_f64(what)?,
        ])
    }

    /// NUL-terminated name
    pub fn read_name(&mut self, what: &'static str) -> Result<String, WireError> {
        let mut bytes = Vec::new();
        self.inner.read_until(0x00, &mut bytes)?;
        if bytes.pop() != Some(0x00) {
            return Err(WireError::Truncated(what));
        }
        String::from_utf8(bytes).map_err(|_| WireError::InvalidName)
    }

    // ========================================================================
    // Typed frames
    // ========================================================================

    pub fn next_deposition(&mut self) -> Result<Option<DepositionFrame>, WireError> {
        let Some(tag) = self.read_tag()? else {
            return Ok(None);
        };
        match RecordTag::try_from(tag)? {
            RecordTag::EventStart => Ok(Some(DepositionFrame::EventStart(
                self.read_i32("event marker")?,
            ))),
            RecordTag::Record => {
                const WHAT: &str = "deposition";
                Ok(Some(DepositionFrame::Deposition(DepositionRecord {
                    particle_index: self.read_i32(WHAT)?,
                    material_index: self.read_i32(WHAT)?,
                    energy: self.read_f64(WHAT)?,
                    position: self.read_vec3(WHAT)?,
                    time: self.read_f64(WHAT)?,
                })))
            }
            _ => Err(WireError::UnexpectedTag(tag)),
        }
    }

    pub fn next_history(&mut self) -> Result<Option<HistoryFrame>, WireError> {
        let Some(tag) = self.read_tag()? else {
            return Ok(None);
        };
        match RecordTag::try_from(tag)? {
            RecordTag::EventStart => Ok(Some(HistoryFrame::EventStart(
                self.read_i32("event marker")?,
            ))),
            RecordTag::TrackStart => {
                const WHAT: &str = "track start";
                Ok(Some(HistoryFrame::TrackStart(TrackStartRecord {
                    track_id: self.read_i32(WHAT)?,
                    parent_id: self.read_i32(WHAT)?,
                    particle: self.read_name(WHAT)?,
                    position: self.read_vec3(WHAT)?,
                    time: self.read_f64(WHAT)?,
                    kinetic_energy: self.read_f64(WHAT)?,
                    material_index: self.read_i32(WHAT)?,
                    volume_name: self.read_name(WHAT)?,
                    copy_number: self.read_i32(WHAT)?,
                })))
            }
            kind @ (RecordTag::Record | RecordTag::TransportStep) => {
                const WHAT: &str = "step";
                let process = self.read_name(WHAT)?;
                let position = self.read_vec3(WHAT)?;
                let time = self.read_f64(WHAT)?;
                let kinetic_energy = self.read_f64(WHAT)?;
                let deposit = self.read_f64(WHAT)?;
                let destination = if kind == RecordTag::TransportStep {
                    Some(Destination {
                        material_index: self.read_i32(WHAT)?,
                        volume_name: self.read_name(WHAT)?,
                        copy_number: self.read_i32(WHAT)?,
                    })
                } else {
                    None
                };
                let count = self.read_i32(WHAT)?.max(0) as usize;
                let mut secondaries =
                    Vec::with_capacity(count.min(MAX_PREALLOCATED_SECONDARIES));
                for _ in 0..count {
                    secondaries.push(self.read_i32(WHAT)?);
                }
                Ok(Some(HistoryFrame::Step(StepRecord {
                    process,
                    position,
                    time,
                    kinetic_energy,
                    deposit,
                    destination,
                    secondaries,
                })))
            }
        }
    }

    pub fn next_particle(&mut self) -> Result<Option<ParticleFrame>, WireError> {
        let Some(tag) = self.read_tag()? else {
            return Ok(None);
        };
        match RecordTag::try_from(tag)? {
            RecordTag::EventStart => Ok(Some(ParticleFrame::EventStart(
                self.read_i32("event marker")?,
            ))),
            RecordTag::Record => Ok(Some(ParticleFrame::Particle(self.read_particle_body()?))),
            _ => Err(WireError::UnexpectedTag(tag)),
        }
    }

    /// Payload of a particle record, after its `0xFF` tag
    pub fn read_particle_body(&mut self) -> Result<ParticleEntry, WireError> {
        const WHAT: &str = "particle";
        Ok(ParticleEntry {
            name: self.read_name(WHAT)?,
            energy: self.read_f64(WHAT)?,
            position: self.read_vec3(WHAT)?,
            direction: self.read_vec3(WHAT)?,
            time: self.read_f64(WHAT)?,
        })
    }
}
