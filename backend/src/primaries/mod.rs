//! Primary-event reader
//!
//! Streams the primaries file one event at a time. Events are delimited by
//! marker records; the reader always holds the marker of the event it will
//! return next, so after `read_next_event` the lookahead already names the
//! following event.
//!
//! # Formats
//!
//! ```text
//! text, indexed   # event1
//!                 0 1000 0 0 0 0 0 1 0      index energy x y z dx dy dz time
//! text, named     # event1
//!                 gamma 1000 0 0 0 0 0 1 0  name  energy x y z dx dy dz time
//! binary          0xEE i32 | 0xFF name\0 8×f64 | ... | 0xEE i32
//! ```
//!
//! # Critical Invariants
//!
//! 1. The first marker is read when the reader is created; a file without one
//!    is rejected.
//! 2. The scan for an event stops at the next marker, leaving the rest of the
//!    file untouched.
//! 3. End of input means no unread bytes remain.

use crate::config::PrimariesFormat;
use crate::models::{EventId, ParticleHandle, ParticleRecord};
use crate::wire::{FrameReader, ParticleFrame, WireError};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading primaries
#[derive(Debug, Error)]
pub enum PrimariesError {
    #[error("Cannot open file with primaries: {0}")]
    Open(#[source] io::Error),

    #[error("I/O error while reading primaries: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected format of the binary file with primaries: {0}")]
    Wire(#[from] WireError),

    #[error("Unexpected format of the file with primaries")]
    BadHeader,

    #[error("Unexpected format of file with primaries: '{0}'")]
    BadRecord(String),

    #[error("Use of unknown particle index {0}")]
    UnknownIndex(i64),

    #[error("Found an unknown particle: {0}")]
    UnknownParticle(String),

    #[error("Failed to generate ion: {0}")]
    IonUnavailable(String),

    #[error("Binary file with primaries ended before the closing event marker")]
    MissingFinalMarker,
}

/// Turns particle references from the primaries file into engine handles
pub trait ParticleResolver {
    /// Handle of the declared particle at `index`
    fn resolve_index(&self, index: usize) -> Option<ParticleHandle>;

    /// Handle for a particle or ion name
    fn resolve_name(&self, name: &str) -> Result<ParticleHandle, PrimariesError>;
}

/// Number of whitespace-separated fields in a text primaries line
const TEXT_FIELDS: usize = 9;

pub struct PrimaryReader<R = BufReader<File>> {
    source: R,
    format: PrimariesFormat,
    next_event: EventId,
    primaries: Vec<ParticleRecord>,
}

impl PrimaryReader<BufReader<File>> {
    pub fn open(path: &Path, format: PrimariesFormat) -> Result<Self, PrimariesError> {
        let file = File::open(path).map_err(PrimariesError::Open)?;
        Self::new(BufReader::new(file), format)
    }
}

impl<R: BufRead> PrimaryReader<R> {
    /// Wrap `source` and read its first event marker
    pub fn new(mut source: R, format: PrimariesFormat) -> Result<Self, PrimariesError> {
        let first = match format {
            PrimariesFormat::Binary => {
                let mut frames = FrameReader::new(&mut source);
                match frames.next_particle() {
                    Ok(Some(ParticleFrame::EventStart(id))) => EventId::from_index(id),
                    Ok(_) | Err(WireError::UnexpectedTag(_)) | Err(WireError::Truncated(_)) => {
                        return Err(PrimariesError::BadHeader)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            PrimariesFormat::TextIndexed | PrimariesFormat::TextNamed => {
                let mut line = String::new();
                source.read_line(&mut line)?;
                let line = trim_line_end(&line);
                if line.len() < 2 || !line.starts_with('#') {
                    return Err(PrimariesError::BadHeader);
                }
                EventId::from_label(line)
            }
        };

        Ok(Self {
            source,
            format,
            next_event: first,
            primaries: Vec::new(),
        })
    }

    /// Marker of the event the next `read_next_event` returns
    pub fn next_event_id(&self) -> &EventId {
        &self.next_event
    }

    /// True when nothing but blank lines remains (text) or no bytes remain (binary)
    pub fn is_end_of_input(&mut self) -> Result<bool, PrimariesError> {
        if self.format == PrimariesFormat::Binary {
            return Ok(self.source.fill_buf()?.is_empty());
        }
        loop {
            let buf = self.source.fill_buf()?;
            if buf.is_empty() {
                return Ok(true);
            }
            let blank = buf
                .iter()
                .take_while(|b| b.is_ascii_whitespace() && **b != b'\n')
                .count();
            let next = buf.get(blank).copied();
            match next {
                Some(b'\n') => self.source.consume(blank + 1),
                None => self.source.consume(blank),
                Some(_) => return Ok(false),
            }
        }
    }

    /// Read the particles of the next event and advance the lookahead marker
    pub fn read_next_event(
        &mut self,
        resolver: &dyn ParticleResolver,
    ) -> Result<&[ParticleRecord], PrimariesError> {
        self.primaries.clear();
        match self.format {
            PrimariesFormat::Binary => self.scan_binary(resolver)?,
            PrimariesFormat::TextIndexed | PrimariesFormat::TextNamed => {
                self.scan_text(resolver)?
            }
        }
        Ok(&self.primaries)
    }

    fn scan_text(&mut self, resolver: &dyn ParticleResolver) -> Result<(), PrimariesError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.source.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let text = trim_line_end(&line);
            if text.trim().is_empty() {
                continue;
            }
            if text.starts_with('#') {
                self.next_event = EventId::from_label(text);
                return Ok(());
            }
            let record = self.parse_text_record(text, resolver)?;
            self.primaries.push(record);
        }
    }

    fn parse_text_record(
        &self,
        line: &str,
        resolver: &dyn ParticleResolver,
    ) -> Result<ParticleRecord, PrimariesError> {
        let bad = || PrimariesError::BadRecord(line.to_string());

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < TEXT_FIELDS {
            return Err(bad());
        }

        let particle = match self.format {
            PrimariesFormat::TextIndexed => {
                let index: i64 = fields[0].parse().map_err(|_| bad())?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| resolver.resolve_index(i))
                    .ok_or(PrimariesError::UnknownIndex(index))?
            }
            _ => resolver.resolve_name(fields[0])?,
        };

        let mut numbers = [0.0f64; TEXT_FIELDS - 1];
        for (slot, field) in numbers.iter_mut().zip(&fields[1..TEXT_FIELDS]) {
            *slot = field.parse().map_err(|_| bad())?;
        }

        Ok(ParticleRecord {
            particle,
            energy: numbers[0],
            position: [numbers[1], numbers[2], numbers[3]],
            direction: [numbers[4], numbers[5], numbers[6]],
            time: numbers[7],
        })
    }

    fn scan_binary(&mut self, resolver: &dyn ParticleResolver) -> Result<(), PrimariesError> {
        let mut frames = FrameReader::new(&mut self.source);
        loop {
            match frames.next_particle()? {
                None => return Err(PrimariesError::MissingFinalMarker),
                Some(ParticleFrame::EventStart(id)) => {
                    self.next_event = EventId::from_index(id);
                    return Ok(());
                }
                Some(ParticleFrame::Particle(entry)) => {
                    let particle = resolver.resolve_name(&entry.name)?;
                    self.primaries.push(ParticleRecord {
                        particle,
                        energy: entry.energy,
                        position: entry.position,
                        direction: entry.direction,
                        time: entry.time,
                    });
                }
            }
        }
    }
}

fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(&['\n', '\r'][..])
}
