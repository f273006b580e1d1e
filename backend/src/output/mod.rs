//! Output streams
//!
//! Deposition, history and exit-particle sinks. Each one is either open
//! (text or binary) or disabled; writes to a disabled stream do nothing, so
//! callers decide upstream whether a feature records anything.
//!
//! # Critical Invariants
//!
//! 1. A stream is opened once at session start and finished once at the end.
//! 2. Every data record of an event follows that event's marker.

use crate::models::EventId;
use crate::wire::{
    write_event_marker, DepositionRecord, OutputFormat, ParticleEntry, StepRecord,
    TrackStartRecord, WireError, WireRecord,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// A record sink that may be disabled
#[derive(Debug)]
pub struct RecordStream<W: Write = BufWriter<File>> {
    sink: Option<W>,
    format: OutputFormat,
    precision: usize,
}

impl RecordStream<BufWriter<File>> {
    /// Create (or truncate) `path`
    pub fn create(path: &Path, format: OutputFormat, precision: usize) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file), format, precision))
    }
}

impl<W: Write> RecordStream<W> {
    pub fn from_writer(sink: W, format: OutputFormat, precision: usize) -> Self {
        Self {
            sink: Some(sink),
            format,
            precision,
        }
    }

    pub fn disabled() -> Self {
        Self {
            sink: None,
            format: OutputFormat::Text,
            precision: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn write_event_marker(&mut self, event: &EventId) -> Result<(), WireError> {
        match self.sink.as_mut() {
            Some(sink) => write_event_marker(sink, event, self.format),
            None => Ok(()),
        }
    }

    fn write_record<T: WireRecord>(&mut self, record: &T) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(sink) => record.write_to(sink, self.format, self.precision),
            None => Ok(()),
        }
    }

    /// Flush and hand back the underlying writer
    pub fn finish(&mut self) -> io::Result<Option<W>> {
        match self.sink.take() {
            Some(mut sink) => {
                sink.flush()?;
                Ok(Some(sink))
            }
            None => Ok(None),
        }
    }
}

macro_rules! typed_stream {
    ($(#[$doc:meta])* $name:ident, $($method:ident($record:ty)),+) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name<W: Write = BufWriter<File>>(RecordStream<W>);

        impl $name<BufWriter<File>> {
            pub fn create(path: &Path, format: OutputFormat, precision: usize) -> io::Result<Self> {
                RecordStream::create(path, format, precision).map(Self)
            }
        }

        impl<W: Write> $name<W> {
            pub fn from_writer(sink: W, format: OutputFormat, precision: usize) -> Self {
                Self(RecordStream::from_writer(sink, format, precision))
            }

            pub fn disabled() -> Self {
                Self(RecordStream::disabled())
            }

            pub fn is_enabled(&self) -> bool {
                self.0.is_enabled()
            }

            pub fn write_event_marker(&mut self, event: &EventId) -> Result<(), WireError> {
                self.0.write_event_marker(event)
            }

            $(
                pub fn $method(&mut self, record: &$record) -> io::Result<()> {
                    self.0.write_record(record)
                }
            )+

            pub fn finish(&mut self) -> io::Result<Option<W>> {
                self.0.finish()
            }
        }
    };
}

typed_stream!(
    /// Per-hit energy deposition records
    DepositionWriter,
    write_deposition(DepositionRecord)
);

typed_stream!(
    /// Track starts and step records
    HistoryWriter,
    write_track_start(TrackStartRecord),
    write_step(StepRecord)
);

typed_stream!(
    /// Particles leaving the exit volume
    ExitWriter,
    write_particle(ParticleEntry)
);
