//! Wire formats for primaries and output streams
//!
//! One codec shared by the output writers, the binary primaries reader and
//! the offline decoding tools.
//!
//! # Binary framing
//!
//! Every record starts with a one-byte tag. Integers are little-endian int32,
//! reals are little-endian IEEE-754 doubles, names are NUL-terminated.
//!
//! ```text
//! 0xEE  event start      i32 event id
//! 0xFF  plain record     payload depends on the stream (see below)
//! 0xF0  track start      i32 track, i32 parent, name, 3×f64 pos, f64 time,
//!                        f64 kinE, i32 material, volume name, i32 copy no
//! 0xF8  transport step   as the history 0xFF step record, plus i32 material,
//!                        volume name and i32 copy no of the destination
//! ```
//!
//! Plain (`0xFF`) payloads:
//!
//! ```text
//! deposition   i32 particle, i32 material, f64 depE, 3×f64 pos, f64 time
//! history      process name, 3×f64 pos, f64 time, f64 kinE, f64 depE,
//!              i32 n, n×i32 secondary track ids
//! particles    name, f64 energy, 3×f64 pos, 3×f64 dir, f64 time
//!              (primaries input and exit-particle output)
//! ```
//!
//! # Text framing
//!
//! One record per line, fields separated by single spaces, reals printed
//! like C `%g` at the configured number of significant digits. Event starts
//! are the identifier line itself (`#...`); track starts carry a leading `>`.

pub mod reader;
pub mod records;
pub mod text;

use std::io;
use thiserror::Error;

pub use reader::{DepositionFrame, FrameReader, HistoryFrame, ParticleFrame};
pub use records::{
    write_event_marker, Destination, DepositionRecord, ParticleEntry, StepRecord,
    TrackStartRecord, WireRecord,
};
pub use text::format_general;

/// Record tag bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordTag {
    EventStart = 0xEE,
    Record = 0xFF,
    TrackStart = 0xF0,
    TransportStep = 0xF8,
}

impl RecordTag {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RecordTag {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xEE => Ok(RecordTag::EventStart),
            0xFF => Ok(RecordTag::Record),
            0xF0 => Ok(RecordTag::TrackStart),
            0xF8 => Ok(RecordTag::TransportStep),
            other => Err(WireError::UnexpectedTag(other)),
        }
    }
}

/// Text or binary encoding of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Binary,
}

impl OutputFormat {
    pub fn from_binary_flag(binary: bool) -> Self {
        if binary {
            OutputFormat::Binary
        } else {
            OutputFormat::Text
        }
    }
}

/// Errors raised while encoding or decoding wire records
#[derive(Debug, Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected record tag 0x{0:02X}")]
    UnexpectedTag(u8),

    #[error("Truncated {0} record")]
    Truncated(&'static str),

    #[error("Name field is not valid UTF-8")]
    InvalidName,

    #[error("Event identifier '{0}' cannot be written as a binary event marker")]
    NonNumericEventId(String),
}
