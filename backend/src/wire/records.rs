//! Record types and their encoders
//!
//! Each record type knows how to write itself in both encodings through
//! [`WireRecord`]. Decoding lives in [`super::reader`].

use super::text::format_general;
use super::{OutputFormat, RecordTag, WireError};
use crate::models::EventId;
use std::io::{self, Write};

/// A record that can be written to an output stream
pub trait WireRecord {
    /// Write the tagged binary form
    fn write_binary<W: Write>(&self, out: &mut W) -> io::Result<()>;

    /// Write the text form (one line, newline included)
    fn write_text<W: Write>(&self, out: &mut W, precision: usize) -> io::Result<()>;

    fn write_to<W: Write>(
        &self,
        out: &mut W,
        format: OutputFormat,
        precision: usize,
    ) -> io::Result<()> {
        match format {
            OutputFormat::Binary => self.write_binary(out),
            OutputFormat::Text => self.write_text(out, precision),
        }
    }
}

// ============================================================================
// Primitive encoders
// ============================================================================

pub(crate) fn put_tag<W: Write>(out: &mut W, tag: RecordTag) -> io::Result<()> {
    out.write_all(&[tag.byte()])
}

pub(crate) fn put_i32<W: Write>(out: &mut W, value: i32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub(crate) fn put_f64<W: Write>(out: &mut W, value: f64) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub(crate) fn put_vec3<W: Write>(out: &mut W, value: &[f64; 3]) -> io::Result<()> {
    for component in value {
        put_f64(out, *component)?;
    }
    Ok(())
}

pub(crate) fn put_name<W: Write>(out: &mut W, name: &str) -> io::Result<()> {
    out.write_all(name.as_bytes())?;
    out.write_all(&[0x00])
}

/// Space-separated text line builder
struct TextLine {
    line: String,
    fields: usize,
    precision: usize,
}

impl TextLine {
    fn new(precision: usize) -> Self {
        Self {
            line: String::new(),
            fields: 0,
            precision,
        }
    }

    fn with_prefix(prefix: &str, precision: usize) -> Self {
        Self {
            line: prefix.to_string(),
            fields: 0,
            precision,
        }
    }

    fn separator(&mut self) {
        if self.fields > 0 {
            self.line.push(' ');
        }
        self.fields += 1;
    }

    fn int(&mut self, value: i32) -> &mut Self {
        self.separator();
        self.line.push_str(&value.to_string());
        self
    }

    fn real(&mut self, value: f64) -> &mut Self {
        self.separator();
        self.line.push_str(&format_general(value, self.precision));
        self
    }

    fn reals(&mut self, values: &[f64]) -> &mut Self {
        for value in values {
            self.real(*value);
        }
        self
    }

    fn word(&mut self, value: &str) -> &mut Self {
        self.separator();
        self.line.push_str(value);
        self
    }

    fn finish<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.line)
    }
}

/// Write the event-start marker for `event_id`
///
/// Binary streams need the numeric form of the identifier.
pub fn write_event_marker<W: Write>(
    out: &mut W,
    event_id: &EventId,
    format: OutputFormat,
) -> Result<(), WireError> {
    match format {
        OutputFormat::Binary => {
            let index = event_id
                .index()
                .ok_or_else(|| WireError::NonNumericEventId(event_id.label().to_string()))?;
            put_tag(out, RecordTag::EventStart)?;
            put_i32(out, index)?;
        }
        OutputFormat::Text => writeln!(out, "{}", event_id.label())?,
    }
    Ok(())
}

// ============================================================================
// Deposition
// ============================================================================

/// Energy deposited by one step inside a sensitive volume
#[derive(Debug, Clone, PartialEq)]
pub struct DepositionRecord {
    /// Index in the declared particle list, -1 when not declared
    pub particle_index: i32,
    pub material_index: i32,
    /// Deposited energy (keV)
    pub energy: f64,
    /// Post-step position (mm)
    pub position: [f64; 3],
    /// Post-step global time (ns)
    pub time: f64,
}

impl WireRecord for DepositionRecord {
    fn write_binary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        put_tag(out, RecordTag::Record)?;
        put_i32(out, self.particle_index)?;
        put_i32(out, self.material_index)?;
        put_f64(out, self.energy)?;
        put_vec3(out, &self.position)?;
        put_f64(out, self.time)
    }

    fn write_text<W: Write>(&self, out: &mut W, precision: usize) -> io::Result<()> {
        TextLine::new(precision)
            .int(self.particle_index)
            .int(self.material_index)
            .real(self.energy)
            .reals(&self.position)
            .real(self.time)
            .finish(out)
    }
}

// ============================================================================
// History
// ============================================================================

/// Start of a track in the history stream
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStartRecord {
    pub track_id: i32,
    pub parent_id: i32,
    pub particle: String,
    pub position: [f64; 3],
    pub time: f64,
    pub kinetic_energy: f64,
    pub material_index: i32,
    pub volume_name: String,
    pub copy_number: i32,
}

impl WireRecord for TrackStartRecord {
    fn write_binary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        put_tag(out, RecordTag::TrackStart)?;
        put_i32(out, self.track_id)?;
        put_i32(out, self.parent_id)?;
        put_name(out, &self.particle)?;
        put_vec3(out, &self.position)?;
        put_f64(out, self.time)?;
        put_f64(out, self.kinetic_energy)?;
        put_i32(out, self.material_index)?;
        put_name(out, &self.volume_name)?;
        put_i32(out, self.copy_number)
    }

    fn write_text<W: Write>(&self, out: &mut W, precision: usize) -> io::Result<()> {
        TextLine::with_prefix(">", precision)
            .int(self.track_id)
            .int(self.parent_id)
            .word(&self.particle)
            .reals(&self.position)
            .real(self.time)
            .real(self.kinetic_energy)
            .int(self.material_index)
            .word(&self.volume_name)
            .int(self.copy_number)
            .finish(out)
    }
}

/// Volume a transportation step leads into
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub material_index: i32,
    pub volume_name: String,
    pub copy_number: i32,
}

/// One step of a track in the history stream
///
/// `process` is the defining process name, `T` for a transportation step
/// inside the world and `O` for a step leaving the world. Energy deposited
/// on a transportation step belongs to the volume being left.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub process: String,
    pub position: [f64; 3],
    pub time: f64,
    pub kinetic_energy: f64,
    pub deposit: f64,
    pub destination: Option<Destination>,
    /// Predicted track ids of the secondaries created on this step
    pub secondaries: Vec<i32>,
}

impl WireRecord for StepRecord {
    fn write_binary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let tag = if self.destination.is_some() {
            RecordTag::TransportStep
        } else {
            RecordTag::Record
        };
        put_tag(out, tag)?;
        put_name(out, &self.process)?;
        put_vec3(out, &self.position)?;
        put_f64(out, self.time)?;
        put_f64(out, self.kinetic_energy)?;
        put_f64(out, self.deposit)?;
        if let Some(dest) = &self.destination {
            put_i32(out, dest.material_index)?;
            put_name(out, &dest.volume_name)?;
            put_i32(out, dest.copy_number)?;
        }
        put_i32(out, self.secondaries.len() as i32)?;
        for id in &self.secondaries {
            put_i32(out, *id)?;
        }
        Ok(())
    }

    fn write_text<W: Write>(&self, out: &mut W, precision: usize) -> io::Result<()> {
        let mut line = TextLine::new(precision);
        line.word(&self.process)
            .reals(&self.position)
            .real(self.time)
            .real(self.kinetic_energy)
            .real(self.deposit);
        if let Some(dest) = &self.destination {
            line.int(dest.material_index)
                .word(&dest.volume_name)
                .int(dest.copy_number);
        }
        for id in &self.secondaries {
            line.int(*id);
        }
        line.finish(out)
    }
}

// ============================================================================
// Particles (primaries input, exit-particle output)
// ============================================================================

/// A named particle with kinematics
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEntry {
    pub name: String,
    /// Kinetic energy (keV)
    pub energy: f64,
    pub position: [f64; 3],
    pub direction: [f64; 3],
    /// Global time (ns)
    pub time: f64,
}

impl WireRecord for ParticleEntry {
    fn write_binary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        put_tag(out, RecordTag::Record)?;
        put_name(out, &self.name)?;
        put_f64(out, self.energy)?;
        put_vec3(out, &self.position)?;
        put_vec3(out, &self.direction)?;
        put_f64(out, self.time)
    }

    fn write_text<W: Write>(&self, out: &mut W, precision: usize) -> io::Result<()> {
        TextLine::new(precision)
            .word(&self.name)
            .real(self.energy)
            .reals(&self.position)
            .reals(&self.direction)
            .real(self.time)
            .finish(out)
    }
}
