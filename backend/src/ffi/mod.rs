//! Python bindings for the offline decoders
//!
//! ```python
//! from g4ants_session_core import decode_deposition
//!
//! for event in decode_deposition("deposition.bin"):
//!     print(event["event"], len(event["records"]))
//! ```

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::fs::File;
use std::io::BufReader;

use crate::wire::{DepositionFrame, DepositionRecord, FrameReader};

fn record_to_py<'py>(py: Python<'py>, record: &DepositionRecord) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("particle", record.particle_index)?;
    dict.set_item("material", record.material_index)?;
    dict.set_item("energy", record.energy)?;
    dict.set_item("position", record.position.to_vec())?;
    dict.set_item("time", record.time)?;
    Ok(dict)
}

/// Decode a binary deposition file into a list of events
///
/// Each event is a dict with `event` (the identifier) and `records` (a list
/// of dicts with `particle`, `material`, `energy`, `position`, `time`).
/// Records before the first event marker are reported under `event = None`.
#[pyfunction]
pub fn decode_deposition<'py>(py: Python<'py>, path: &str) -> PyResult<Bound<'py, PyList>> {
    let file = File::open(path)
        .map_err(|e| PyIOError::new_err(format!("Cannot open {}: {}", path, e)))?;
    let mut frames = FrameReader::new(BufReader::new(file));

    let events = PyList::empty_bound(py);
    let mut current: Option<(Option<i32>, Bound<'py, PyList>)> = None;

    loop {
        let frame = frames
            .next_deposition()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        match frame {
            None => break,
            Some(DepositionFrame::EventStart(id)) => {
                if let Some((event, records)) = current.take() {
                    events.append(event_to_py(py, event, records)?)?;
                }
                current = Some((Some(id), PyList::empty_bound(py)));
            }
            Some(DepositionFrame::Deposition(record)) => {
                let (_, records) =
                    current.get_or_insert_with(|| (None, PyList::empty_bound(py)));
                records.append(record_to_py(py, &record)?)?;
            }
        }
    }
    if let Some((event, records)) = current {
        events.append(event_to_py(py, event, records)?)?;
    }
    Ok(events)
}

fn event_to_py<'py>(
    py: Python<'py>,
    event: Option<i32>,
    records: Bound<'py, PyList>,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("event", event)?;
    dict.set_item("records", records)?;
    Ok(dict)
}
