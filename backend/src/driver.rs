//! Job driver
//!
//! [`run_job`] is the whole life of one job: read the configuration, run the
//! session and return the receipt that was written. Fatal errors raised
//! anywhere below are turned into the failure receipt here and nowhere else.

use crate::config::{receipt_path_of, JobConfig};
use crate::engine::SimulationEngine;
use crate::session::{status_line, Receipt, Session};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Run the job described by the JSON document at `config_path`
///
/// The returned receipt has already been written to the configured receipt
/// file when that path is known.
pub fn run_job<E: SimulationEngine>(config_path: &Path, engine: E) -> Receipt {
    let text = match fs::read_to_string(config_path) {
        Ok(text) => text,
        Err(err) => {
            let message = format!("Cannot read config file {}: {}", config_path.display(), err);
            return reject_config(None, message);
        }
    };

    let config = match JobConfig::from_json_str(&text) {
        Ok(config) => config,
        Err(err) => return reject_config(receipt_path_of(&text), err.to_string()),
    };
    for warning in &config.warnings {
        warn!("{}", warning);
    }

    let mut session = Session::new(engine, config);
    let outcome = session
        .start_session()
        .and_then(|()| session.run_simulation())
        .and_then(|()| session.end_session());

    match outcome {
        Ok(receipt) => {
            info!(
                events = session.events_done(),
                depo_registered = receipt.depo_by_registered,
                depo_not_registered = receipt.depo_by_not_registered,
                "job finished"
            );
            receipt
        }
        Err(err) => session.terminate_session(&err),
    }
}

/// Failure before a session exists
fn reject_config(receipt_path: Option<std::path::PathBuf>, message: String) -> Receipt {
    println!("{}", status_line(&message));
    error!(error = %message, "invalid job configuration");

    let receipt = Receipt::failure(message);
    if let Some(path) = receipt_path {
        if let Err(err) = receipt.write_to(&path) {
            warn!(error = %err, "cannot write the failure receipt");
        }
    }
    receipt
}
