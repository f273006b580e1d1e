//! Final job receipt
//!
//! ```text
//! {"Success":true,"DepoByRegistered":12.5,"DepoByNotRegistered":0.0}
//! {"Success":false,"Error":"...","DepoByRegistered":0.0,"DepoByNotRegistered":0.0}
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(rename = "Success")]
    pub success: bool,

    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// keV deposited by declared particles
    #[serde(rename = "DepoByRegistered", default)]
    pub depo_by_registered: f64,

    /// keV deposited by particles missing from the declared list
    #[serde(rename = "DepoByNotRegistered", default)]
    pub depo_by_not_registered: f64,

    #[serde(
        rename = "SeenNotRegisteredParticles",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub seen_not_registered: Vec<String>,

    #[serde(rename = "Warnings", default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Receipt {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
            depo_by_registered: 0.0,
            depo_by_not_registered: 0.0,
            seen_not_registered: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::success()
        }
    }

    /// Write as one line of compact JSON, replacing any previous receipt
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut text = serde_json::to_string(self).map_err(io::Error::other)?;
        text.push('\n');
        fs::write(path, text)
    }
}
