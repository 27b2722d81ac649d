//! CLI command implementations.

pub mod keys;
pub mod options;
pub mod resolve;

use clap::ValueEnum;
use gridlink_core::{BackendProfile, OptionsConfig};
use std::path::Path;
use tracing::debug;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Backend whose capabilities apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// A document store that embeds and shares association rows.
    Document,
    /// A plain key-value store.
    KeyValue,
}

impl Backend {
    /// Returns the backend's profile.
    pub fn profile(self) -> BackendProfile {
        match self {
            Self::Document => BackendProfile::document(),
            Self::KeyValue => BackendProfile::key_value(),
        }
    }
}

/// Loads layered options from a JSON file, or the defaults without one.
pub fn load_options(path: Option<&Path>) -> Result<OptionsConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(OptionsConfig::default());
    };
    debug!(path = %path.display(), "loading options");
    let json = std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(OptionsConfig::from_json(&json)?)
}
