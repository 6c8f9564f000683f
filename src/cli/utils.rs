//! Utility functions for CLI operations.

use chrono::{TimeZone, Utc};
use crate::config::Config;
use crate::error::{GpgReportError, Result};
use crate::keyring::Keyring;
use crate::validation::Validator;
use std::fs;
use std::path::Path;

/// Load the configured key snapshot, empty if the file does not exist yet
pub fn open_keyring(config: &Config) -> Result<Keyring> {
    Keyring::load_or_default(&config.keyring_path)
}

/// Read a raw engine result, refusing oversized input
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path).map_err(|e| {
        GpgReportError::invalid_input(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Validator::validate_raw_result_size(&data)?;
    Ok(data)
}

/// Format a Unix timestamp as a UTC date and time
pub fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
