//! Configuration for the gpgreport binary.
//!
//! Settings come from an optional JSON file, then environment variables
//! override individual fields. The library itself never reads the clock or
//! the environment; only [`Config::analysis_context`] turns "now" into an
//! explicit [`AnalysisContext`].

use chrono::Utc;
use crate::analysis::AnalysisContext;
use crate::error::{GpgReportError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const ENV_KEYRING: &str = "GPGREPORT_KEYRING";
pub const ENV_TIME: &str = "GPGREPORT_TIME";
pub const ENV_LOG: &str = "GPGREPORT_LOG";
pub const ENV_FORMAT: &str = "GPGREPORT_FORMAT";

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "gpgreport=info";

/// How reports and listings are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = GpgReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(GpgReportError::config(format!(
                "Unknown output format '{}', expected text or json",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key snapshot file; JSON when it ends in `.json`, bincode otherwise
    pub keyring_path: PathBuf,
    /// Unix time used for expiry checks; the system clock when unset
    pub reference_time: Option<u64>,
    pub log_filter: String,
    pub output_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyring_path: default_keyring_path(),
            reference_time: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            output_format: OutputFormat::Text,
        }
    }
}

/// `$HOME/.gpgreport/keyring.json`, relative to the working directory without HOME
pub fn default_keyring_path() -> PathBuf {
    let base = env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    base.join(".gpgreport").join("keyring.json")
}

impl Config {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            GpgReportError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_slice(&data).map_err(|e| {
            GpgReportError::config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// File settings (if any) overlaid with the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Applies overrides looked up by variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_KEYRING) {
            self.keyring_path = PathBuf::from(path);
        }
        if let Some(time) = lookup(ENV_TIME) {
            let time = time.trim().parse::<u64>().map_err(|_| {
                GpgReportError::config(format!(
                    "{} must be a Unix timestamp, got '{}'",
                    ENV_TIME, time
                ))
            })?;
            self.reference_time = Some(time);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(format) = lookup(ENV_FORMAT) {
            self.output_format = format.parse()?;
        }
        Ok(())
    }

    pub fn analysis_context(&self) -> AnalysisContext {
        let now = self
            .reference_time
            .unwrap_or_else(|| u64::try_from(Utc::now().timestamp()).unwrap_or(0));
        AnalysisContext::at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.keyring_path.ends_with(".gpgreport/keyring.json"));
        assert_eq!(config.log_filter, "gpgreport=info");
        assert_eq!(config.output_format, OutputFormat::Text);
        assert_eq!(config.reference_time, None);
        assert!(config.analysis_context().reference_time > 1_700_000_000);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"reference_time": 1700000000, "output_format": "json"}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.reference_time, Some(1_700_000_000));
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.analysis_context(), AnalysisContext::at(1_700_000_000));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_KEYRING, "/tmp/keys.bin"),
            (ENV_TIME, "42"),
            (ENV_LOG, "gpgreport=debug"),
            (ENV_FORMAT, "JSON"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.keyring_path, PathBuf::from("/tmp/keys.bin"));
        assert_eq!(config.reference_time, Some(42));
        assert_eq!(config.log_filter, "gpgreport=debug");
        assert_eq!(config.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_bad_overrides() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(|name| (name == ENV_TIME).then(|| "yesterday".to_string()))
            .is_err());
        assert!(config
            .apply_overrides(|name| (name == ENV_FORMAT).then(|| "xml".to_string()))
            .is_err());
    }
}
