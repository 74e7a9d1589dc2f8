//! MACDET Console - client orchestration for the text-provenance detection console
//!
//! This crate provides:
//! - A testbed catalog and a cascading testbed/subtype selection state machine
//! - Sample retrieval and multi-model inference against the detection backend
//! - A simulated progress indicator that runs beside the real inference call
//! - Normalization of partial per-model results into display strings

pub mod aggregate;
pub mod backend;
pub mod bundle;
pub mod catalog;
pub mod console;
pub mod inference;
pub mod progress;
pub mod sample;
pub mod selection;
pub mod sink;

#[cfg(test)]
mod testing;

pub use backend::{DetectorBackend, HttpBackend};
pub use bundle::{InferenceRequest, ResultBundle};
pub use catalog::Catalog;
pub use console::{Console, ConsoleError};
pub use sink::PresentationSink;

use std::path::PathBuf;

/// Configuration for a console session
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the detection backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// HTTP timeout for sample and inference calls (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Grouped catalog JSON. When unset the catalog is fetched from the backend.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Progress indicator settings
    #[serde(default)]
    pub progress: ProgressConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            catalog_path: None,
            progress: ProgressConfig::default(),
        }
    }
}

fn default_backend_url() -> String { "http://localhost:8000".to_string() }
fn default_request_timeout_secs() -> u64 { 300 }

/// Configuration for the simulated progress indicator
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProgressConfig {
    /// Minimum visual duration of a run (ms)
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,

    /// Polling interval (ms)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// End the indicator as soon as the inference call settles instead of
    /// always running the full minimum duration
    #[serde(default)]
    pub early_exit_on_settle: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: default_min_duration_ms(),
            tick_ms: default_tick_ms(),
            early_exit_on_settle: false,
        }
    }
}

fn default_min_duration_ms() -> u64 { 3000 }
fn default_tick_ms() -> u64 { 50 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: ConsoleConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.request_timeout_secs, 300);
        assert!(config.catalog_path.is_none());
        assert_eq!(config.progress.min_duration_ms, 3000);
        assert_eq!(config.progress.tick_ms, 50);
        assert!(!config.progress.early_exit_on_settle);
    }

    #[test]
    fn test_config_overrides() {
        let config: ConsoleConfig = toml::from_str(
            r#"
            backend_url = "http://detector:9000"
            catalog_path = "catalog.json"

            [progress]
            min_duration_ms = 1500
            early_exit_on_settle = true
            "#,
        )
        .unwrap();

        assert_eq!(config.backend_url, "http://detector:9000");
        assert_eq!(config.catalog_path, Some(PathBuf::from("catalog.json")));
        assert_eq!(config.progress.min_duration_ms, 1500);
        assert_eq!(config.progress.tick_ms, 50);
        assert!(config.progress.early_exit_on_settle);
    }
}
