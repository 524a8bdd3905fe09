//! Engine configuration.
//!
//! A small serde struct persisted as TOML. Everything has a sensible
//! default so `EngineConfig::default()` is a fully working configuration.

use crate::error::{PlotLinkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the plotlink engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of distinct colors in the application palette; assigned
    /// color indices wrap modulo this value.
    pub palette_size: usize,
    /// Compute background-registered transforms (fit) on the worker
    /// thread. When false everything computes inline, which some
    /// embedders prefer for determinism.
    pub background_fit: bool,
    /// Default bin count for the histogram transform when the caller
    /// passes no `bins` parameter.
    pub histogram_bins: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            palette_size: 10,
            background_fit: true,
            histogram_bins: 10,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PlotLinkError::Config(format!("reading config: {e}")))?;
        toml::from_str(&text).map_err(|e| PlotLinkError::Config(format!("parsing config: {e}")))
    }

    /// Load a configuration, falling back to defaults when the file is
    /// missing or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("using default config: {e}");
                Self::default()
            }
        }
    }

    /// Save the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| PlotLinkError::Config(format!("serializing config: {e}")))?;
        std::fs::write(path.as_ref(), text)
            .map_err(|e| PlotLinkError::Config(format!("writing config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.palette_size, 10);
        assert!(c.background_fit);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plotlink.toml");
        let config = EngineConfig {
            palette_size: 16,
            background_fit: false,
            histogram_bins: 32,
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let c = EngineConfig::load_or_default("/nonexistent/plotlink.toml");
        assert_eq!(c, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "palette_size = 4\n").unwrap();
        let c = EngineConfig::load(&path).unwrap();
        assert_eq!(c.palette_size, 4);
        assert_eq!(c.histogram_bins, 10);
    }
}
