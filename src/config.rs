//! Engine configuration.
//!
//! All fields have defaults, so a config file only needs to list what it
//! overrides. Durations are stored as plain integers to keep the file format
//! readable.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = "docview";
const CONFIG_FILE: &str = "config.json";

/// Tunables for one table instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entries requested per fetch
    pub page_size: u32,
    /// Fixed row height in pixels
    pub row_height: f32,
    /// Extra rows rendered beyond the viewport
    pub buffer_size: usize,
    /// Minimum start-row movement before the window re-renders
    pub hysteresis_rows: usize,
    pub cache_timeout_secs: u64,
    pub cache_capacity: usize,
    pub cleanup_interval_secs: u64,
    pub sample_interval_secs: u64,
    /// Heap usage ratio (0.0..=1.0) that triggers a cleanup pass
    pub heap_threshold: f64,
    pub frame_budget_ms: u64,
    /// Consecutive over-budget renders that trigger a cleanup pass
    pub slow_render_limit: u32,
    pub scroll_throttle_ms: u64,
    pub resize_debounce_ms: u64,
    /// Distance from the end of the rendered rows that loads the next page
    pub lazy_threshold_px: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            row_height: 40.0,
            buffer_size: 10,
            hysteresis_rows: 5,
            cache_timeout_secs: 300,
            cache_capacity: 50,
            cleanup_interval_secs: 60,
            sample_interval_secs: 30,
            heap_threshold: 0.8,
            frame_budget_ms: 16,
            slow_render_limit: 3,
            scroll_throttle_ms: 16,
            resize_debounce_ms: 150,
            lazy_threshold_px: 200.0,
        }
    }
}

impl EngineConfig {
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }

    pub fn scroll_throttle(&self) -> Duration {
        Duration::from_millis(self.scroll_throttle_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Default location: `<config dir>/docview/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Reads a config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the default config file if it exists and is valid, otherwise
    /// returns the built-in defaults.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                tracing::info!("loaded engine config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.page_size == 0 {
            return Err(EngineError::Config("page_size must be at least 1".into()));
        }
        if !(self.row_height > 0.0) {
            return Err(EngineError::Config("row_height must be positive".into()));
        }
        if self.cache_capacity == 0 {
            return Err(EngineError::Config("cache_capacity must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.heap_threshold) {
            return Err(EngineError::Config("heap_threshold must be within 0.0..=1.0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"page_size": 25}"#).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.frame_budget(), Duration::from_millis(16));
    }

    #[test]
    fn test_load_rejects_zero_page_size() {
        let path = env::temp_dir().join("docview_config_zero_page.json");
        fs::write(&path, r#"{"page_size": 0}"#).unwrap();

        let result = EngineConfig::load(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_load_reads_overrides() {
        let path = env::temp_dir().join("docview_config_overrides.json");
        fs::write(&path, r#"{"row_height": 28.0, "hysteresis_rows": 2}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.row_height, 28.0);
        assert_eq!(config.hysteresis_rows, 2);
        assert_eq!(config.page_size, 50);
    }
}
