//! Runtime configuration: timings, overlay geometry and file locations
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock behaviour. Files are parsed as JSON5 so they may carry comments.

use crate::error::{IndicatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_DIR: &str = "aws-account-indicator";
pub const POSITION_CACHE_KEY: &str = "aws-watermark-position";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndicatorConfig {
    pub timings: Timings,
    pub overlay: OverlayConfig,

    /// Settings file used by the CLI store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
}

/// Scheduling delays, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timings {
    pub initial_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub dom_debounce_ms: u64,
    pub observer_start_ms: u64,
    pub url_poll_ms: u64,
    pub resize_debounce_ms: u64,
    pub post_create_adjust_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2000,
            retry_delay_ms: 3000,
            dom_debounce_ms: 500,
            observer_start_ms: 3000,
            url_poll_ms: 2000,
            resize_debounce_ms: 100,
            post_create_adjust_ms: 100,
        }
    }
}

impl Timings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    /// Minimum gap kept between the watermark and the viewport edge
    pub margin: i32,

    /// Distance of the default position from the bottom-right corner
    pub default_offset_x: i32,
    pub default_offset_y: i32,

    /// Box assumed for a saved position before the element has been measured
    pub estimated_width: i32,
    pub estimated_height: i32,

    pub z_index: u32,
    pub position_cache_key: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            margin: 10,
            default_offset_x: 210,
            default_offset_y: 110,
            estimated_width: 200,
            estimated_height: 100,
            z_index: 999_999,
            position_cache_key: POSITION_CACHE_KEY.to_string(),
        }
    }
}

impl IndicatorConfig {
    pub fn from_json5(content: &str) -> Result<Self> {
        json5::from_str(content).map_err(|e| IndicatorError::Config(e.to_string()))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json5(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(feature = "cli")]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.json5")
}

#[cfg(feature = "cli")]
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("settings.json")
}
