//! Build configuration.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives at
//! the albums root (next to the album directories) and is optional: stock
//! defaults are used for anything it doesn't set.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! sizes = [800, 1600, 3200] # Derivative widths to generate per photo
//! quality = 75              # Encoder quality (1-100)
//! format = "avif"           # "avif" or "jpeg"
//!
//! [cache]
//! dir = ".resized_images"   # Derivative directory inside each album
//!
//! [tags]
//! # index = "public/search.sqlite"  # Prebuilt search index (omit to skip tags)
//! timeout_ms = 250          # Give up on a locked index after this long
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [images]
//! sizes = [1200, 2400]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the albums root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Derivative generation settings (widths, quality, format).
    pub images: ImagesConfig,
    /// Derivative cache location.
    pub cache: CacheConfig,
    /// Search index used for tag enrichment.
    pub tags: TagsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.sizes.is_empty() {
            return Err(ConfigError::Validation(
                "images.sizes must not be empty".into(),
            ));
        }
        if self.images.sizes.contains(&0) {
            return Err(ConfigError::Validation(
                "images.sizes values must be non-zero".into(),
            ));
        }
        let dir = Path::new(&self.cache.dir);
        if self.cache.dir.is_empty() || dir.components().count() != 1 || dir.is_absolute() {
            return Err(ConfigError::Validation(
                "cache.dir must be a single directory name".into(),
            ));
        }
        Ok(())
    }

    /// Configured widths, deduplicated and ascending.
    pub fn target_widths(&self) -> Vec<u32> {
        let mut widths = self.images.sizes.clone();
        widths.sort_unstable();
        widths.dedup();
        widths
    }
}

/// Derivative generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Pixel widths to generate for every photo.
    pub sizes: Vec<u32>,
    /// Encoder quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Output format of derivatives.
    pub format: OutputFormat,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            sizes: vec![800, 1600, 3200],
            quality: 75,
            format: OutputFormat::Avif,
        }
    }
}

/// Derivative cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory name, created inside each album directory.
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: ".resized_images".to_string(),
        }
    }
}

/// Tag lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagsConfig {
    /// Path to the SQLite search index. No tags are looked up when absent.
    pub index: Option<PathBuf>,
    /// How long a lookup may wait on a locked index, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            index: None,
            timeout_ms: 250,
        }
    }
}

impl TagsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# album-forge configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the albums root, next to the album directories.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Derivative images
# ---------------------------------------------------------------------------
[images]
# Pixel widths generated for every photo. Removing a width here makes the
# next clean pass delete its cached files.
sizes = [800, 1600, 3200]

# Encoder quality (1 = worst, 100 = best).
quality = 75

# Output format: "avif" or "jpeg".
format = "avif"

# ---------------------------------------------------------------------------
# Derivative cache
# ---------------------------------------------------------------------------
[cache]
# Directory created inside each album to hold derivatives.
dir = ".resized_images"

# ---------------------------------------------------------------------------
# Tags
# ---------------------------------------------------------------------------
[tags]
# Prebuilt SQLite search index. Photos are built without tags when unset
# or when the index can't be opened.
# index = "public/search.sqlite"

# Lookups waiting longer than this on a locked index are skipped.
timeout_ms = 250

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
