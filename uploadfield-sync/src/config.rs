//! Per-instance field configuration.
//!
//! Immutable for the lifetime of a field instance. Mode flags govern the
//! store's list shape and the wire format; the timing knobs bound the
//! widget readiness poll and the ingest debounce window.

use std::time::Duration;
use thiserror::Error;
use uploadfield_store::StoreMode;

/// Errors produced by configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Crop preset value is not `free` or a `W:H` aspect ratio.
    #[error("invalid crop preset value: {0:?}")]
    InvalidCropPreset(String),

    /// File size string could not be parsed.
    #[error("invalid size: {0:?} (use B, KB, MB, GB or TB)")]
    InvalidSize(String),

    /// `multiple_min` exceeds `multiple_max`.
    #[error("multiple_min ({min}) exceeds multiple_max ({max})")]
    CountBounds { min: u32, max: u32 },
}

/// Configuration for one field instance.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    /// Unique context name identifying this instance; widget events carry
    /// it and events for other contexts are discarded.
    pub ctx_name: String,
    /// Multiple-file mode (append) vs single-file mode (replace).
    pub is_multiple: bool,
    /// Rich-object wire format instead of bare URLs.
    pub is_with_metadata: bool,
    /// Minimum file count in multiple mode (0 = unbounded).
    pub multiple_min: u32,
    /// Maximum file count in multiple mode (0 = unbounded).
    pub multiple_max: u32,
    /// Accepted MIME patterns, widget-side filter.
    pub accepted_file_types: Vec<String>,
    /// Upload source list, widget-side.
    pub source_list: Vec<String>,
    /// Crop preset string: empty, `free`, or comma-separated `W:H` ratios.
    pub crop_preset: String,
    /// Maximum local file size in bytes.
    pub max_local_file_size_bytes: u64,
    /// CDN host the widget serves files from.
    pub cdn_cname: String,
    /// Bounded widget readiness poll: retry count.
    pub max_widget_retries: u32,
    /// Bounded widget readiness poll: fixed interval.
    pub widget_retry_interval: Duration,
    /// Ingest debounce window.
    pub debounce: Duration,
    /// Bounded locales-ready poll before hydration: retry count.
    pub max_locales_polls: u32,
    /// Bounded locales-ready poll before hydration: fixed interval.
    pub locales_poll_interval: Duration,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            ctx_name: String::new(),
            is_multiple: false,
            is_with_metadata: false,
            multiple_min: 0,
            multiple_max: 0,
            accepted_file_types: vec![
                "image/*".to_string(),
                "video/*".to_string(),
                "audio/*".to_string(),
                "application/*".to_string(),
            ],
            source_list: vec!["local".to_string()],
            crop_preset: String::new(),
            max_local_file_size_bytes: 524_288_000, // 500MB default
            cdn_cname: "https://ucarecdn.com".to_string(),
            max_widget_retries: 10,
            widget_retry_interval: Duration::from_millis(100),
            debounce: Duration::from_millis(150),
            max_locales_polls: 10,
            locales_poll_interval: Duration::from_millis(100),
        }
    }
}

impl FieldConfig {
    /// Creates a configuration for the given context name with defaults.
    #[must_use]
    pub fn new(ctx_name: impl Into<String>) -> Self {
        Self {
            ctx_name: ctx_name.into(),
            ..Default::default()
        }
    }

    /// Returns the store mode flags derived from this configuration.
    #[must_use]
    pub fn store_mode(&self) -> StoreMode {
        StoreMode {
            multiple: self.is_multiple,
            with_metadata: self.is_with_metadata,
        }
    }

    /// Validates cross-field constraints and the crop preset grammar.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.multiple_min > 0 && self.multiple_max > 0 && self.multiple_min > self.multiple_max
        {
            return Err(ConfigError::CountBounds {
                min: self.multiple_min,
                max: self.multiple_max,
            });
        }
        validate_crop_preset(&self.crop_preset)?;
        Ok(())
    }
}

/// Validates a crop preset string: empty, or comma-separated values each of
/// which is `free` or an aspect ratio like `1:1`, `16:9`, `1.91:1`.
pub fn validate_crop_preset(preset: &str) -> Result<(), ConfigError> {
    if preset.is_empty() {
        return Ok(());
    }
    for value in preset.split(',') {
        let value = value.trim();
        if value != "free" && !is_aspect_ratio(value) {
            return Err(ConfigError::InvalidCropPreset(value.to_string()));
        }
    }
    Ok(())
}

/// Parses a human-readable size like `500MB` into bytes (1024-based).
pub fn parse_size(size: &str) -> Result<u64, ConfigError> {
    let size = size.trim();
    let split = size
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ConfigError::InvalidSize(size.to_string()))?;
    let (number, unit) = size.split_at(split);
    let number: u64 = number
        .parse()
        .map_err(|_| ConfigError::InvalidSize(size.to_string()))?;

    let exponent = match unit.trim().to_ascii_uppercase().as_str() {
        "B" => 0u32,
        "KB" => 1,
        "MB" => 2,
        "GB" => 3,
        "TB" => 4,
        _ => return Err(ConfigError::InvalidSize(size.to_string())),
    };
    Ok(number * 1024u64.pow(exponent))
}

fn is_aspect_ratio(value: &str) -> bool {
    let Some((w, h)) = value.split_once(':') else {
        return false;
    };
    is_decimal(w) && is_decimal(h)
}

/// A positive decimal number: digits with at most one interior dot.
fn is_decimal(s: &str) -> bool {
    if s.is_empty() || s.starts_with('.') || s.ends_with('.') {
        return false;
    }
    let mut dots = 0;
    s.chars().all(|c| {
        if c == '.' {
            dots += 1;
            dots <= 1
        } else {
            c.is_ascii_digit()
        }
    })
}
