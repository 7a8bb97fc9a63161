//! Operator-facing filter options.
//!
//! Options arrive as an FFmpeg-style `key=value:key=value` string and are
//! validated into a [`FilterOptions`] before the filter is constructed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::{BlendingMode, ColorRange, PassMode};
use crate::error::FilterError;

pub const MIN_RATIO: f32 = 1.0;
pub const MAX_RATIO: f32 = 2.0;
pub const DEFAULT_RATIO: f32 = 2.0;
pub const DEFAULT_FILTER_FOLDER: &str = "filters_2x/filters_lowres";

/// Immutable-after-start filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Upscale factor per axis, 1.0–2.0.
    pub ratio: f32,
    /// Model bit depth, 8 or 10.
    pub bits: u32,
    pub range: ColorRange,
    /// Path to the model weight folder.
    pub filterfolder: PathBuf,
    pub blending: BlendingMode,
    /// Number of engine passes, 1 or 2.
    pub passes: u32,
    /// Which pass upscales; meaningful only when passes=2.
    pub mode: PassMode,
    /// Force even output dimensions by dropping one pixel where needed.
    pub evenoutput: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_RATIO,
            bits: 8,
            range: ColorRange::Video,
            filterfolder: PathBuf::from(DEFAULT_FILTER_FOLDER),
            blending: BlendingMode::CountOfBitsChanged,
            passes: 1,
            mode: PassMode::UpscaleFirstPass,
            evenoutput: false,
        }
    }
}

impl FilterOptions {
    /// Parse a `key=value:key=value` option string. Unknown keys and
    /// out-of-range values are rejected.
    pub fn parse(spec: &str) -> Result<Self, FilterError> {
        let mut options = Self::default();
        if spec.trim().is_empty() {
            return Ok(options);
        }

        for segment in spec.split(':') {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| FilterError::InvalidOption(format!("expected key=value, got '{segment}'")))?;
            options.apply(key.trim(), value.trim())?;
        }
        Ok(options)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), FilterError> {
        match key {
            "ratio" => {
                let ratio: f32 = value
                    .parse()
                    .map_err(|_| invalid(key, value))?;
                if !(MIN_RATIO..=MAX_RATIO).contains(&ratio) {
                    return Err(FilterError::InvalidOption(format!(
                        "ratio must be between {MIN_RATIO} and {MAX_RATIO}, got {value}"
                    )));
                }
                self.ratio = ratio;
            }
            "bits" => {
                self.bits = match value {
                    "8" => 8,
                    "10" => 10,
                    _ => return Err(FilterError::InvalidOption(format!("bits must be 8 or 10, got {value}"))),
                };
            }
            "range" => {
                self.range = match value {
                    "video" => ColorRange::Video,
                    "full" => ColorRange::Full,
                    _ => return Err(invalid(key, value)),
                };
            }
            "filterfolder" => {
                if value.is_empty() {
                    return Err(FilterError::InvalidOption("filterfolder must not be empty".into()));
                }
                self.filterfolder = PathBuf::from(value);
            }
            "blending" => {
                self.blending = match value.to_ascii_lowercase().as_str() {
                    "randomness" | "1" => BlendingMode::Randomness,
                    "countofbitschanged" | "2" => BlendingMode::CountOfBitsChanged,
                    _ => return Err(invalid(key, value)),
                };
            }
            "passes" => {
                self.passes = match value {
                    "1" => 1,
                    "2" => 2,
                    _ => return Err(FilterError::InvalidOption(format!("passes must be 1 or 2, got {value}"))),
                };
            }
            "mode" => {
                self.mode = match value {
                    "1" => PassMode::UpscaleFirstPass,
                    "2" => PassMode::UpscaleSecondPass,
                    _ => return Err(FilterError::InvalidOption(format!("mode must be 1 or 2, got {value}"))),
                };
            }
            "evenoutput" => {
                self.evenoutput = match value {
                    "1" | "true" => true,
                    "0" | "false" => false,
                    _ => return Err(invalid(key, value)),
                };
            }
            _ => return Err(FilterError::InvalidOption(format!("unknown option '{key}'"))),
        }
        Ok(())
    }
}

impl FilterOptions {
    /// Check that the configured model folder exists and holds filter
    /// files, returning the file count. The engine loads and validates the
    /// weights itself at initialization; this is the early host-side check
    /// used by tooling.
    pub fn check_model_folder(&self) -> Result<usize, FilterError> {
        let folder = &self.filterfolder;
        if !folder.is_dir() {
            return Err(FilterError::InvalidOption(format!(
                "filterfolder is not a directory: {}",
                folder.display()
            )));
        }
        let count = std::fs::read_dir(folder)
            .map_err(|e| {
                FilterError::InvalidOption(format!("cannot read {}: {}", folder.display(), e))
            })?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .count();
        if count == 0 {
            return Err(FilterError::InvalidOption(format!(
                "filterfolder is empty: {}",
                folder.display()
            )));
        }
        Ok(count)
    }
}

fn invalid(key: &str, value: &str) -> FilterError {
    FilterError::InvalidOption(format!("invalid value '{value}' for {key}"))
}
