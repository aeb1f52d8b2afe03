use crate::constants::*;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where the per-document baseline aspect ratio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoverBaseline {
    /// Page 1's own ratio. Page 1 itself can never be split.
    #[default]
    FirstPage,
    /// Page 1 is split when it is clearly double-wide, and half its ratio becomes the baseline
    DetectCoverSpread,
}

/// What to do when a single page fails to rasterize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PageErrorPolicy {
    /// Abort the whole run
    #[default]
    Abort,
    /// Emit a blank page of the expected size and keep going
    Placeholder,
}

/// Configuration for one processing run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProcessingOptions {
    // Resolution
    pub dpi: f32,
    pub max_width: u32,
    pub max_height: u32,

    // Spread handling
    pub spread_threshold: f32,
    pub enable_spread_split: bool,
    pub cover_baseline: CoverBaseline,

    // Failure handling
    pub on_page_error: PageErrorPolicy,

    pub render_intent: RenderIntent,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            max_width: DEFAULT_MAX_DIMENSION,
            max_height: DEFAULT_MAX_DIMENSION,
            spread_threshold: DEFAULT_SPREAD_THRESHOLD,
            enable_spread_split: true,
            cover_baseline: CoverBaseline::FirstPage,
            on_page_error: PageErrorPolicy::Abort,
            render_intent: RenderIntent::Display,
        }
    }
}

impl ProcessingOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| FlipbookError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FlipbookError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if !self.dpi.is_finite() || self.dpi <= 0.0 {
            return Err(FlipbookError::Config(format!(
                "DPI must be a positive number, got {}",
                self.dpi
            )));
        }

        if !self.spread_threshold.is_finite() || self.spread_threshold <= 1.0 {
            return Err(FlipbookError::Config(format!(
                "Spread threshold must be greater than 1.0, got {}",
                self.spread_threshold
            )));
        }

        if self.max_width == 0 || self.max_height == 0 {
            return Err(FlipbookError::Config(
                "Maximum width and height must be greater than 0".to_string(),
            ));
        }

        let (low, high) = RECOMMENDED_DPI_RANGE;
        if self.dpi < low || self.dpi > high {
            log::warn!(
                "DPI {} is outside the recommended range {}-{}",
                self.dpi,
                low,
                high
            );
        }

        Ok(())
    }
}
