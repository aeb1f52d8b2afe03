//! Spread detection
//!
//! A "spread" is a single source page whose artwork holds two book pages
//! side by side. Detection is purely geometric:
//!
//! - [`detect_spread`] judges one page in isolation against a threshold.
//! - [`SpreadClassifier`] judges every page of a document against a baseline
//!   taken from page 1, which is what the processing pipeline uses.

use crate::constants::*;
use crate::options::{CoverBaseline, ProcessingOptions};
use crate::types::*;

/// Decide whether a page of the given size is a spread.
///
/// `is_spread` holds iff `width / height >= threshold`. Confidence grows toward 1
/// as a spread approaches a true 2:1 page, and as a single page approaches the
/// canonical 0.7 portrait ratio.
pub fn detect_spread(width: f32, height: f32, threshold: f32) -> Result<SpreadDecision> {
    if !width.is_finite() || !height.is_finite() || !threshold.is_finite() {
        return Err(FlipbookError::InvalidGeometry(format!(
            "non-finite spread detection input (width={}, height={}, threshold={})",
            width, height, threshold
        )));
    }

    let aspect_ratio = width / height;
    if !aspect_ratio.is_finite() {
        return Err(FlipbookError::InvalidGeometry(format!(
            "aspect ratio of {}x{} is not finite",
            width, height
        )));
    }

    let is_spread = aspect_ratio >= threshold;
    let recommended_split = is_spread && aspect_ratio >= RECOMMENDED_SPLIT_RATIO;

    let confidence = if is_spread {
        let span = DOUBLE_PAGE_RATIO - threshold;
        if span > 0.0 {
            clamp01((aspect_ratio - threshold) / span)
        } else {
            // Threshold at or past 2:1, anything that clears it is certain
            1.0
        }
    } else {
        clamp01(1.0 - (aspect_ratio - PORTRAIT_RATIO).abs() / PORTRAIT_RATIO)
    };

    Ok(SpreadDecision {
        is_spread,
        aspect_ratio,
        recommended_split,
        confidence,
    })
}

fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Per-document spread classification against a page-1 baseline.
///
/// Built in two explicit phases: [`SpreadClassifier::from_cover`] extracts the
/// baseline, then [`SpreadClassifier::classify`] is applied to every page,
/// page 1 included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadClassifier {
    baseline_ratio: f32,
    threshold: f32,
    enabled: bool,
    /// Fixed decision for page 1 when the cover was judged on its own
    cover_override: Option<PageClass>,
}

impl SpreadClassifier {
    pub fn from_cover(cover: PageSize, options: &ProcessingOptions) -> Result<Self> {
        let cover = cover.validate()?;
        let cover_ratio = cover.aspect_ratio();

        let (baseline_ratio, cover_override) = match options.cover_baseline {
            CoverBaseline::FirstPage => (cover_ratio, None),
            CoverBaseline::DetectCoverSpread => {
                let decision =
                    detect_spread(cover.width, cover.height, options.spread_threshold)?;
                if options.enable_spread_split && decision.recommended_split {
                    (cover_ratio / 2.0, Some(PageClass::Spread))
                } else {
                    (cover_ratio, Some(PageClass::Single))
                }
            }
        };

        Ok(Self {
            baseline_ratio,
            threshold: options.spread_threshold,
            enabled: options.enable_spread_split,
            cover_override,
        })
    }

    /// Aspect ratio every page is compared against
    pub fn baseline_ratio(&self) -> f32 {
        self.baseline_ratio
    }

    /// Classify the page at 0-based `index`
    pub fn classify(&self, index: usize, size: PageSize) -> Result<PageClass> {
        if index == 0 {
            if let Some(class) = self.cover_override {
                return Ok(class);
            }
        }

        let ratio = size.validate()?.aspect_ratio();
        let base = self.baseline_ratio;

        let is_spread = self.enabled
            && (ratio >= base * COVER_SPREAD_FACTOR
                || (ratio >= self.threshold && ratio >= base * COVER_THRESHOLD_FACTOR));

        Ok(if is_spread {
            PageClass::Spread
        } else {
            PageClass::Single
        })
    }
}

/// Classify every page of a document from its page sizes alone
pub fn classify_sizes(sizes: &[PageSize], options: &ProcessingOptions) -> Result<Vec<PageClass>> {
    let cover = *sizes.first().ok_or(FlipbookError::NoPages)?;
    let classifier = SpreadClassifier::from_cover(cover, options)?;

    sizes
        .iter()
        .enumerate()
        .map(|(index, &size)| classifier.classify(index, size))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
