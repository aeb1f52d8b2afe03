//! Shared constants for page processing and book layout
//!
//! This module centralizes the tuned thresholds and defaults used by the
//! spread heuristics, the renderer and the display sizing.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Page coordinate units per inch
pub const POINTS_PER_INCH: f32 = 72.0;

// =============================================================================
// Spread Detection
// =============================================================================

/// Aspect ratio above which a detected spread should be split
pub const RECOMMENDED_SPLIT_RATIO: f32 = 1.8;

/// Aspect ratio of a true double-wide page
pub const DOUBLE_PAGE_RATIO: f32 = 2.0;

/// Canonical single-page portrait aspect ratio
pub const PORTRAIT_RATIO: f32 = 0.7;

/// A page this many times wider than the cover is always a spread
pub const COVER_SPREAD_FACTOR: f32 = 1.8;

/// A page above the spread threshold must also be this many times wider than the cover
pub const COVER_THRESHOLD_FACTOR: f32 = 1.5;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_DPI: f32 = 150.0;

/// Recommended DPI range; values outside it are accepted with a warning
pub const RECOMMENDED_DPI_RANGE: (f32, f32) = (150.0, 300.0);

pub const DEFAULT_SPREAD_THRESHOLD: f32 = 1.2;

pub const DEFAULT_MAX_DIMENSION: u32 = 1600;

// =============================================================================
// Display Sizing
// =============================================================================

/// Smallest width or height an opening is ever sized to (pixels)
pub const MIN_OPENING_DIMENSION: f32 = 300.0;

// =============================================================================
// Default Page Dimensions
// =============================================================================

/// Page size assumed when a document does not declare one (US Letter, points)
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);
