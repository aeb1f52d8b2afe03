//! Display sizing for pages and openings

use crate::constants::{MIN_OPENING_DIMENSION, PORTRAIT_RATIO};

/// A page fitted into a display area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedSize {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

/// Fit a page into a container, never scaling past native resolution.
///
/// `padding` is removed from every side. In spread view two pages share the
/// usable width.
pub fn fit_page(
    container_width: f32,
    container_height: f32,
    page_width: f32,
    page_height: f32,
    is_spread_view: bool,
    padding: f32,
) -> FittedSize {
    let usable_width = (container_width - 2.0 * padding).max(0.0);
    let usable_height = (container_height - 2.0 * padding).max(0.0);
    let per_page_width = if is_spread_view {
        usable_width / 2.0
    } else {
        usable_width
    };

    let scale = if page_width > 0.0 && page_height > 0.0 {
        (per_page_width / page_width)
            .min(usable_height / page_height)
            .min(1.0)
            .max(0.0)
    } else {
        0.0
    };

    FittedSize {
        width: (page_width * scale).floor() as u32,
        height: (page_height * scale).floor() as u32,
        scale,
    }
}

/// Constraints for sizing a whole two-page opening
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpeningFit {
    pub padding: f32,
    pub min_width: f32,
    pub min_height: f32,
}

impl Default for OpeningFit {
    fn default() -> Self {
        Self {
            padding: 0.0,
            min_width: MIN_OPENING_DIMENSION,
            min_height: MIN_OPENING_DIMENSION,
        }
    }
}

/// Size of one page within an opening, and of the opening itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningSize {
    pub page_width: u32,
    pub page_height: u32,
    pub opening_width: u32,
}

/// Fit a two-page opening of pages with the given width/height ratio.
///
/// Tries filling the width first and falls back to filling the height when
/// that would overflow vertically. Each axis is clamped to the configured
/// minimum, so an empty container still yields a usable size.
pub fn fit_opening(
    container_width: f32,
    container_height: f32,
    page_aspect: f32,
    fit: &OpeningFit,
) -> OpeningSize {
    let aspect = if page_aspect.is_finite() && page_aspect > 0.0 {
        page_aspect
    } else {
        PORTRAIT_RATIO
    };

    let usable_width = (container_width - 2.0 * fit.padding).max(0.0);
    let usable_height = (container_height - 2.0 * fit.padding).max(0.0);

    // Width-bound: two pages span the usable width
    let width_bound_page_width = usable_width / 2.0;
    let width_bound_page_height = width_bound_page_width / aspect;

    let (page_width, page_height) = if width_bound_page_height <= usable_height {
        (width_bound_page_width, width_bound_page_height)
    } else {
        // Height-bound
        (usable_height * aspect, usable_height)
    };

    let opening_width = (page_width * 2.0).max(fit.min_width);
    let page_height = page_height.max(fit.min_height);

    OpeningSize {
        page_width: (opening_width / 2.0).floor() as u32,
        page_height: page_height.floor() as u32,
        opening_width: opening_width.floor() as u32,
    }
}
