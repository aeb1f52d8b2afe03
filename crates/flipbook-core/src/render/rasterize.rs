//! Page rasterization at a target DPI
//!
//! Output size is the page (or crop) size at `dpi / 72`, shrunk uniformly
//! when it would exceed the configured maximum dimensions. The decoder is
//! always driven with the final, post-fit scale.

use crate::constants::POINTS_PER_INCH;
use crate::options::ProcessingOptions;
use crate::source::{PageHandle, RenderRequest};
use crate::types::*;
use std::sync::Arc;

use super::{RasterHandle, RasterLedger};

const PIXEL_SNAP_EPSILON: f64 = 1e-6;

/// Final scale and pixel size of one rasterization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub scale: f32,
    pub width: u32,
    pub height: u32,
}

/// Compute the render target for a page, or a crop of it.
pub fn render_target(
    size: PageSize,
    crop: Option<CropRegion>,
    options: &ProcessingOptions,
) -> RenderTarget {
    let (region_width, region_height) = match crop {
        Some(region) => (region.width, region.height),
        None => (size.width, size.height),
    };

    let scale = f64::from(options.dpi) / f64::from(POINTS_PER_INCH);
    let target_width = f64::from(region_width) * scale;
    let target_height = f64::from(region_height) * scale;

    let max_width = f64::from(options.max_width);
    let max_height = f64::from(options.max_height);

    if target_width <= max_width && target_height <= max_height {
        return RenderTarget {
            scale: scale as f32,
            width: to_pixels(target_width),
            height: to_pixels(target_height),
        };
    }

    let width_ratio = max_width / target_width;
    let height_ratio = max_height / target_height;

    // The binding axis lands exactly on its maximum
    if width_ratio <= height_ratio {
        RenderTarget {
            scale: (scale * width_ratio) as f32,
            width: options.max_width,
            height: to_pixels(target_height * width_ratio).min(options.max_height),
        }
    } else {
        RenderTarget {
            scale: (scale * height_ratio) as f32,
            width: to_pixels(target_width * height_ratio).min(options.max_width),
            height: options.max_height,
        }
    }
}

/// Floor to whole pixels, snapping values that are an integer up to float noise
fn to_pixels(value: f64) -> u32 {
    let nearest = value.round();
    let pixels = if (value - nearest).abs() < PIXEL_SNAP_EPSILON {
        nearest
    } else {
        value.floor()
    };
    (pixels as u32).max(1)
}

/// Rasterize a page, or only `crop` of it, into a new raster owned by `ledger`.
pub fn rasterize(
    page: &dyn PageHandle,
    options: &ProcessingOptions,
    crop: Option<CropRegion>,
    ledger: &Arc<RasterLedger>,
) -> Result<RasterHandle> {
    let size = page.size().validate()?;
    let target = render_target(size, crop, options);

    let request = RenderRequest {
        scale: target.scale,
        crop,
        width: target.width,
        height: target.height,
        intent: options.render_intent,
    };

    let image = page.render(&request)?;

    if image.width() != target.width || image.height() != target.height {
        return Err(FlipbookError::PageRender {
            page: page.index() + 1,
            stage: RenderStage::Render,
            message: format!(
                "decoder returned {}x{}, expected {}x{}",
                image.width(),
                image.height(),
                target.width,
                target.height
            ),
        });
    }

    Ok(RasterHandle::new(image, ledger))
}
