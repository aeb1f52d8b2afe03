//! Splitting a spread page into its two halves

use crate::options::ProcessingOptions;
use crate::source::PageHandle;
use crate::types::*;
use std::sync::Arc;

use super::{RasterHandle, RasterLedger, rasterize};

/// Rasters of both halves of a spread
#[derive(Debug)]
pub struct SplitRasters {
    pub left: RasterHandle,
    pub right: RasterHandle,
}

/// Left and right halves of a page, meeting at the vertical midline
pub fn split_regions(size: PageSize) -> (CropRegion, CropRegion) {
    let half_width = size.width / 2.0;
    let left = CropRegion {
        x: 0.0,
        y: 0.0,
        width: half_width,
        height: size.height,
    };
    let right = CropRegion {
        x: half_width,
        y: 0.0,
        width: half_width,
        height: size.height,
    };
    (left, right)
}

/// Rasterize the two halves of a spread page independently.
pub fn split_spread_page(
    page: &dyn PageHandle,
    options: &ProcessingOptions,
    ledger: &Arc<RasterLedger>,
) -> Result<SplitRasters> {
    let size = page.size().validate()?;
    let (left_region, right_region) = split_regions(size);

    let left = rasterize(page, options, Some(left_region), ledger)
        .map_err(|e| e.at_stage(RenderStage::SplitLeft))?;
    let right = rasterize(page, options, Some(right_region), ledger)
        .map_err(|e| e.at_stage(RenderStage::SplitRight))?;

    Ok(SplitRasters { left, right })
}

impl FlipbookError {
    /// Re-tag a page render failure with the step it happened in
    pub(crate) fn at_stage(self, stage: RenderStage) -> Self {
        match self {
            FlipbookError::PageRender { page, message, .. } => FlipbookError::PageRender {
                page,
                stage,
                message,
            },
            other => other,
        }
    }
}
