//! Page decoding capability
//!
//! The pipeline never reads document bytes itself. It only talks to a
//! [`SourceDocument`] that hands out [`PageHandle`]s, each able to report its
//! natural size and paint itself into a raster.

mod memory;

pub use memory::{MemoryDocument, MemoryPage};

use crate::types::{CropRegion, PageSize, RenderIntent, Result};
use image::RgbaImage;

/// One rasterization request for a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// Pixels per page unit
    pub scale: f32,
    /// Region to paint, in unscaled page units. `None` paints the whole page.
    pub crop: Option<CropRegion>,
    /// Exact pixel width of the returned image
    pub width: u32,
    /// Exact pixel height of the returned image
    pub height: u32,
    pub intent: RenderIntent,
}

/// A decoded document
pub trait SourceDocument {
    fn page_count(&self) -> usize;

    /// Open the page at 0-based `index`
    fn page(&self, index: usize) -> Result<Box<dyn PageHandle + '_>>;
}

/// One page of a [`SourceDocument`]
pub trait PageHandle {
    /// 0-based index within the document
    fn index(&self) -> usize;

    /// Natural size at unit scale
    fn size(&self) -> PageSize;

    /// Paint the requested region into an image of exactly `request.width` x `request.height`
    fn render(&self, request: &RenderRequest) -> Result<RgbaImage>;
}
