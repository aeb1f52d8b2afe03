//! In-memory documents of flat-colored pages

use super::{PageHandle, RenderRequest, SourceDocument};
use crate::types::*;
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A page whose left and right halves are painted in flat colors
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPage {
    pub size: PageSize,
    pub left_fill: Rgba<u8>,
    pub right_fill: Rgba<u8>,
    /// Rendering this page reports a decoding error
    pub fails: bool,
}

impl MemoryPage {
    pub fn blank(width: f32, height: f32) -> Self {
        Self {
            size: PageSize::new(width, height),
            left_fill: WHITE,
            right_fill: WHITE,
            fails: false,
        }
    }

    pub fn with_fills(mut self, left: Rgba<u8>, right: Rgba<u8>) -> Self {
        self.left_fill = left;
        self.right_fill = right;
        self
    }
}

/// Document held entirely in memory, for previews and tests
#[derive(Debug, Default)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
    renders: AtomicUsize,
}

impl MemoryDocument {
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self {
            pages,
            renders: AtomicUsize::new(0),
        }
    }

    /// Blank pages of the given `(width, height)` sizes
    pub fn from_sizes(sizes: &[(f32, f32)]) -> Self {
        Self::new(
            sizes
                .iter()
                .map(|&(width, height)| MemoryPage::blank(width, height))
                .collect(),
        )
    }

    /// Make the page at 0-based `index` fail to render
    pub fn with_failing_page(mut self, index: usize) -> Self {
        if let Some(page) = self.pages.get_mut(index) {
            page.fails = true;
        }
        self
    }

    /// Number of successful render calls so far
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl SourceDocument for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<Box<dyn PageHandle + '_>> {
        let page = self.pages.get(index).ok_or_else(|| FlipbookError::PageRender {
            page: index + 1,
            stage: RenderStage::Measure,
            message: format!("page index out of range ({} pages)", self.pages.len()),
        })?;

        Ok(Box::new(MemoryPageHandle {
            index,
            page,
            renders: &self.renders,
        }))
    }
}

struct MemoryPageHandle<'a> {
    index: usize,
    page: &'a MemoryPage,
    renders: &'a AtomicUsize,
}

impl PageHandle for MemoryPageHandle<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn size(&self) -> PageSize {
        self.page.size
    }

    fn render(&self, request: &RenderRequest) -> Result<RgbaImage> {
        if self.page.fails {
            return Err(FlipbookError::PageRender {
                page: self.index + 1,
                stage: RenderStage::Render,
                message: "corrupt page content".to_string(),
            });
        }

        let origin_x = request.crop.map(|c| c.x).unwrap_or(0.0);
        let midline = self.page.size.width / 2.0;

        let image = RgbaImage::from_fn(request.width, request.height, |px, _| {
            // Sample at the pixel center, in page units
            let page_x = origin_x + (px as f32 + 0.5) / request.scale;
            if page_x < midline {
                self.page.left_fill
            } else {
                self.page.right_fill
            }
        });

        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(image)
    }
}
