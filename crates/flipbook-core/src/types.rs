use crate::render::RasterHandle;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlipbookError {
    #[error("Failed to load document: {0}")]
    DocumentLoad(String),
    #[error("Failed to render source page {page} ({stage}): {message}")]
    PageRender {
        /// 1-based source page number
        page: usize,
        stage: RenderStage,
        message: String,
    },
    #[error("Covers-facing layout needs at least 2 pages, got {0}")]
    InsufficientPages(usize),
    #[error("Invalid page geometry: {0}")]
    InvalidGeometry(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Document has no pages")]
    NoPages,
    #[error("Processing run was cancelled")]
    Cancelled,
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FlipbookError>;

/// Which step of page processing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    /// Reading the page's natural size
    Measure,
    /// Rasterizing the whole page
    Render,
    /// Rasterizing the left half of a spread
    SplitLeft,
    /// Rasterizing the right half of a spread
    SplitRight,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderStage::Measure => "measure",
            RenderStage::Render => "render",
            RenderStage::SplitLeft => "split-left",
            RenderStage::SplitRight => "split-right",
        })
    }
}

/// Natural page size at unit scale (72 units per inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(self) -> f32 {
        self.width / self.height
    }

    /// Reject sizes that cannot be classified or rendered
    pub fn validate(self) -> Result<Self> {
        if !self.width.is_finite() || !self.height.is_finite() {
            return Err(FlipbookError::InvalidGeometry(format!(
                "non-finite page size {}x{}",
                self.width, self.height
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(FlipbookError::InvalidGeometry(format!(
                "page size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(self)
    }
}

/// Region of a page in unscaled page units, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// What the decoder should optimize the raster for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderIntent {
    #[default]
    Display,
    Print,
}

/// Result of the aspect-ratio spread test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadDecision {
    pub is_spread: bool,
    pub aspect_ratio: f32,
    pub recommended_split: bool,
    /// Always within [0, 1]
    pub confidence: f32,
}

/// Which half of a split spread a rendered page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadHalf {
    Left,
    Right,
}

/// How a source page will be emitted by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    /// One output page
    Single,
    /// Two output pages, left half then right half
    Spread,
}

impl PageClass {
    pub fn output_pages(self) -> usize {
        match self {
            PageClass::Single => 1,
            PageClass::Spread => 2,
        }
    }
}

/// One entry of the flat page sequence produced by a processing run
#[derive(Debug)]
pub struct RenderedPage {
    /// Sequential 1-based number in output order
    pub page_number: usize,
    pub image: RasterHandle,
    pub width: u32,
    pub height: u32,
    /// Set when this page is one half of a split spread
    pub half: Option<SpreadHalf>,
    /// 1-based index of the source page this entry was produced from
    pub source_page: usize,
    /// True when the page failed to render and a blank stand-in was emitted
    pub placeholder: bool,
}

impl RenderedPage {
    pub fn is_left_half(&self) -> bool {
        self.half == Some(SpreadHalf::Left)
    }

    pub fn is_right_half(&self) -> bool {
        self.half == Some(SpreadHalf::Right)
    }

    /// Source page index, only for halves of a split spread
    pub fn original_source_index(&self) -> Option<usize> {
        self.half.map(|_| self.source_page)
    }
}

/// Two pages shown side by side
#[derive(Debug, Clone, Copy)]
pub struct SpreadPair<'a> {
    pub id: usize,
    pub left: Option<&'a RenderedPage>,
    pub right: Option<&'a RenderedPage>,
    pub is_cover_spread: bool,
    pub is_last_spread: bool,
}

impl<'a> SpreadPair<'a> {
    /// Non-empty sides, left first
    pub fn pages(&self) -> impl Iterator<Item = &'a RenderedPage> {
        self.left.into_iter().chain(self.right)
    }

    pub fn contains(&self, page_number: usize) -> bool {
        self.pages().any(|p| p.page_number == page_number)
    }
}

/// The flat page sequence grouped into openings
#[derive(Debug, Clone, Default)]
pub struct BookLayout<'a> {
    pub spreads: Vec<SpreadPair<'a>>,
    pub total_spreads: usize,
    pub total_pages: usize,
    pub has_odd_pages: bool,
}

impl<'a> BookLayout<'a> {
    pub fn is_empty(&self) -> bool {
        self.spreads.is_empty()
    }

    /// Concatenate every opening's pages, reproducing the sequence the layout was built from
    pub fn flatten(&self) -> Vec<&'a RenderedPage> {
        self.spreads.iter().flat_map(|s| s.pages()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Forward,
    Backward,
}

/// Parameters for animating a turn from one opening to another
#[derive(Debug, Clone, Copy)]
pub struct FlipAnimation<'l, 'a> {
    pub from_spread: &'l SpreadPair<'a>,
    pub to_spread: &'l SpreadPair<'a>,
    pub direction: FlipDirection,
    /// The page nearer the direction of travel, if that side is not empty
    pub flipping_page: Option<&'a RenderedPage>,
}

/// Statistics about a processing run, computable from page geometry alone
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingStatistics {
    pub source_pages: usize,
    pub spreads_detected: usize,
    pub output_pages: usize,
    pub openings: usize,
    /// The final opening has an empty right side
    pub has_odd_pages: bool,
}
