//! PDFium-backed page decoding

use crate::source::{PageHandle, RenderRequest, SourceDocument};
use crate::types::*;
use image::{Rgba, RgbaImage, imageops};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Where to find the PDFium shared library
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderLocation {
    /// Directory holding the platform's PDFium library
    pub library_dir: Option<PathBuf>,
}

static DECODER_LOCATION: OnceLock<DecoderLocation> = OnceLock::new();

/// Record the decoder location for the rest of the process.
///
/// Only the first call has any effect; returns whether this call set it.
pub fn init_decoder(location: DecoderLocation) -> bool {
    let set = DECODER_LOCATION.set(location).is_ok();
    if set {
        log::debug!("PDFium location initialized: {:?}", DECODER_LOCATION.get());
    }
    set
}

/// Bind PDFium, trying the configured location, then the vendored library, then the system
pub fn bind_pdfium() -> Result<Pdfium> {
    let configured = DECODER_LOCATION
        .get()
        .and_then(|location| location.library_dir.clone());

    // When running from cargo, the working directory is the workspace root
    let vendored = std::env::current_dir().ok().and_then(|mut p| {
        p.push("vendor/pdfium/lib");
        if p.exists() { Some(p) } else { None }
    });

    for dir in configured.into_iter().chain(vendored) {
        match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => log::debug!("No usable PDFium in {}: {}", dir.display(), e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| FlipbookError::DocumentLoad(format!("Failed to bind PDFium: {}", e)))
}

/// A document opened through PDFium
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    pub fn open(pdfium: &'a Pdfium, path: &Path) -> Result<Self> {
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| FlipbookError::DocumentLoad(format!("{}: {}", path.display(), e)))?;
        Ok(Self { document })
    }

    pub fn from_bytes(pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<Self> {
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| FlipbookError::DocumentLoad(e.to_string()))?;
        Ok(Self { document })
    }
}

impl SourceDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page(&self, index: usize) -> Result<Box<dyn PageHandle + '_>> {
        let measure_error = |message: String| FlipbookError::PageRender {
            page: index + 1,
            stage: RenderStage::Measure,
            message,
        };

        let page_index = u16::try_from(index)
            .map_err(|_| measure_error("page index exceeds PDFium range".to_string()))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| measure_error(e.to_string()))?;

        Ok(Box::new(PdfiumPage { index, page }))
    }
}

struct PdfiumPage<'a> {
    index: usize,
    page: PdfPage<'a>,
}

impl PageHandle for PdfiumPage<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn size(&self) -> PageSize {
        PageSize::new(self.page.width().value, self.page.height().value)
    }

    fn render(&self, request: &RenderRequest) -> Result<RgbaImage> {
        let size = self.size();

        // Paint the whole page at the final scale, then cut the region out
        let full_width = (size.width * request.scale).round().max(1.0) as i32;
        let full_height = (size.height * request.scale).round().max(1.0) as i32;

        let config = PdfRenderConfig::new()
            .set_target_width(full_width)
            .set_maximum_height(full_height)
            .use_print_quality(request.intent == RenderIntent::Print);

        let bitmap = self
            .page
            .render_with_config(&config)
            .map_err(|e| FlipbookError::PageRender {
                page: self.index + 1,
                stage: RenderStage::Render,
                message: e.to_string(),
            })?;
        let rendered = RgbaImage::from_raw(
            bitmap.width() as u32,
            bitmap.height() as u32,
            bitmap.as_rgba_bytes(),
        )
        .ok_or_else(|| FlipbookError::PageRender {
            page: self.index + 1,
            stage: RenderStage::Render,
            message: "bitmap size does not match its pixel data".to_string(),
        })?;

        let (x, y) = match request.crop {
            Some(region) => (
                (region.x * request.scale).round().max(0.0) as u32,
                (region.y * request.scale).round().max(0.0) as u32,
            ),
            None => (0, 0),
        };

        // Rounding can leave the bitmap a pixel short; pad with white
        let region = imageops::crop_imm(&rendered, x, y, request.width, request.height).to_image();
        let mut canvas = RgbaImage::from_pixel(request.width, request.height, Rgba([255, 255, 255, 255]));
        imageops::replace(&mut canvas, &region, 0, 0);

        Ok(canvas)
    }
}
