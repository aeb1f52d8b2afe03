//! Page processing pipeline
//!
//! Turns a source document into the flat, numbered page sequence:
//! 1. Measure page 1 to fix the document's baseline aspect ratio
//! 2. Classify every page, page 1 included, against that baseline
//! 3. Rasterize single pages whole and spread pages as two halves
//! 4. Number the output sequentially in source order and report progress

use crate::detect::SpreadClassifier;
use crate::options::{PageErrorPolicy, ProcessingOptions};
use crate::render::{
    RasterHandle, RasterLedger, rasterize, release_pages, render_target, split_regions,
    split_spread_page,
};
use crate::source::SourceDocument;
use crate::types::*;
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag for abandoning a run between pages
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run state: the raster ledger and the cancellation flag
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub ledger: Arc<RasterLedger>,
    pub cancel: CancelToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Rasters produced for one source page, before numbering
#[derive(Debug)]
struct SourceOutput {
    /// 1-based
    source_page: usize,
    rasters: Vec<(Option<SpreadHalf>, RasterHandle)>,
    placeholder: bool,
}

/// Process every page of `document` in order, with a fresh run context.
pub fn process_document<D>(
    document: &D,
    options: &ProcessingOptions,
    on_progress: impl FnMut(f32),
) -> Result<Vec<RenderedPage>>
where
    D: SourceDocument + ?Sized,
{
    process_document_with(document, options, &RunContext::new(), on_progress)
}

/// Process every page of `document` in order.
///
/// `on_progress` is called once per source page with the fraction of pages
/// done; the last call is exactly 1.0. On failure or cancellation every
/// raster produced so far is released before returning.
pub fn process_document_with<D>(
    document: &D,
    options: &ProcessingOptions,
    context: &RunContext,
    mut on_progress: impl FnMut(f32),
) -> Result<Vec<RenderedPage>>
where
    D: SourceDocument + ?Sized,
{
    let (page_count, classifier) = prepare(document, options)?;

    let mut pages = Vec::with_capacity(page_count);
    for index in 0..page_count {
        if context.cancel.is_cancelled() {
            release_pages(&mut pages);
            log::info!("Run cancelled after {} of {} pages", index, page_count);
            return Err(FlipbookError::Cancelled);
        }

        match render_source_page(document, index, &classifier, options, &context.ledger) {
            Ok(output) => append_output(&mut pages, output),
            Err(e) => {
                release_pages(&mut pages);
                return Err(e);
            }
        }

        on_progress((index + 1) as f32 / page_count as f32);
    }

    log::info!(
        "Processed {} source pages into {} pages",
        page_count,
        pages.len()
    );
    Ok(pages)
}

/// Process pages on the rayon pool.
///
/// Each source page renders into its own slot; slots are flattened in source
/// order once all are complete, so numbering never depends on completion order.
#[cfg(feature = "rayon")]
pub fn process_document_parallel<D>(
    document: &D,
    options: &ProcessingOptions,
    context: &RunContext,
    on_progress: impl FnMut(f32) + Send,
) -> Result<Vec<RenderedPage>>
where
    D: SourceDocument + Sync + ?Sized,
{
    use rayon::prelude::*;
    use std::sync::{Mutex, PoisonError};

    let (page_count, classifier) = prepare(document, options)?;
    let progress = Mutex::new((0usize, on_progress));

    let slots: Vec<Result<SourceOutput>> = (0..page_count)
        .into_par_iter()
        .map(|index| {
            if context.cancel.is_cancelled() {
                return Err(FlipbookError::Cancelled);
            }
            let output =
                render_source_page(document, index, &classifier, options, &context.ledger)?;

            let mut guard = progress.lock().unwrap_or_else(PoisonError::into_inner);
            let (done, callback) = &mut *guard;
            *done += 1;
            callback(*done as f32 / page_count as f32);

            Ok(output)
        })
        .collect();

    let mut pages = Vec::with_capacity(page_count);
    let mut failure = None;
    for slot in slots {
        match slot {
            Ok(output) if failure.is_none() => append_output(&mut pages, output),
            // Dropping the output releases its rasters
            Ok(_) => {}
            Err(e) => {
                failure.get_or_insert(e);
            }
        }
    }

    if context.cancel.is_cancelled() {
        release_pages(&mut pages);
        return Err(FlipbookError::Cancelled);
    }
    if let Some(e) = failure {
        release_pages(&mut pages);
        return Err(e);
    }

    log::info!(
        "Processed {} source pages into {} pages (parallel)",
        page_count,
        pages.len()
    );
    Ok(pages)
}

/// Validate, count pages and extract the page-1 baseline
fn prepare<D>(document: &D, options: &ProcessingOptions) -> Result<(usize, SpreadClassifier)>
where
    D: SourceDocument + ?Sized,
{
    options.validate()?;

    let page_count = document.page_count();
    if page_count == 0 {
        return Err(FlipbookError::NoPages);
    }

    let cover = document.page(0)?.size();
    let classifier =
        SpreadClassifier::from_cover(cover, options).map_err(|e| measure_error(1, e))?;

    log::info!(
        "Processing {} pages at {} DPI (baseline ratio {:.3})",
        page_count,
        options.dpi,
        classifier.baseline_ratio()
    );

    Ok((page_count, classifier))
}

fn render_source_page<D>(
    document: &D,
    index: usize,
    classifier: &SpreadClassifier,
    options: &ProcessingOptions,
    ledger: &Arc<RasterLedger>,
) -> Result<SourceOutput>
where
    D: SourceDocument + ?Sized,
{
    let source_page = index + 1;
    let page = document.page(index)?;
    let size = page.size();
    let class = classifier
        .classify(index, size)
        .map_err(|e| measure_error(source_page, e))?;

    log::debug!(
        "Page {}: {}x{} ({:.3}) -> {:?}",
        source_page,
        size.width,
        size.height,
        size.aspect_ratio(),
        class
    );

    let rendered = match class {
        PageClass::Single => rasterize(&*page, options, None, ledger)
            .map(|raster| vec![(None, raster)]),
        PageClass::Spread => split_spread_page(&*page, options, ledger).map(|split| {
            vec![
                (Some(SpreadHalf::Left), split.left),
                (Some(SpreadHalf::Right), split.right),
            ]
        }),
    };

    match rendered {
        Ok(rasters) => Ok(SourceOutput {
            source_page,
            rasters,
            placeholder: false,
        }),
        Err(e @ FlipbookError::PageRender { .. })
            if options.on_page_error == PageErrorPolicy::Placeholder =>
        {
            log::warn!("Substituting blank page for source page {}: {}", source_page, e);
            Ok(placeholder_output(source_page, size, class, options, ledger))
        }
        Err(e) => Err(e),
    }
}

/// Blank rasters of the size the page would have rendered at
fn placeholder_output(
    source_page: usize,
    size: PageSize,
    class: PageClass,
    options: &ProcessingOptions,
    ledger: &Arc<RasterLedger>,
) -> SourceOutput {
    let blank = |crop: Option<CropRegion>| {
        let target = render_target(size, crop, options);
        let image = RgbaImage::from_pixel(target.width, target.height, Rgba([255, 255, 255, 255]));
        RasterHandle::new(image, ledger)
    };

    let rasters = match class {
        PageClass::Single => vec![(None, blank(None))],
        PageClass::Spread => {
            let (left, right) = split_regions(size);
            vec![
                (Some(SpreadHalf::Left), blank(Some(left))),
                (Some(SpreadHalf::Right), blank(Some(right))),
            ]
        }
    };

    SourceOutput {
        source_page,
        rasters,
        placeholder: true,
    }
}

/// Number and append one source page's rasters
fn append_output(pages: &mut Vec<RenderedPage>, output: SourceOutput) {
    for (half, image) in output.rasters {
        let (width, height) = image
            .image()
            .map(|raster| raster.dimensions())
            .unwrap_or((0, 0));
        pages.push(RenderedPage {
            page_number: pages.len() + 1,
            image,
            width,
            height,
            half,
            source_page: output.source_page,
            placeholder: output.placeholder,
        });
    }
}

fn measure_error(page: usize, error: FlipbookError) -> FlipbookError {
    match error {
        FlipbookError::InvalidGeometry(message) => FlipbookError::PageRender {
            page,
            stage: RenderStage::Measure,
            message,
        },
        other => other,
    }
}
