//! Where the worker gets documents from

use flipbook_core::{
    FlipbookError, MemoryDocument, ProcessingOptions, RenderedPage, Result, RunContext,
    SourceDocument, process_document_with,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Opens documents by path and runs the processing pipeline on them.
///
/// Called from blocking threads, so implementations must be shareable.
pub trait DocumentBackend: Send + Sync + 'static {
    fn page_count(&self, path: &Path) -> Result<usize>;

    fn process(
        &self,
        path: &Path,
        options: &ProcessingOptions,
        context: &RunContext,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<Vec<RenderedPage>>;
}

/// Serves in-memory documents registered under made-up paths
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: HashMap<PathBuf, MemoryDocument>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<PathBuf>, document: MemoryDocument) -> Self {
        self.documents.insert(path.into(), document);
        self
    }

    fn document(&self, path: &Path) -> Result<&MemoryDocument> {
        self.documents
            .get(path)
            .ok_or_else(|| FlipbookError::DocumentLoad(format!("{}: not found", path.display())))
    }
}

impl DocumentBackend for MemoryBackend {
    fn page_count(&self, path: &Path) -> Result<usize> {
        Ok(self.document(path)?.page_count())
    }

    fn process(
        &self,
        path: &Path,
        options: &ProcessingOptions,
        context: &RunContext,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<Vec<RenderedPage>> {
        process_document_with(self.document(path)?, options, context, on_progress)
    }
}

#[cfg(feature = "pdfium")]
pub use pdfium_backend::PdfiumBackend;

#[cfg(feature = "pdfium")]
mod pdfium_backend {
    use super::*;
    use flipbook_core::render::{DecoderLocation, PdfiumDocument, bind_pdfium, init_decoder};

    /// Decodes PDF files with PDFium.
    ///
    /// PDFium bindings cannot cross threads, so every call binds its own.
    #[derive(Debug, Default)]
    pub struct PdfiumBackend;

    impl PdfiumBackend {
        pub fn new() -> Self {
            Self
        }

        /// Use the PDFium library in `location`, if no location was set yet
        pub fn with_location(location: DecoderLocation) -> Self {
            if !init_decoder(location) {
                log::warn!("PDFium location already initialized, keeping the first one");
            }
            Self
        }
    }

    impl DocumentBackend for PdfiumBackend {
        fn page_count(&self, path: &Path) -> Result<usize> {
            let pdfium = bind_pdfium()?;
            let document = PdfiumDocument::open(&pdfium, path)?;
            Ok(document.page_count())
        }

        fn process(
            &self,
            path: &Path,
            options: &ProcessingOptions,
            context: &RunContext,
            on_progress: &mut dyn FnMut(f32),
        ) -> Result<Vec<RenderedPage>> {
            let pdfium = bind_pdfium()?;
            let document = PdfiumDocument::open(&pdfium, path)?;
            process_document_with(&document, options, context, on_progress)
        }
    }
}
