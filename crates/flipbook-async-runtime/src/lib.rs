use std::path::PathBuf;

mod backend;
mod worker;

pub use backend::{DocumentBackend, MemoryBackend};
#[cfg(feature = "pdfium")]
pub use backend::PdfiumBackend;
pub use worker::worker_task;

// Re-export types from library crates
pub use flipbook_core::{ProcessingOptions, RenderedPage};

/// Commands sent from the front end to the worker
#[derive(Debug)]
pub enum FlipbookCommand {
    Load {
        path: PathBuf,
    },
    /// Starts a processing run. Any active run is cancelled, whatever its
    /// document, and queued requests are collapsed to the newest.
    Process {
        doc_id: DocumentId,
        options: ProcessingOptions,
    },
    Cancel {
        doc_id: DocumentId,
    },
    Close {
        doc_id: DocumentId,
    },
}

/// Updates sent from the worker to the front end
#[derive(Debug)]
pub enum FlipbookUpdate {
    Loaded {
        doc_id: DocumentId,
        page_count: usize,
    },
    /// A `Process` request was accepted as `run`
    Started {
        doc_id: DocumentId,
        run: RunId,
    },
    Progress {
        doc_id: DocumentId,
        run: RunId,
        fraction: f32,
    },
    Processed {
        doc_id: DocumentId,
        run: RunId,
        pages: Vec<RenderedPage>,
    },
    /// The run was cancelled or superseded. Its pages were released.
    Cancelled {
        doc_id: DocumentId,
        run: RunId,
    },
    Closed {
        doc_id: DocumentId,
    },
    Error {
        /// Set when the failure concerns a loaded document
        doc_id: Option<DocumentId>,
        message: String,
    },
}

/// Handle to a loaded document. Assigned sequentially from 1 in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

/// Identifies one processing request, sequentially from 1 across all documents.
///
/// Only the highest run seen for a document is current; updates from
/// lower runs can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub u64);
