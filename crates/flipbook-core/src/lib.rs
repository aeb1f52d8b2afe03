pub mod constants;
mod detect;
pub mod io;
pub mod layout;
mod options;
mod pipeline;
pub mod render;
mod sizing;
pub mod source;
mod stats;
mod types;

pub use detect::{SpreadClassifier, classify_sizes, detect_spread};
pub use io::{load_page_sizes, page_sizes, save_pages};
pub use layout::{
    arrange_for_covers_facing, calculate_flip_animation, create_book_layout, find_spread_index,
};
pub use options::*;
#[cfg(feature = "rayon")]
pub use pipeline::process_document_parallel;
pub use pipeline::{CancelToken, RunContext, process_document, process_document_with};
pub use render::{RasterHandle, RasterLedger, release_pages};
pub use sizing::*;
pub use source::{MemoryDocument, MemoryPage, PageHandle, SourceDocument};
pub use stats::calculate_statistics;
pub use types::*;
