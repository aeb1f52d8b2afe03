//! Rasterization modules
//!
//! This module handles everything that turns pages into pixels:
//! - Computing the render target for a page or crop
//! - Splitting spread pages into halves
//! - Owning and releasing the resulting rasters
//! - The PDFium-backed decoder (feature `pdfium`)

#[cfg(all(feature = "pdfium", not(target_arch = "wasm32")))]
mod pdfium;
mod raster;
mod rasterize;
mod split;

#[cfg(all(feature = "pdfium", not(target_arch = "wasm32")))]
pub use pdfium::{DecoderLocation, PdfiumDocument, bind_pdfium, init_decoder};
pub use raster::{RasterHandle, RasterLedger, release_pages};
pub use rasterize::{RenderTarget, rasterize, render_target};
pub use split::{SplitRasters, split_regions, split_spread_page};
