//! Raster ownership and release

use crate::types::RenderedPage;
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts raster allocations and releases for one processing run
#[derive(Debug, Default)]
pub struct RasterLedger {
    allocated: AtomicUsize,
    released: AtomicUsize,
}

impl RasterLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Rasters allocated but not yet released
    pub fn live(&self) -> usize {
        self.allocated() - self.released()
    }
}

/// Owns one rendered raster until it is released.
///
/// Release happens at most once, either through [`RasterHandle::release`] or
/// when the handle is dropped.
pub struct RasterHandle {
    image: Option<RgbaImage>,
    ledger: Arc<RasterLedger>,
}

impl RasterHandle {
    pub fn new(image: RgbaImage, ledger: &Arc<RasterLedger>) -> Self {
        ledger.allocated.fetch_add(1, Ordering::SeqCst);
        Self {
            image: Some(image),
            ledger: Arc::clone(ledger),
        }
    }

    /// The pixels, or `None` once released
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.image.is_none()
    }

    /// Free the pixels. Returns false if they were already released.
    pub fn release(&mut self) -> bool {
        match self.image.take() {
            Some(image) => {
                drop(image);
                self.ledger.released.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

impl Drop for RasterHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for RasterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.image {
            Some(image) => write!(f, "RasterHandle({}x{})", image.width(), image.height()),
            None => f.write_str("RasterHandle(released)"),
        }
    }
}

/// Release every page's raster. Safe on an empty slice and on pages already
/// released; returns how many rasters were freed by this call.
pub fn release_pages(pages: &mut [RenderedPage]) -> usize {
    let released = pages
        .iter_mut()
        .map(|page| page.image.release())
        .filter(|&released| released)
        .count();
    if released > 0 {
        log::debug!("Released {} page rasters", released);
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_is_idempotent() {
        let ledger = RasterLedger::new();
        let mut handle = RasterHandle::new(RgbaImage::new(4, 4), &ledger);
        assert_eq!(ledger.live(), 1);

        assert!(handle.release());
        assert!(handle.is_released());
        assert!(handle.image().is_none());
        assert!(!handle.release());

        drop(handle);
        assert_eq!(ledger.allocated(), 1);
        assert_eq!(ledger.released(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let ledger = RasterLedger::new();
        {
            let _a = RasterHandle::new(RgbaImage::new(1, 1), &ledger);
            let _b = RasterHandle::new(RgbaImage::new(1, 1), &ledger);
            assert_eq!(ledger.live(), 2);
        }
        assert_eq!(ledger.live(), 0);
    }

    #[test]
    fn test_release_pages_counts_only_live_rasters() {
        let ledger = RasterLedger::new();
        let page = |number: usize| RenderedPage {
            page_number: number,
            image: RasterHandle::new(RgbaImage::new(2, 2), &ledger),
            width: 2,
            height: 2,
            half: None,
            source_page: number,
            placeholder: false,
        };
        let mut pages = vec![page(1), page(2), page(3)];
        pages[1].image.release();

        assert_eq!(release_pages(&mut pages), 2);
        assert_eq!(ledger.live(), 0);
        assert!(pages.iter().all(|p| p.image.is_released()));
        assert_eq!(release_pages(&mut pages), 0);
    }

    #[test]
    fn test_release_pages_empty() {
        assert_eq!(release_pages(&mut []), 0);
    }
}
