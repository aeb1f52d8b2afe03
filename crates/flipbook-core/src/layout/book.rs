//! Openings from a flat page sequence
//!
//! ## Arrangements
//!
//! **Reading order** (`create_book_layout` on the processed pages):
//! - Openings: [1, 2] [3, 4] [5, _]
//! - Only the final opening may have an empty right side
//!
//! **Covers facing** (`arrange_for_covers_facing` first):
//! - Sequence [1, 2, 3, 4, 5] becomes [5, 1, 2, 3, 4]
//! - Openings: [5, 1] [2, 3] [4, _]
//! - Back and front cover open together first

use crate::types::*;

/// Group pages into consecutive openings `[0, 1], [2, 3], ...` without reordering.
pub fn create_book_layout<'a, I>(pages: I) -> BookLayout<'a>
where
    I: IntoIterator<Item = &'a RenderedPage>,
{
    let pages: Vec<&'a RenderedPage> = pages.into_iter().collect();
    if pages.is_empty() {
        return BookLayout::default();
    }

    let total_spreads = pages.len().div_ceil(2);
    let spreads = pages
        .chunks(2)
        .enumerate()
        .map(|(id, pair)| SpreadPair {
            id,
            left: pair.first().copied(),
            right: pair.get(1).copied(),
            is_cover_spread: id == 0,
            is_last_spread: id + 1 == total_spreads,
        })
        .collect();

    BookLayout {
        spreads,
        total_spreads,
        total_pages: pages.len(),
        has_odd_pages: pages.len() % 2 == 1,
    }
}

/// Reorder pages so the back and front covers form the first opening.
///
/// Produces `[last, first, second, ..., second-to-last]`.
pub fn arrange_for_covers_facing<'a, I>(pages: I) -> Result<Vec<&'a RenderedPage>>
where
    I: IntoIterator<Item = &'a RenderedPage>,
{
    let pages: Vec<&'a RenderedPage> = pages.into_iter().collect();
    let Some((&back_cover, rest)) = pages.split_last() else {
        return Err(FlipbookError::InsufficientPages(0));
    };
    if rest.is_empty() {
        return Err(FlipbookError::InsufficientPages(1));
    }

    let mut arranged = Vec::with_capacity(pages.len());
    arranged.push(back_cover);
    arranged.extend_from_slice(rest);
    Ok(arranged)
}

/// Index of the opening showing `page_number` on either side
pub fn find_spread_index(layout: &BookLayout<'_>, page_number: usize) -> Option<usize> {
    layout
        .spreads
        .iter()
        .position(|spread| spread.contains(page_number))
}
