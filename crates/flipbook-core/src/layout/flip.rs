//! Page-turn description between two openings

use crate::types::*;

impl FlipDirection {
    /// Forward iff moving to a later opening
    pub fn between(from_index: usize, to_index: usize) -> Self {
        if to_index > from_index {
            FlipDirection::Forward
        } else {
            FlipDirection::Backward
        }
    }
}

/// Describe the turn from opening `from_index` to opening `to_index`.
///
/// The turning page is the one nearer the direction of travel: the right page
/// when moving forward, the left page when moving backward. Returns `None` if
/// either index is outside the layout.
pub fn calculate_flip_animation<'l, 'a>(
    layout: &'l BookLayout<'a>,
    from_index: usize,
    to_index: usize,
) -> Option<FlipAnimation<'l, 'a>> {
    let from_spread = layout.spreads.get(from_index)?;
    let to_spread = layout.spreads.get(to_index)?;

    let direction = FlipDirection::between(from_index, to_index);
    let flipping_page = match direction {
        FlipDirection::Forward => from_spread.right,
        FlipDirection::Backward => from_spread.left,
    };

    Some(FlipAnimation {
        from_spread,
        to_spread,
        direction,
        flipping_page,
    })
}
