use crate::detect::classify_sizes;
use crate::options::ProcessingOptions;
use crate::types::*;

/// Calculate what a processing run will produce, from page sizes alone
pub fn calculate_statistics(
    sizes: &[PageSize],
    options: &ProcessingOptions,
) -> Result<ProcessingStatistics> {
    let classes = classify_sizes(sizes, options)?;

    let spreads_detected = classes
        .iter()
        .filter(|class| **class == PageClass::Spread)
        .count();
    let output_pages: usize = classes.iter().map(|class| class.output_pages()).sum();

    Ok(ProcessingStatistics {
        source_pages: sizes.len(),
        spreads_detected,
        output_pages,
        openings: output_pages.div_ceil(2),
        has_odd_pages: output_pages % 2 == 1,
    })
}
