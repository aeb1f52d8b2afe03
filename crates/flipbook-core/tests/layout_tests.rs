use flipbook_core::*;

fn processed(count: usize) -> Vec<RenderedPage> {
    let doc = MemoryDocument::from_sizes(&vec![(60.0, 90.0); count]);
    let options = ProcessingOptions {
        dpi: 72.0,
        ..Default::default()
    };
    process_document(&doc, &options, |_| {}).unwrap()
}

fn numbers(pages: &[&RenderedPage]) -> Vec<usize> {
    pages.iter().map(|p| p.page_number).collect()
}

fn sides(spread: &SpreadPair<'_>) -> (Option<usize>, Option<usize>) {
    (
        spread.left.map(|p| p.page_number),
        spread.right.map(|p| p.page_number),
    )
}

#[test]
fn test_layout_openings_count() {
    for count in 1..=9 {
        let pages = processed(count);
        let layout = create_book_layout(&pages);
        assert_eq!(layout.total_spreads, count.div_ceil(2), "{} pages", count);
        assert_eq!(layout.spreads.len(), layout.total_spreads);
        assert_eq!(layout.total_pages, count);
        assert_eq!(layout.has_odd_pages, count % 2 == 1);
    }
}

#[test]
fn test_layout_odd_pages() {
    let pages = processed(5);
    let layout = create_book_layout(&pages);

    assert_eq!(sides(&layout.spreads[0]), (Some(1), Some(2)));
    assert_eq!(sides(&layout.spreads[1]), (Some(3), Some(4)));
    assert_eq!(sides(&layout.spreads[2]), (Some(5), None));

    assert!(layout.spreads[0].is_cover_spread);
    assert!(!layout.spreads[1].is_cover_spread);
    assert!(layout.spreads[2].is_last_spread);
    assert!(!layout.spreads[1].is_last_spread);

    // Only the final opening may be short
    for spread in &layout.spreads[..layout.spreads.len() - 1] {
        assert!(spread.left.is_some() && spread.right.is_some());
    }
}

#[test]
fn test_layout_flatten_reproduces_sequence() {
    let pages = processed(6);
    let layout = create_book_layout(&pages);
    assert_eq!(numbers(&layout.flatten()), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_layout_of_split_document() {
    let doc = MemoryDocument::from_sizes(&[(600.0, 900.0), (1200.0, 900.0), (600.0, 900.0)]);
    let options = ProcessingOptions {
        dpi: 72.0,
        ..Default::default()
    };
    let pages = process_document(&doc, &options, |_| {}).unwrap();
    let layout = create_book_layout(&pages);

    // [cover, spread-left] [spread-right, back]
    assert_eq!(layout.total_spreads, 2);
    assert!(layout.spreads[0].right.unwrap().is_left_half());
    assert!(layout.spreads[1].left.unwrap().is_right_half());
    assert!(!layout.has_odd_pages);
}

#[test]
fn test_covers_facing_layout() {
    let pages = processed(5);
    let arranged = arrange_for_covers_facing(&pages).unwrap();
    assert_eq!(numbers(&arranged), vec![5, 1, 2, 3, 4]);

    let layout = create_book_layout(arranged);
    assert_eq!(sides(&layout.spreads[0]), (Some(5), Some(1)));
    assert_eq!(sides(&layout.spreads[1]), (Some(2), Some(3)));
    assert_eq!(sides(&layout.spreads[2]), (Some(4), None));
    assert_eq!(find_spread_index(&layout, 1), Some(0));
}

#[test]
fn test_flip_forward() {
    let pages = processed(6);
    let layout = create_book_layout(&pages);

    let flip = calculate_flip_animation(&layout, 0, 1).unwrap();
    assert_eq!(flip.direction, FlipDirection::Forward);
    assert_eq!(flip.flipping_page.map(|p| p.page_number), Some(2));
    assert_eq!(flip.from_spread.id, 0);
    assert_eq!(flip.to_spread.id, 1);
}

#[test]
fn test_flip_backward() {
    let pages = processed(5);
    let layout = create_book_layout(&pages);

    let flip = calculate_flip_animation(&layout, 2, 1).unwrap();
    assert_eq!(flip.direction, FlipDirection::Backward);
    assert_eq!(flip.flipping_page.map(|p| p.page_number), Some(5));
}

#[test]
fn test_flip_backward_from_short_opening() {
    let pages = processed(3);
    let layout = create_book_layout(&pages);

    // Opening [3, _] turns its left page back
    let flip = calculate_flip_animation(&layout, 1, 0).unwrap();
    assert_eq!(flip.direction, FlipDirection::Backward);
    assert_eq!(flip.flipping_page.map(|p| p.page_number), Some(3));

    let pages = processed(1);
    let layout = create_book_layout(&pages);
    let flip = calculate_flip_animation(&layout, 0, 0).unwrap();
    assert_eq!(flip.direction, FlipDirection::Backward);
}

#[test]
fn test_flip_out_of_range() {
    let pages = processed(4);
    let layout = create_book_layout(&pages);
    assert!(calculate_flip_animation(&layout, 0, 2).is_none());
    assert!(calculate_flip_animation(&layout, 5, 0).is_none());
}

#[test]
fn test_flip_direction_between() {
    assert_eq!(FlipDirection::between(0, 3), FlipDirection::Forward);
    assert_eq!(FlipDirection::between(3, 0), FlipDirection::Backward);
    assert_eq!(FlipDirection::between(2, 2), FlipDirection::Backward);
}
