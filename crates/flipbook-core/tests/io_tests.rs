use flipbook_core::*;
use lopdf::{Dictionary, Document, Object, Stream};
use tempfile::{NamedTempFile, TempDir};

fn media_box(width: i64, height: i64) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(width),
        Object::Integer(height),
    ])
}

/// Pages with their own MediaBox; `None` inherits the page tree's 612x792
fn create_test_document(page_boxes: &[Option<(i64, i64)>]) -> Document {
    let mut doc = Document::with_version("1.7");

    // Create page tree root ID
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for page_box in page_boxes {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));

        let mut page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]);
        if let Some((width, height)) = page_box {
            page.set("MediaBox", media_box(*width, *height));
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_boxes.len() as i64)),
        ("MediaBox", media_box(612, 792)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc
}

#[test]
fn test_page_sizes_in_document_order() {
    let doc = create_test_document(&[Some((600, 900)), Some((1200, 900)), None]);
    let sizes = page_sizes(&doc).unwrap();

    assert_eq!(
        sizes,
        vec![
            PageSize::new(600.0, 900.0),
            PageSize::new(1200.0, 900.0),
            PageSize::new(612.0, 792.0),
        ]
    );
}

#[test]
fn test_rotated_page_swaps_axes() {
    let mut doc = create_test_document(&[Some((600, 900))]);
    let page_id = *doc.get_pages().get(&1).unwrap();
    doc.get_dictionary_mut(page_id)
        .unwrap()
        .set("Rotate", Object::Integer(90));

    let sizes = page_sizes(&doc).unwrap();
    assert_eq!(sizes, vec![PageSize::new(900.0, 600.0)]);
}

#[test]
fn test_malformed_media_box_falls_back_to_letter() {
    let mut doc = create_test_document(&[Some((600, 900)), Some((600, 900))]);
    let page_id = *doc.get_pages().get(&2).unwrap();
    doc.get_dictionary_mut(page_id).unwrap().set(
        "MediaBox",
        Object::Array(vec![Object::Integer(0), Object::Integer(0)]),
    );

    let sizes = page_sizes(&doc).unwrap();
    assert_eq!(
        sizes,
        vec![PageSize::new(600.0, 900.0), PageSize::new(612.0, 792.0)]
    );
}

#[tokio::test]
async fn test_load_page_sizes() {
    let mut doc = create_test_document(&[Some((600, 900)), Some((1200, 900))]);
    let temp = NamedTempFile::new().unwrap();

    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    std::fs::write(temp.path(), writer).unwrap();

    let sizes = load_page_sizes(temp.path()).await.unwrap();
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[1], PageSize::new(1200.0, 900.0));

    let stats = calculate_statistics(&sizes, &ProcessingOptions::default()).unwrap();
    assert_eq!(stats.output_pages, 3);
}

#[tokio::test]
async fn test_load_page_sizes_not_a_pdf() {
    let temp = NamedTempFile::new().unwrap();
    std::fs::write(temp.path(), b"not a pdf").unwrap();

    let result = load_page_sizes(temp.path()).await;
    assert!(matches!(result, Err(FlipbookError::DocumentLoad(_))));
}

#[tokio::test]
async fn test_save_pages_writes_numbered_pngs() {
    let doc = MemoryDocument::from_sizes(&[(60.0, 90.0), (120.0, 90.0), (60.0, 90.0)]);
    let options = ProcessingOptions {
        dpi: 72.0,
        ..Default::default()
    };
    let pages = process_document(&doc, &options, |_| {}).unwrap();

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("pages");
    let written = save_pages(&pages, &out).await.unwrap();

    assert_eq!(written.len(), 4);
    assert_eq!(written[0], out.join("page-0001.png"));
    assert_eq!(written[3], out.join("page-0004.png"));

    let half = image::open(&written[1]).unwrap();
    assert_eq!((half.width(), half.height()), (60, 90));
}

#[tokio::test]
async fn test_save_released_page_fails() {
    let doc = MemoryDocument::from_sizes(&[(60.0, 90.0)]);
    let mut pages = process_document(&doc, &ProcessingOptions::default(), |_| {}).unwrap();
    release_pages(&mut pages);

    let dir = TempDir::new().unwrap();
    assert!(save_pages(&pages, dir.path()).await.is_err());
}
