//! Document and raster I/O

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::types::*;
use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Parent chains deeper than this are treated as malformed
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Load a PDF and read every page's natural size, without rasterizing
pub async fn load_page_sizes(path: impl AsRef<Path>) -> Result<Vec<PageSize>> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    tokio::task::spawn_blocking(move || {
        let doc = Document::load_mem(&bytes)
            .map_err(|e| FlipbookError::DocumentLoad(format!("{}: {}", path.display(), e)))?;
        page_sizes(&doc)
    })
    .await?
}

/// Natural size of every page, from its (possibly inherited) MediaBox and Rotate
pub fn page_sizes(doc: &Document) -> Result<Vec<PageSize>> {
    doc.get_pages()
        .into_iter()
        .map(|(number, page_id)| page_size(doc, number, page_id))
        .collect()
}

fn page_size(doc: &Document, number: u32, page_id: ObjectId) -> Result<PageSize> {
    let (width, height) = match inherited(doc, page_id, b"MediaBox")? {
        Some(media_box) => media_box_dimensions(doc, media_box).unwrap_or_else(|| {
            log::warn!(
                "Page {} has a malformed MediaBox {:?}, assuming US Letter",
                number,
                media_box
            );
            DEFAULT_PAGE_SIZE
        }),
        None => DEFAULT_PAGE_SIZE,
    };

    let rotation = inherited(doc, page_id, b"Rotate")?
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);

    // Quarter turns swap the displayed axes
    if rotation.rem_euclid(180) == 90 {
        Ok(PageSize::new(height, width))
    } else {
        Ok(PageSize::new(width, height))
    }
}

/// Look up an inheritable page attribute, walking up the page tree
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Result<Option<&'a Object>> {
    let mut node: &Dictionary = doc.get_dictionary(page_id)?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(resolve(doc, value)));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent_id) => node = doc.get_dictionary(parent_id)?,
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn media_box_dimensions(doc: &Document, media_box: &Object) -> Option<(f32, f32)> {
    let corners = media_box.as_array().ok()?;
    if corners.len() < 4 {
        return None;
    }
    let x0 = extract_number(resolve(doc, &corners[0]))?;
    let y0 = extract_number(resolve(doc, &corners[1]))?;
    let x1 = extract_number(resolve(doc, &corners[2]))?;
    let y1 = extract_number(resolve(doc, &corners[3]))?;
    Some(((x1 - x0).abs(), (y1 - y0).abs()))
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// File name a page is saved under
pub fn page_file_name(page: &RenderedPage) -> String {
    format!("page-{:04}.png", page.page_number)
}

/// Save every page's raster as a PNG in `dir`, returning the written paths
pub async fn save_pages(pages: &[RenderedPage], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let image = page.image.image().cloned().ok_or_else(|| {
            FlipbookError::Config(format!("Page {} was already released", page.page_number))
        })?;

        // PNG encoding is CPU-bound, spawn blocking
        let bytes = tokio::task::spawn_blocking(move || {
            let mut bytes = Vec::new();
            DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
            Ok::<_, FlipbookError>(bytes)
        })
        .await??;

        let path = dir.join(page_file_name(page));
        tokio::fs::write(&path, bytes).await?;
        written.push(path);
    }

    log::info!("Saved {} pages to {}", written.len(), dir.display());
    Ok(written)
}
