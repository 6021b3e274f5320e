//! PDF assembly: captured images → a one-page-per-image document.
//!
//! Every image gets its own fixed-size page. JPEG bytes pass straight
//! through as `DCTDecode` image XObjects — no recompression, no quality
//! loss. PNGs are decoded to raw pixels and embedded as an RGB stream,
//! with a grayscale soft mask carrying the alpha channel when the source
//! has one. Placement scales the image down to fit the content box
//! (never up) and centers it on the page.

use crate::config::PageLayout;
use crate::error::RelayError;
use crate::session::{CapturedImage, ImageKind};
use image::GenericImageView;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Build a PDF with one page per image, in list order.
///
/// # Errors
/// [`RelayError::PdfAssemblyFailed`] when the list is empty or the
/// document cannot be serialized; [`RelayError::ImageDecodeFailed`] when
/// an image's bytes do not decode. Sessions built through
/// [`crate::session::CaptureSession`] have already validated their
/// images, but the decode guard stays for callers that construct
/// [`CapturedImage`]s directly.
pub fn assemble_pdf(images: &[CapturedImage], layout: &PageLayout) -> Result<Vec<u8>, RelayError> {
    if images.is_empty() {
        return Err(RelayError::PdfAssemblyFailed {
            detail: "No images to place".to_string(),
        });
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(images.len());
    for image in images {
        let embedded = embed_image(&mut doc, image)?;
        let page_id = place_on_page(&mut doc, pages_id, &embedded, layout);
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| RelayError::PdfAssemblyFailed {
            detail: e.to_string(),
        })?;

    debug!(
        "Assembled {} page(s) into {} bytes of PDF",
        images.len(),
        out.len()
    );
    Ok(out)
}

/// An image XObject registered in the document, plus its pixel size.
struct EmbeddedImage {
    xobject_id: ObjectId,
    width: u32,
    height: u32,
}

/// Register one image as an XObject, choosing the embed path by format.
fn embed_image(doc: &mut Document, image: &CapturedImage) -> Result<EmbeddedImage, RelayError> {
    let decoded = image::load_from_memory_with_format(&image.bytes, image.kind.image_format())
        .map_err(|e| RelayError::ImageDecodeFailed {
            detail: format!("{} attachment '{}': {e}", image.kind, image.id),
        })?;
    let (width, height) = decoded.dimensions();

    let xobject_id = match image.kind {
        // JPEG data is already in a stream format PDF readers decode
        // natively; embed the original bytes under DCTDecode.
        ImageKind::Jpeg => {
            let color_space = if decoded.color().has_color() {
                "DeviceRGB"
            } else {
                "DeviceGray"
            };
            doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                image.bytes.clone(),
            ))
        }
        // PNG has no native PDF filter; embed raw RGB samples, with the
        // alpha channel split off into a grayscale soft mask.
        ImageKind::Png => {
            if decoded.color().has_alpha() {
                let rgba = decoded.to_rgba8();
                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel.0[3]);
                }

                let smask_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    alpha,
                ));
                doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                        "SMask" => smask_id,
                    },
                    rgb,
                ))
            } else {
                let rgb = decoded.to_rgb8();
                doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    rgb.into_raw(),
                ))
            }
        }
    };

    Ok(EmbeddedImage {
        xobject_id,
        width,
        height,
    })
}

/// Add a page drawing the embedded image scaled-to-fit and centered.
fn place_on_page(
    doc: &mut Document,
    pages_id: ObjectId,
    embedded: &EmbeddedImage,
    layout: &PageLayout,
) -> ObjectId {
    let (draw_w, draw_h, x, y) = placement(embedded.width, embedded.height, layout);
    let content = format!("q {draw_w:.2} 0 0 {draw_h:.2} {x:.2} {y:.2} cm /Im0 Do Q");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            layout.width.into(),
            layout.height.into(),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => embedded.xobject_id },
        },
    })
}

/// The drawn box for an image: `(width, height, x, y)` in page points.
fn placement(width: u32, height: u32, layout: &PageLayout) -> (f32, f32, f32, f32) {
    let scale = fit_scale(width, height, layout);
    let draw_w = width as f32 * scale;
    let draw_h = height as f32 * scale;
    let x = (layout.width - draw_w) / 2.0;
    let y = (layout.height - draw_h) / 2.0;
    (draw_w, draw_h, x, y)
}

/// Scale factor fitting `width × height` pixels into the content box.
/// Clamped at 1.0 so images smaller than the page are not enlarged.
fn fit_scale(width: u32, height: u32, layout: &PageLayout) -> f32 {
    let (content_w, content_h) = layout.content_box();
    (content_w / width as f32)
        .min(content_h / height as f32)
        .min(1.0)
}
