//! In-memory capture session: the ordered list of attached images.
//!
//! A [`CaptureSession`] stands in for the attachment strip of a host UI.
//! Images enter as raw bytes (camera snapshot, file picker, CLI path),
//! are sniffed and decoded exactly once at intake, and leave either by
//! id ([`CaptureSession::remove_image`]) or all at once after a
//! successful submission ([`CaptureSession::clear`]).
//!
//! Intake is also where broken attachments are rejected: a file that is
//! neither JPEG nor PNG, or that carries a valid signature over garbage,
//! fails `add_image` and never enters the list. Each accepted image gets
//! an in-memory PNG preview (longest edge bounded) so a host UI can
//! render thumbnails without holding full-resolution decodes.

use crate::error::RelayError;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use rand::{distr::Alphanumeric, Rng};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Length of the random alphanumeric id assigned to each image.
const IMAGE_ID_LEN: usize = 9;

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// The embed format of an attachment, decided from its magic bytes.
///
/// Only the two formats a PDF can carry natively are accepted; everything
/// else is rejected at intake rather than failing later during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Sniff the format from the file signature. `None` means unsupported.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&JPEG_MAGIC) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(&PNG_MAGIC) {
            Some(ImageKind::Png)
        } else {
            None
        }
    }

    /// The MIME type matching this format.
    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    pub(crate) fn image_format(&self) -> image::ImageFormat {
        match self {
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
            ImageKind::Png => image::ImageFormat::Png,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Jpeg => write!(f, "JPEG"),
            ImageKind::Png => write!(f, "PNG"),
        }
    }
}

/// One attached image: original bytes plus intake-time metadata.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Session-local identifier, random alphanumeric. Ids carry no
    /// meaning beyond removal lookup; collisions are not checked for.
    pub id: String,
    pub kind: ImageKind,
    /// The original file bytes, untouched. The PDF assembler works from
    /// these, not from the decoded pixels, so JPEG data survives
    /// byte-for-byte into the document.
    pub bytes: Vec<u8>,
    /// Pixel dimensions read at intake.
    pub width: u32,
    pub height: u32,
    /// In-memory PNG thumbnail, longest edge bounded by the session's
    /// thumbnail size. Dropped with the entry on removal.
    pub preview: Vec<u8>,
}

/// Ordered collection of attached images (insertion order).
#[derive(Debug, Default)]
pub struct CaptureSession {
    images: Vec<CapturedImage>,
    thumbnail_px: u32,
}

impl CaptureSession {
    /// New empty session with the default 256 px preview bound.
    pub fn new() -> Self {
        Self::with_thumbnail_px(256)
    }

    /// New empty session with an explicit preview bound.
    pub fn with_thumbnail_px(px: u32) -> Self {
        Self {
            images: Vec::new(),
            thumbnail_px: px.max(16),
        }
    }

    /// Attach an image from raw bytes; returns its session id.
    ///
    /// # Errors
    /// [`RelayError::UnsupportedImageFormat`] when the bytes are neither
    /// JPEG nor PNG, [`RelayError::ImageDecodeFailed`] when the signature
    /// matches but the data does not decode. A failed add leaves the
    /// session unchanged.
    pub fn add_image(&mut self, bytes: Vec<u8>) -> Result<String, RelayError> {
        let kind = ImageKind::sniff(&bytes).ok_or_else(|| RelayError::UnsupportedImageFormat {
            detail: describe_signature(&bytes),
        })?;

        let decoded = image::load_from_memory_with_format(&bytes, kind.image_format()).map_err(
            |e| RelayError::ImageDecodeFailed {
                detail: format!("{kind}: {e}"),
            },
        )?;
        let (width, height) = decoded.dimensions();

        let preview = encode_preview(&decoded, self.thumbnail_px)
            .map_err(|e| RelayError::Internal(format!("Preview encoding failed: {e}")))?;

        let id = random_id();
        debug!(
            id,
            %kind,
            width,
            height,
            "Captured image ({} bytes, {} byte preview)",
            bytes.len(),
            preview.len()
        );

        self.images.push(CapturedImage {
            id: id.clone(),
            kind,
            bytes,
            width,
            height,
            preview,
        });
        Ok(id)
    }

    /// Attach an image from a file on disk; returns its session id.
    pub fn add_image_file(&mut self, path: impl AsRef<Path>) -> Result<String, RelayError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RelayError::ImageFileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path).map_err(|e| RelayError::ImageReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.add_image(bytes)
    }

    /// Remove an image by id, dropping its bytes and preview.
    /// Returns whether an entry was removed.
    pub fn remove_image(&mut self, id: &str) -> bool {
        let before = self.images.len();
        self.images.retain(|img| img.id != id);
        let removed = self.images.len() < before;
        if removed {
            debug!(id, "Removed image ({} remain)", self.images.len());
        }
        removed
    }

    /// The attached images, in insertion order.
    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Drop every attachment, as after a successful submission.
    pub fn clear(&mut self) {
        self.images.clear();
    }
}

fn random_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(IMAGE_ID_LEN)
        .map(char::from)
        .collect()
}

/// PNG-encode a preview whose longest edge is at most `max_px`.
/// Small images are encoded as-is, never upscaled.
fn encode_preview(img: &DynamicImage, max_px: u32) -> Result<Vec<u8>, image::ImageError> {
    let (w, h) = img.dimensions();
    let thumb = if w.max(h) > max_px {
        img.resize(max_px, max_px, FilterType::Lanczos3)
    } else {
        img.clone()
    };
    let mut buf = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

fn describe_signature(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        "empty file".to_string()
    } else {
        format!(
            "unrecognized signature {:02X?}",
            &bytes[..bytes.len().min(4)]
        )
    }
}
