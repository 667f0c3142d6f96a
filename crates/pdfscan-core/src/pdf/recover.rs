//! Rebuilding standalone images from page image references.
//!
//! Extracting an image as stored is right for most scans. Two cases need
//! more work: images with a soft mask, whose alpha lives in a separate
//! object, and images in non-device colorspaces (indexed, ICC, CMYK, ...),
//! which come out wrong when written verbatim.

use lopdf::ObjectId;
use tracing::{debug, warn};

use super::PageImage;
use super::document::ScanDocument;
use crate::error::Result;
use crate::models::extracted::{ImageExt, RecoveredImage};

/// Produce the most faithful standalone encoding of a page image.
///
/// - With a soft mask: base pixels plus the mask as alpha, as PNG (or PAM
///   for more than three colorants).
/// - With an explicit colorspace: converted to RGB and written as PNG.
/// - Otherwise: the image exactly as stored.
///
/// When the first two cannot decode or combine the pixels, the image is
/// returned as stored.
pub fn recover_image(doc: &ScanDocument, image: &PageImage) -> Result<RecoveredImage> {
    if let Some(smask) = image.smask {
        return match apply_soft_mask(doc, image.xref, smask) {
            Ok(recovered) => {
                debug!("Applied soft mask {:?} to image {:?}", smask, image.xref);
                Ok(recovered)
            }
            Err(e) => {
                warn!(
                    "Cannot apply soft mask {:?} to image {:?}, keeping stored image: {}",
                    smask, image.xref, e
                );
                doc.extract_stored(image.xref)
            }
        };
    }

    if doc.declares_colorspace(image.xref)? {
        return match to_rgb_png(doc, image.xref) {
            Ok(recovered) => Ok(recovered),
            Err(e) => {
                warn!(
                    "Cannot convert image {:?} to RGB, keeping stored image: {}",
                    image.xref, e
                );
                doc.extract_stored(image.xref)
            }
        };
    }

    doc.extract_stored(image.xref)
}

fn apply_soft_mask(doc: &ScanDocument, xref: ObjectId, smask: ObjectId) -> Result<RecoveredImage> {
    let base = doc.decode_image(xref)?.without_alpha();
    let ext = base.preferred_ext();
    let mask = doc.decode_image(smask)?;
    let pixmap = base.with_mask(&mask)?;

    Ok(RecoveredImage {
        ext,
        colorspace: pixmap.colorants() as u8,
        data: pixmap.encode(ext)?,
    })
}

fn to_rgb_png(doc: &ScanDocument, xref: ObjectId) -> Result<RecoveredImage> {
    let rgb = doc.decode_image(xref)?.to_rgb();
    Ok(RecoveredImage {
        ext: ImageExt::Png,
        colorspace: 3,
        data: rgb.encode(ImageExt::Png)?,
    })
}
