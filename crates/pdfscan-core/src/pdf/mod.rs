//! PDF processing module.

mod decode;
mod document;
mod pixmap;
mod recover;
mod replace;

pub use document::ScanDocument;
pub use pixmap::{ColorSpace, CombineError, Pixmap};
pub use recover::recover_image;
pub use replace::JpegReplacement;

use crate::error::PdfError;
use lopdf::ObjectId;

/// An image placed on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Object id of the image XObject.
    pub xref: ObjectId,
    /// Object id of its `/SMask`, if any.
    pub smask: Option<ObjectId>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Resource name the page uses for it.
    pub name: String,
    /// Last stream filter (DCTDecode, FlateDecode, ...).
    pub filter: Option<String>,
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;
