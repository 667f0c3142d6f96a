//! Error types for the pdfscan-core library.

use lopdf::ObjectId;
use thiserror::Error;

use crate::pdf::CombineError;

/// Main error type for the pdfscan library.
#[derive(Error, Debug)]
pub enum PdfScanError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Page number could not be taken from a file name.
    #[error("page number error: {0}")]
    PageNumber(#[from] PageNumberError),

    /// A soft mask could not be applied to its image.
    #[error("soft mask error: {0}")]
    Combine(#[from] CombineError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// A referenced object does not exist.
    #[error("object {} {} R not found", .0.0, .0.1)]
    MissingObject(ObjectId),

    /// The object exists but is not an image XObject.
    #[error("object {} {} R is not an image", .0.0, .0.1)]
    NotAnImage(ObjectId),

    /// The image uses a stream filter that cannot be decoded to pixels.
    #[error("unsupported image filter: {0}")]
    UnsupportedFilter(String),

    /// The image uses a colorspace that cannot be decoded.
    #[error("unsupported colorspace: {0}")]
    UnsupportedColorSpace(String),

    /// Image dictionary or sample data is inconsistent.
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// Invalid page number requested (1-based).
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The page has no image to replace (1-based).
    #[error("page {0} contains no image")]
    NoImageOnPage(u32),

    /// The document cannot take an incremental update.
    #[error("document cannot be saved incrementally: {0}")]
    IncrementalSaveUnsupported(String),

    /// Writing the document failed.
    #[error("failed to save PDF: {0}")]
    Save(String),
}

/// Why a replacement file name does not address a page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageNumberError {
    /// No numeric page token could be parsed.
    #[error("failed to parse page number from file name '{0}'")]
    Unresolvable(String),

    /// Pages are numbered from 1.
    #[error("page numbers start at 1, not 0: '{0}'")]
    Zero(String),
}

/// Result type for the pdfscan library.
pub type Result<T> = std::result::Result<T, PdfScanError>;
