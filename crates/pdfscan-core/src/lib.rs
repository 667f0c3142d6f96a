//! Core library for working with scanned PDFs.
//!
//! This crate provides:
//! - PDF document access (page images, soft masks, form XObjects)
//! - Pixel decoding of image XObjects and standalone image recovery
//! - JPEG replacement of page images with incremental save
//! - File naming shared by the dump and inject tools

pub mod error;
pub mod models;
pub mod naming;
pub mod pdf;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{PageNumberError, PdfError, PdfScanError, Result};
pub use models::config::{ExtractConfig, InjectConfig, PdfScanConfig, ResizeFilter};
pub use models::extracted::{ImageExt, RecoveredImage};
pub use pdf::{JpegReplacement, PageImage, Pixmap, ScanDocument, recover_image};
