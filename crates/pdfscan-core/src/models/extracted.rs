//! Image payloads produced by extraction.

/// File container of an extracted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageExt {
    /// Portable Network Graphics, up to 3 colorants plus alpha.
    Png,
    /// Portable Arbitrary Map, any channel count.
    Pam,
    /// Baseline JPEG, as stored under DCTDecode.
    Jpeg,
    /// JPEG 2000 codestream, as stored under JPXDecode.
    Jpx,
    /// JBIG2 stream, as stored under JBIG2Decode.
    Jb2,
    /// CCITT fax stream in a single-strip TIFF.
    Tiff,
}

impl ImageExt {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageExt::Png => "png",
            ImageExt::Pam => "pam",
            ImageExt::Jpeg => "jpg",
            ImageExt::Jpx => "jpx",
            ImageExt::Jb2 => "jb2",
            ImageExt::Tiff => "tif",
        }
    }
}

impl std::fmt::Display for ImageExt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A standalone image rebuilt from an image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredImage {
    /// Container the bytes are encoded in.
    pub ext: ImageExt,
    /// Number of colorants (alpha excluded).
    pub colorspace: u8,
    /// Encoded file contents.
    pub data: Vec<u8>,
}
