//! Replacement images, re-encoded to fill an existing image slot.

use std::path::Path;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use lopdf::{Stream, dictionary};
use tracing::debug;

use crate::error::Result;
use crate::models::config::InjectConfig;

/// A JPEG sized to the pixel dimensions of the image it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegReplacement {
    data: Vec<u8>,
    width: u32,
    height: u32,
    gray: bool,
}

impl JpegReplacement {
    /// Load an image file and fit it to `width` x `height`.
    pub fn from_file(path: &Path, width: u32, height: u32, config: &InjectConfig) -> Result<Self> {
        let img = image::open(path)?;
        debug!(
            "Loaded replacement {} ({}x{})",
            path.display(),
            img.width(),
            img.height()
        );
        Self::from_image(img, width, height, config)
    }

    /// Resize to exactly `width` x `height`, ignoring aspect ratio, and encode as JPEG.
    pub fn from_image(img: DynamicImage, width: u32, height: u32, config: &InjectConfig) -> Result<Self> {
        let resized = img.resize_exact(width, height, config.resize_filter.into());

        // JPEG carries neither alpha nor 16-bit samples.
        let gray = !resized.color().has_color();
        let flattened = if gray {
            DynamicImage::ImageLuma8(resized.to_luma8())
        } else {
            DynamicImage::ImageRgb8(resized.to_rgb8())
        };

        let mut data = Vec::new();
        flattened.write_with_encoder(JpegEncoder::new_with_quality(&mut data, config.jpeg_quality))?;

        Ok(Self {
            data,
            width,
            height,
            gray,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_gray(&self) -> bool {
        self.gray
    }

    /// A DCT image XObject carrying this JPEG.
    pub fn to_stream(&self) -> Stream {
        let colorspace = if self.gray { "DeviceGray" } else { "DeviceRGB" };
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(self.width),
            "Height" => i64::from(self.height),
            "ColorSpace" => colorspace,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        Stream::new(dict, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, RgbaImage};
    use lopdf::Object;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resizes_to_slot_ignoring_aspect() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(100, 20));
        let replacement = JpegReplacement::from_image(img, 30, 40, &InjectConfig::default()).unwrap();

        let decoded = image::load_from_memory_with_format(replacement.data(), ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 40));
        assert!(!replacement.is_gray());
    }

    #[test]
    fn test_gray_source_stays_gray() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        let replacement = JpegReplacement::from_image(img, 5, 5, &InjectConfig::default()).unwrap();
        assert!(replacement.is_gray());

        let stream = replacement.to_stream();
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap(),
            &Object::Name(b"DeviceGray".to_vec())
        );
    }

    #[test]
    fn test_stream_dictionary() {
        let img = DynamicImage::new_rgb8(8, 8);
        let replacement = JpegReplacement::from_image(img, 4, 2, &InjectConfig::default()).unwrap();
        let stream = replacement.to_stream();

        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 2);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert!(stream.dict.get(b"SMask").is_err());
        assert_eq!(stream.content, replacement.data());
    }

    #[test]
    fn test_missing_file() {
        let result = JpegReplacement::from_file(
            Path::new("/nonexistent/replacement.png"),
            1,
            1,
            &InjectConfig::default(),
        );
        assert!(result.is_err());
    }
}
