//! Interleaved 8-bit pixel buffers decoded from image XObjects.

use std::io::Cursor;

use image::{DynamicImage, ExtendedColorType, ImageFormat};
use thiserror::Error;

use crate::error::{PdfError, Result};
use crate::models::extracted::ImageExt;

/// Colorants of a pixmap, alpha excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorSpace {
    /// Number of color components per pixel.
    pub fn components(self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    fn tupltype(self) -> &'static str {
        match self {
            ColorSpace::Gray => "GRAYSCALE",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Cmyk => "CMYK",
        }
    }
}

/// Failure to apply a soft mask to a base image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    /// Base and mask differ in size.
    #[error("mask is {mask_width}x{mask_height} but image is {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    /// The mask carries color instead of a single gray channel.
    #[error("mask must be single-channel gray, got {0} colorants")]
    MaskNotGray(usize),
}

/// A decoded image: `width * height` pixels of `colorants (+1 if alpha)` bytes each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    colorspace: ColorSpace,
    alpha: bool,
    samples: Vec<u8>,
}

impl Pixmap {
    /// Wrap raw samples, checking the buffer length against the layout.
    pub fn new(
        width: u32,
        height: u32,
        colorspace: ColorSpace,
        alpha: bool,
        samples: Vec<u8>,
    ) -> Result<Self> {
        let channels = colorspace.components() + usize::from(alpha);
        let expected = width as usize * height as usize * channels;
        if samples.len() != expected {
            return Err(PdfError::InvalidImage(format!(
                "{}x{} pixmap with {} channels needs {} bytes, got {}",
                width,
                height,
                channels,
                expected,
                samples.len()
            ))
            .into());
        }

        Ok(Self {
            width,
            height,
            colorspace,
            alpha,
            samples,
        })
    }

    /// Convert a decoded raster, keeping gray sources gray.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let color = img.color();

        let (colorspace, alpha, samples) = match (color.has_color(), color.has_alpha()) {
            (false, false) => (ColorSpace::Gray, false, img.into_luma8().into_raw()),
            (false, true) => (ColorSpace::Gray, true, img.into_luma_alpha8().into_raw()),
            (true, false) => (ColorSpace::Rgb, false, img.into_rgb8().into_raw()),
            (true, true) => (ColorSpace::Rgb, true, img.into_rgba8().into_raw()),
        };

        Self {
            width,
            height,
            colorspace,
            alpha,
            samples,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn colorspace(&self) -> ColorSpace {
        self.colorspace
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha
    }

    /// Color components per pixel, alpha excluded.
    pub fn colorants(&self) -> usize {
        self.colorspace.components()
    }

    /// Bytes per pixel, alpha included.
    pub fn channels(&self) -> usize {
        self.colorants() + usize::from(self.alpha)
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Drop the alpha channel, if any.
    pub fn without_alpha(self) -> Self {
        if !self.alpha {
            return self;
        }

        let colorants = self.colorants();
        let samples = self
            .samples
            .chunks_exact(colorants + 1)
            .flat_map(|px| px[..colorants].iter().copied())
            .collect();

        Self {
            alpha: false,
            samples,
            ..self
        }
    }

    /// Use the first channel of `mask` as this image's alpha.
    pub fn with_mask(&self, mask: &Pixmap) -> std::result::Result<Pixmap, CombineError> {
        if mask.colorspace != ColorSpace::Gray {
            return Err(CombineError::MaskNotGray(mask.colorants()));
        }
        if (mask.width, mask.height) != (self.width, self.height) {
            return Err(CombineError::DimensionMismatch {
                width: self.width,
                height: self.height,
                mask_width: mask.width,
                mask_height: mask.height,
            });
        }

        let colorants = self.colorants();
        let mut samples = Vec::with_capacity(self.pixel_count() * (colorants + 1));
        let pixels = self.samples.chunks_exact(self.channels());
        let alphas = mask.samples.chunks_exact(mask.channels());
        for (px, a) in pixels.zip(alphas) {
            samples.extend_from_slice(&px[..colorants]);
            samples.push(a[0]);
        }

        Ok(Pixmap {
            width: self.width,
            height: self.height,
            colorspace: self.colorspace,
            alpha: true,
            samples,
        })
    }

    /// Convert to RGB, keeping any alpha channel.
    pub fn to_rgb(&self) -> Pixmap {
        if self.colorspace == ColorSpace::Rgb {
            return self.clone();
        }

        let channels = self.channels();
        let mut samples = Vec::with_capacity(self.pixel_count() * (3 + usize::from(self.alpha)));
        for px in self.samples.chunks_exact(channels) {
            match self.colorspace {
                ColorSpace::Gray => samples.extend_from_slice(&[px[0], px[0], px[0]]),
                ColorSpace::Cmyk => samples.extend_from_slice(&cmyk_to_rgb(px[0], px[1], px[2], px[3])),
                ColorSpace::Rgb => samples.extend_from_slice(&px[..3]),
            }
            if self.alpha {
                samples.push(px[channels - 1]);
            }
        }

        Pixmap {
            width: self.width,
            height: self.height,
            colorspace: ColorSpace::Rgb,
            alpha: self.alpha,
            samples,
        }
    }

    /// Container that can hold this pixmap's channel layout.
    pub fn preferred_ext(&self) -> ImageExt {
        if self.colorants() > 3 {
            ImageExt::Pam
        } else {
            ImageExt::Png
        }
    }

    /// Encode as PNG or PAM.
    pub fn encode(&self, ext: ImageExt) -> Result<Vec<u8>> {
        match ext {
            ImageExt::Png => self.encode_png(),
            ImageExt::Pam => Ok(self.encode_pam()),
            other => Err(PdfError::InvalidImage(format!(
                "pixmaps cannot be encoded as {}",
                other.extension()
            ))
            .into()),
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>> {
        let color = match (self.colorspace, self.alpha) {
            (ColorSpace::Gray, false) => ExtendedColorType::L8,
            (ColorSpace::Gray, true) => ExtendedColorType::La8,
            (ColorSpace::Rgb, false) => ExtendedColorType::Rgb8,
            (ColorSpace::Rgb, true) => ExtendedColorType::Rgba8,
            (ColorSpace::Cmyk, _) => return self.to_rgb().encode_png(),
        };

        let mut data = Vec::new();
        image::write_buffer_with_format(
            &mut Cursor::new(&mut data),
            &self.samples,
            self.width,
            self.height,
            color,
            ImageFormat::Png,
        )?;
        Ok(data)
    }

    // The image crate's PNM encoder has no CMYK tuple type.
    fn encode_pam(&self) -> Vec<u8> {
        let tupltype = if self.alpha {
            format!("{}_ALPHA", self.colorspace.tupltype())
        } else {
            self.colorspace.tupltype().to_string()
        };

        let header = format!(
            "P7\nWIDTH {}\nHEIGHT {}\nDEPTH {}\nMAXVAL 255\nTUPLTYPE {}\nENDHDR\n",
            self.width,
            self.height,
            self.channels(),
            tupltype
        );
        let mut data = Vec::with_capacity(header.len() + self.samples.len());
        data.extend_from_slice(header.as_bytes());
        data.extend_from_slice(&self.samples);
        data
    }

    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let k = 255 - u16::from(k);
    let channel = |v: u8| ((255 - u16::from(v)) * k / 255) as u8;
    [channel(c), channel(m), channel(y)]
}
