//! In-memory PDF fixtures for tests.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

/// An image XObject waiting to be added to a [`PdfBuilder`].
#[derive(Debug, Clone)]
pub struct FixtureImage {
    pub dict: Dictionary,
    pub data: Vec<u8>,
}

impl FixtureImage {
    fn raw(width: u32, height: u32, colorspace: Object, data: Vec<u8>) -> Self {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => colorspace,
            "BitsPerComponent" => 8,
        };
        Self { dict, data }
    }

    /// Uncompressed DeviceRGB gradient.
    pub fn rgb(width: u32, height: u32) -> Self {
        let data = gradient(width, height).into_raw();
        Self::raw(width, height, "DeviceRGB".into(), data)
    }

    /// Samples of the gray fixtures, one byte per pixel.
    pub fn gray_samples(width: u32, height: u32) -> Vec<u8> {
        (0..width * height).map(|i| (i * 37 % 256) as u8).collect()
    }

    /// Flate-compressed DeviceGray ramp.
    pub fn gray(width: u32, height: u32) -> Self {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&Self::gray_samples(width, height))
            .expect("deflate fixture");
        let mut fixture = Self::raw(
            width,
            height,
            "DeviceGray".into(),
            encoder.finish().expect("deflate fixture"),
        );
        fixture.dict.set("Filter", "FlateDecode");
        fixture
    }

    /// LZW-compressed DeviceGray ramp, same samples as [`FixtureImage::gray`].
    pub fn lzw_gray(width: u32, height: u32) -> Self {
        let data = lzw_literal(&Self::gray_samples(width, height));
        let mut fixture = Self::raw(width, height, "DeviceGray".into(), data);
        fixture.dict.set("Filter", "LZWDecode");
        fixture
    }

    /// DeviceGray image whose payload is kept as given under `filter`.
    pub fn stored(width: u32, height: u32, filter: &str, data: Vec<u8>) -> Self {
        let mut fixture = Self::raw(width, height, "DeviceGray".into(), data);
        fixture.dict.set("Filter", filter);
        fixture
    }

    /// Bilevel Group 4 fax image. The payload is opaque and never decoded.
    pub fn ccitt(width: u32, height: u32) -> Self {
        let payload = vec![0x26, 0xa0, 0x11, 0x7f, 0x00, 0x10];
        let mut fixture = Self::stored(width, height, "CCITTFaxDecode", payload);
        fixture.dict.set("BitsPerComponent", 1);
        fixture.dict.set(
            "DecodeParms",
            dictionary! {
                "K" => -1,
                "Columns" => i64::from(width),
                "Rows" => i64::from(height),
            },
        );
        fixture
    }

    /// Uncompressed DeviceCMYK image.
    pub fn cmyk(width: u32, height: u32) -> Self {
        let data = (0..width * height * 4).map(|i| (i * 11 % 256) as u8).collect();
        Self::raw(width, height, "DeviceCMYK".into(), data)
    }

    /// Four-color palette image.
    pub fn indexed(width: u32, height: u32) -> Self {
        let palette = vec![0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255];
        let colorspace = Object::Array(vec![
            "Indexed".into(),
            "DeviceRGB".into(),
            Object::Integer(3),
            Object::String(palette, StringFormat::Hexadecimal),
        ]);
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| ((x + y) % 4) as u8))
            .collect();
        Self::raw(width, height, colorspace, data)
    }

    /// DCT-encoded RGB gradient.
    pub fn jpeg(width: u32, height: u32) -> Self {
        let mut data = Vec::new();
        DynamicImage::ImageRgb8(gradient(width, height))
            .write_with_encoder(JpegEncoder::new_with_quality(&mut data, 90))
            .expect("encode fixture JPEG");
        let mut fixture = Self::raw(width, height, "DeviceRGB".into(), data);
        fixture.dict.set("Filter", "DCTDecode");
        fixture
    }

    /// Point `/SMask` at another image object.
    pub fn with_smask(mut self, mask: ObjectId) -> Self {
        self.dict.set("SMask", mask);
        self
    }
}

/// LZW stream of literal 9-bit codes between a clear and an end-of-data code.
fn lzw_literal(data: &[u8]) -> Vec<u8> {
    assert!(data.len() < 250, "literal LZW fixture must stay within 9-bit codes");

    let codes = std::iter::once(256u16)
        .chain(data.iter().map(|&b| u16::from(b)))
        .chain(std::iter::once(257));

    let mut out = Vec::new();
    let mut acc: u32 = 0;
    let mut bits = 0;
    for code in codes {
        acc = (acc << 9) | u32::from(code);
        bits += 9;
        while bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
        acc &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push((acc << (8 - bits)) as u8);
    }
    out
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Assembles a minimal PDF with image-bearing pages.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Add an image object, returning its id.
    pub fn add_image(&mut self, image: FixtureImage) -> ObjectId {
        self.doc.add_object(Stream::new(image.dict, image.data))
    }

    /// Add a form XObject that draws `xobjects`.
    pub fn add_form(&mut self, xobjects: &[ObjectId]) -> ObjectId {
        let (resources, content) = draw(xobjects);
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 1.into(), 1.into()],
            "Resources" => resources,
        };
        self.doc.add_object(Stream::new(dict, content))
    }

    /// Add a page drawing `xobjects`, returning the page id.
    pub fn add_page(&mut self, xobjects: &[ObjectId]) -> ObjectId {
        let (resources, content) = draw(xobjects);
        let contents_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources,
            "Contents" => contents_id,
        });
        self.kids.push(page_id.into());
        page_id
    }

    /// Serialize the document.
    pub fn build(mut self) -> Vec<u8> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc.save_to(&mut buf).expect("failed to save test PDF");
        buf
    }

    /// Serialize the document to a file.
    pub fn write_to(self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn draw(xobjects: &[ObjectId]) -> (Dictionary, Vec<u8>) {
    let mut names = Dictionary::new();
    let mut content = String::new();
    for (i, id) in xobjects.iter().enumerate() {
        let name = format!("X{}", i);
        content.push_str(&format!("q 100 0 0 100 0 0 cm /{} Do Q\n", name));
        names.set(name, *id);
    }
    (dictionary! { "XObject" => names }, content.into_bytes())
}

/// A document of `pages` pages, each drawing its own JPEG.
pub fn scan_pdf(pages: usize, width: u32, height: u32) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    for _ in 0..pages {
        let img = builder.add_image(FixtureImage::jpeg(width, height));
        builder.add_page(&[img]);
    }
    builder.build()
}
