//! Scanned PDF document access using lopdf.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use lopdf::{Dictionary, Document, IncrementalDocument, Object, ObjectId, Stream};
use tracing::debug;

use super::decode;
use super::pixmap::Pixmap;
use super::replace::JpegReplacement;
use super::{PageImage, Result};
use crate::error::PdfError;
use crate::models::extracted::RecoveredImage;

/// An opened PDF, kept together with its original bytes so that changes
/// can be appended as an incremental update.
pub struct ScanDocument {
    inner: IncrementalDocument,
    encrypted: bool,
    replaced: HashSet<ObjectId>,
}

impl ScanDocument {
    /// Open a PDF file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| PdfError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(data)
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut doc = Document::load_mem(&data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let encrypted = doc.is_encrypted();
        if encrypted {
            // Readable only when the user password is empty.
            doc.decrypt("").map_err(|_| {
                PdfError::Parse("document is encrypted with a user password".to_string())
            })?;
            debug!("Decrypted PDF with empty password");
        }

        debug!("Loaded PDF with {} pages", doc.get_pages().len());
        Ok(Self {
            inner: IncrementalDocument::create_from(data, doc),
            encrypted,
            replaced: HashSet::new(),
        })
    }

    fn base(&self) -> &Document {
        self.inner.get_prev_documents()
    }

    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.base().get_pages().len() as u32
    }

    /// Whether the file on disk is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Image objects replaced since loading.
    pub fn replaced_images(&self) -> usize {
        self.replaced.len()
    }

    /// Look up an object, preferring pending changes over the loaded file.
    fn object(&self, id: ObjectId) -> Result<&Object> {
        if let Some(obj) = self.inner.new_document.objects.get(&id) {
            return Ok(obj);
        }
        self.base()
            .get_object(id)
            .map_err(|_| PdfError::MissingObject(id))
    }

    /// The stream of an image XObject.
    pub fn image_stream(&self, id: ObjectId) -> Result<&Stream> {
        let stream = self
            .object(id)?
            .as_stream()
            .map_err(|_| PdfError::NotAnImage(id))?;
        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Image".as_slice()) {
            return Err(PdfError::NotAnImage(id));
        }
        Ok(stream)
    }

    /// Images placed on a page (0-based index), in resource order.
    ///
    /// Images inside form XObjects are included. Each image is listed once
    /// per page even when several resource names point at it.
    pub fn page_images(&self, page_index: u32) -> Result<Vec<PageImage>> {
        let page_number = page_index + 1;
        let page_id = *self
            .base()
            .get_pages()
            .get(&page_number)
            .ok_or(PdfError::InvalidPage(page_number))?;

        let mut images = Vec::new();
        let mut seen = HashSet::new();
        if let Some(resources) = self.page_resources(page_id) {
            self.collect_images(&resources, &mut images, &mut seen);
        }

        debug!("Found {} images on page {}", images.len(), page_number);
        Ok(images)
    }

    fn collect_images(
        &self,
        resources: &Dictionary,
        images: &mut Vec<PageImage>,
        seen: &mut HashSet<ObjectId>,
    ) {
        let doc = self.base();
        let xobjects = match resources.get(b"XObject").map(|o| doc.dereference(o)) {
            Ok(Ok((_, Object::Dictionary(dict)))) => dict,
            _ => return,
        };

        for (name, value) in xobjects.iter() {
            let Ok(id) = value.as_reference() else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            let Ok(stream) = self.object(id).and_then(|o| {
                o.as_stream().map_err(|_| PdfError::NotAnImage(id))
            }) else {
                continue;
            };

            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => {
                    let Ok((width, height)) = decode::image_size(&stream.dict) else {
                        debug!("Skipping image {:?} without valid size", id);
                        continue;
                    };
                    images.push(PageImage {
                        xref: id,
                        smask: stream.dict.get(b"SMask").and_then(Object::as_reference).ok(),
                        width,
                        height,
                        name: String::from_utf8_lossy(name).into_owned(),
                        filter: decode::filter_names(&stream.dict)
                            .last()
                            .map(|f| String::from_utf8_lossy(f).into_owned()),
                    });
                }
                Ok(b"Form") => {
                    if let Ok(Ok((_, Object::Dictionary(form_resources)))) =
                        stream.dict.get(b"Resources").map(|o| doc.dereference(o))
                    {
                        self.collect_images(form_resources, images, seen);
                    }
                }
                _ => {}
            }
        }
    }

    /// Resources dictionary for a page, following inheritance up the page tree.
    fn page_resources(&self, page_id: ObjectId) -> Option<Dictionary> {
        let doc = self.base();
        let mut node_id = page_id;
        let mut visited = HashSet::new();

        while visited.insert(node_id) {
            let dict = doc.get_object(node_id).ok()?.as_dict().ok()?;

            if let Ok(resources) = dict.get(b"Resources") {
                if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                    return Some(res_dict.clone());
                }
            }

            node_id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        }
        None
    }

    /// Decode an image XObject to pixels.
    pub fn decode_image(&self, id: ObjectId) -> crate::Result<Pixmap> {
        let stream = self.image_stream(id)?;
        decode::decode_image(self.base(), stream)
    }

    /// Whether the image dictionary names a colorspace other than device gray or RGB.
    pub fn declares_colorspace(&self, id: ObjectId) -> Result<bool> {
        let stream = self.image_stream(id)?;
        Ok(decode::declares_colorspace(self.base(), &stream.dict))
    }

    /// The image as stored: codec payloads verbatim, other storage decoded to PNG or PAM.
    pub fn extract_stored(&self, id: ObjectId) -> crate::Result<RecoveredImage> {
        let stream = self.image_stream(id)?;
        let declared = decode::declared_colorants(self.base(), &stream.dict);

        if let Some(ext) = decode::stored_container(&stream.dict) {
            return Ok(RecoveredImage {
                ext,
                colorspace: declared.unwrap_or(3),
                data: decode::container_payload(stream)?,
            });
        }

        let pixmap = decode::decode_image(self.base(), stream)?;
        let ext = pixmap.preferred_ext();
        Ok(RecoveredImage {
            ext,
            colorspace: pixmap.colorants() as u8,
            data: pixmap.encode(ext)?,
        })
    }

    /// Swap an image XObject's stream for a JPEG, keeping its object number.
    pub fn replace_image(&mut self, id: ObjectId, replacement: &JpegReplacement) -> Result<()> {
        self.image_stream(id)?;
        self.inner
            .new_document
            .objects
            .insert(id, Object::Stream(replacement.to_stream()));
        self.replaced.insert(id);
        debug!("Replaced image {:?} with {} byte JPEG", id, replacement.data().len());
        Ok(())
    }

    /// Whether changes can be appended to the original file.
    ///
    /// Encrypted files are refused: appended streams would be written in clear.
    pub fn can_save_incrementally(&self) -> bool {
        !self.encrypted
    }

    /// Append pending changes to the original bytes and write them to `path`.
    pub fn save_incremental(&mut self, path: &Path) -> Result<()> {
        self.check_incremental()?;
        let file = File::create(path).map_err(|e| PdfError::Save(format!("{}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        self.save_incremental_to(&mut writer)?;
        writer.flush().map_err(|e| PdfError::Save(e.to_string()))
    }

    /// Append pending changes to the original bytes and write them to `target`.
    pub fn save_incremental_to<W: Write>(&mut self, target: &mut W) -> Result<()> {
        self.check_incremental()?;
        self.inner
            .save_to(target)
            .map_err(|e| PdfError::Save(e.to_string()))
    }

    fn check_incremental(&self) -> Result<()> {
        if self.can_save_incrementally() {
            Ok(())
        } else {
            Err(PdfError::IncrementalSaveUnsupported(
                "document is encrypted".to_string(),
            ))
        }
    }
}

impl std::fmt::Debug for ScanDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanDocument")
            .field("pages", &self.page_count())
            .field("encrypted", &self.encrypted)
            .field("replaced", &self.replaced.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::extracted::ImageExt;
    use crate::testing::{FixtureImage, PdfBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_images_in_order() {
        let mut builder = PdfBuilder::new();
        let a = builder.add_image(FixtureImage::rgb(4, 3));
        let b = builder.add_image(FixtureImage::gray(2, 2));
        builder.add_page(&[a, b]);
        builder.add_page(&[b]);
        let doc = ScanDocument::from_bytes(builder.build()).unwrap();

        assert_eq!(doc.page_count(), 2);
        let first = doc.page_images(0).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].xref, a);
        assert_eq!((first[0].width, first[0].height), (4, 3));
        assert_eq!(first[1].xref, b);
        assert_eq!(doc.page_images(1).unwrap()[0].xref, b);
    }

    #[test]
    fn test_page_images_invalid_page() {
        let mut builder = PdfBuilder::new();
        let a = builder.add_image(FixtureImage::rgb(1, 1));
        builder.add_page(&[a]);
        let doc = ScanDocument::from_bytes(builder.build()).unwrap();

        assert!(matches!(doc.page_images(5), Err(PdfError::InvalidPage(6))));
    }

    #[test]
    fn test_page_images_reports_smask() {
        let mut builder = PdfBuilder::new();
        let mask = builder.add_image(FixtureImage::gray(3, 3));
        let img = builder.add_image(FixtureImage::rgb(3, 3).with_smask(mask));
        builder.add_page(&[img]);
        let doc = ScanDocument::from_bytes(builder.build()).unwrap();

        let images = doc.page_images(0).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].smask, Some(mask));
    }

    #[test]
    fn test_page_images_inside_form() {
        let mut builder = PdfBuilder::new();
        let img = builder.add_image(FixtureImage::rgb(2, 2));
        let form = builder.add_form(&[img]);
        builder.add_page(&[form]);
        let doc = ScanDocument::from_bytes(builder.build()).unwrap();

        let images = doc.page_images(0).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].xref, img);
    }

    #[test]
    fn test_extract_stored_jpeg_is_verbatim() {
        let mut builder = PdfBuilder::new();
        let fixture = FixtureImage::jpeg(8, 8);
        let original = fixture.data.clone();
        let img = builder.add_image(fixture);
        builder.add_page(&[img]);
        let doc = ScanDocument::from_bytes(builder.build()).unwrap();

        let stored = doc.extract_stored(img).unwrap();
        assert_eq!(stored.ext, ImageExt::Jpeg);
        assert_eq!(stored.data, original);
    }

    #[test]
    fn test_image_stream_rejects_non_images() {
        let mut builder = PdfBuilder::new();
        let img = builder.add_image(FixtureImage::rgb(1, 1));
        let page = builder.add_page(&[img]);
        let doc = ScanDocument::from_bytes(builder.build()).unwrap();

        assert!(matches!(doc.image_stream(page), Err(PdfError::NotAnImage(_))));
    }

    #[test]
    fn test_replace_and_save_incremental() {
        let mut builder = PdfBuilder::new();
        let img = builder.add_image(FixtureImage::rgb(6, 4));
        builder.add_page(&[img]);
        let original = builder.build();
        let mut doc = ScanDocument::from_bytes(original.clone()).unwrap();

        let replacement =
            JpegReplacement::from_image(image::DynamicImage::new_rgb8(6, 4), 6, 4, &Default::default())
                .unwrap();
        doc.replace_image(img, &replacement).unwrap();
        assert_eq!(doc.replaced_images(), 1);

        let mut saved = Vec::new();
        doc.save_incremental_to(&mut saved).unwrap();

        // The original bytes are kept as a prefix.
        assert!(saved.len() > original.len());
        assert_eq!(&saved[..original.len()], original.as_slice());

        let reloaded = ScanDocument::from_bytes(saved).unwrap();
        let stored = reloaded.extract_stored(img).unwrap();
        assert_eq!(stored.ext, ImageExt::Jpeg);
        assert_eq!(stored.data, replacement.data());
    }

    #[test]
    fn test_encrypted_document_refuses_incremental_save() {
        let mut builder = PdfBuilder::new();
        let img = builder.add_image(FixtureImage::rgb(4, 4));
        builder.add_page(&[img]);
        let mut doc = ScanDocument::from_bytes(builder.build()).unwrap();
        doc.encrypted = true;

        assert!(!doc.can_save_incrementally());
        let mut saved = Vec::new();
        assert!(matches!(
            doc.save_incremental_to(&mut saved),
            Err(PdfError::IncrementalSaveUnsupported(_))
        ));
        assert!(saved.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.pdf");
        assert!(matches!(
            doc.save_incremental(&target),
            Err(PdfError::IncrementalSaveUnsupported(_))
        ));
        assert!(!target.exists());
    }
}
