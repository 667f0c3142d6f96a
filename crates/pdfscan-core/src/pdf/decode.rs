//! Decoding of image XObject streams into pixmaps.

use image::ImageFormat;
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::trace;

use super::pixmap::{ColorSpace, Pixmap};
use crate::error::{PdfError, Result};
use crate::models::extracted::ImageExt;

/// Colorspace of the samples as stored, before expansion to a pixmap.
#[derive(Debug, Clone, PartialEq)]
enum SampleSpace {
    Device(ColorSpace),
    Indexed {
        base: ColorSpace,
        hival: usize,
        lookup: Vec<u8>,
    },
    /// Single tint component; full tint renders black.
    Separation,
}

impl SampleSpace {
    fn components(&self) -> usize {
        match self {
            SampleSpace::Device(cs) => cs.components(),
            SampleSpace::Indexed { .. } | SampleSpace::Separation => 1,
        }
    }

    fn output(&self) -> ColorSpace {
        match self {
            SampleSpace::Device(cs) => *cs,
            SampleSpace::Indexed { base, .. } => *base,
            SampleSpace::Separation => ColorSpace::Gray,
        }
    }
}

/// Filter names of a stream, in application order.
pub(crate) fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Pixel dimensions from an image dictionary.
pub(crate) fn image_size(dict: &Dictionary) -> Result<(u32, u32)> {
    let dim = |key: &[u8]| {
        dict.get(key)
            .and_then(Object::as_i64)
            .ok()
            .filter(|v| *v > 0 && *v <= i64::from(u32::MAX))
            .map(|v| v as u32)
            .ok_or_else(|| {
                PdfError::InvalidImage(format!("missing or invalid /{}", String::from_utf8_lossy(key)))
            })
    };
    Ok((dim(b"Width")?, dim(b"Height")?))
}

/// The file container the stream is stored in, if it is one a viewer can open directly.
pub(crate) fn stored_container(dict: &Dictionary) -> Option<ImageExt> {
    match filter_names(dict).last().map(Vec::as_slice) {
        Some(b"DCTDecode") | Some(b"DCT") => Some(ImageExt::Jpeg),
        Some(b"JPXDecode") => Some(ImageExt::Jpx),
        Some(b"JBIG2Decode") => Some(ImageExt::Jb2),
        Some(b"CCITTFaxDecode") | Some(b"CCF") => Some(ImageExt::Tiff),
        _ => None,
    }
}

/// Bytes of the embedded codec payload, undoing any general-purpose filters in front of it.
///
/// Fax payloads have no container of their own and come back wrapped in a TIFF.
pub(crate) fn container_payload(stream: &Stream) -> Result<Vec<u8>> {
    let filters = filter_names(&stream.dict);
    let Some((codec, front)) = filters.split_last() else {
        return Ok(stream.content.clone());
    };

    let payload = unfilter(stream, front)?;
    match codec.as_slice() {
        b"CCITTFaxDecode" | b"CCF" => ccitt_to_tiff(&stream.dict, front.len(), &payload),
        _ => Ok(payload),
    }
}

/// Whether `/ColorSpace` names anything beyond plain device gray or RGB.
pub(crate) fn declares_colorspace(doc: &Document, dict: &Dictionary) -> bool {
    let Ok(obj) = dict.get(b"ColorSpace") else {
        return false;
    };
    match doc.dereference(obj) {
        Ok((_, Object::Name(name))) => !matches!(
            name.as_slice(),
            b"DeviceGray" | b"G" | b"DeviceRGB" | b"RGB"
        ),
        _ => true,
    }
}

/// Colorant count the image declares, if it can be determined without decoding.
pub(crate) fn declared_colorants(doc: &Document, dict: &Dictionary) -> Option<u8> {
    if is_image_mask(dict) {
        return Some(1);
    }
    let obj = dict.get(b"ColorSpace").ok()?;
    resolve_colorspace(doc, obj)
        .ok()
        .map(|space| space.output().components() as u8)
}

/// Decode an image XObject stream to 8-bit samples.
pub(crate) fn decode_image(doc: &Document, stream: &Stream) -> Result<Pixmap> {
    let dict = &stream.dict;
    let (width, height) = image_size(dict)?;
    let filters = filter_names(dict);

    match stored_container(dict) {
        Some(ImageExt::Jpeg) => {
            trace!("Decoding JPEG image {}x{}", width, height);
            let data = container_payload(stream)?;
            let img = image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?;
            return Ok(Pixmap::from_dynamic(img));
        }
        Some(_) => {
            let name = filters.last().map(|f| String::from_utf8_lossy(f).into_owned());
            return Err(PdfError::UnsupportedFilter(name.unwrap_or_default()).into());
        }
        None => {}
    }

    let data = unfilter(stream, &filters)?;

    let (space, bpc) = if is_image_mask(dict) {
        (SampleSpace::Device(ColorSpace::Gray), 1)
    } else {
        let cs = dict
            .get(b"ColorSpace")
            .map_err(|_| PdfError::InvalidImage("image has no /ColorSpace".to_string()))?;
        let bpc = dict
            .get(b"BitsPerComponent")
            .and_then(Object::as_i64)
            .unwrap_or(8);
        (resolve_colorspace(doc, cs)?, bpc as u32)
    };

    trace!(
        "Decoding raw image {}x{}, space={:?}, bits={}",
        width,
        height,
        space.output(),
        bpc
    );

    let components = space.components();
    let raw = unpack_samples(&data, width, height, components, bpc)?;

    let samples = match &space {
        SampleSpace::Indexed {
            base,
            hival,
            lookup,
        } => expand_indexed(&raw, *base, *hival, lookup),
        _ => {
            let max = (1u32 << bpc) - 1;
            let invert = decode_inversions(dict, components);
            let negative = matches!(space, SampleSpace::Separation);
            raw.iter()
                .enumerate()
                .map(|(i, &v)| {
                    let value = (u32::from(v) * 255 / max) as u8;
                    if invert[i % components] != negative {
                        255 - value
                    } else {
                        value
                    }
                })
                .collect()
        }
    };

    Pixmap::new(width, height, space.output(), false, samples)
}

fn is_image_mask(dict: &Dictionary) -> bool {
    dict.get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false)
}

fn resolve_colorspace(doc: &Document, obj: &Object) -> Result<SampleSpace> {
    let (_, obj) = doc
        .dereference(obj)
        .map_err(|e| PdfError::Parse(e.to_string()))?;

    match obj {
        Object::Name(name) => device_space(name)
            .map(SampleSpace::Device)
            .ok_or_else(|| unsupported(name)),
        Object::Array(arr) => {
            let family = arr
                .first()
                .and_then(|o| o.as_name().ok())
                .ok_or_else(|| PdfError::InvalidImage("colorspace array without name".to_string()))?;

            match family {
                b"ICCBased" => {
                    let profile = arr
                        .get(1)
                        .and_then(|o| doc.dereference(o).ok())
                        .and_then(|(_, o)| o.as_stream().ok())
                        .ok_or_else(|| PdfError::InvalidImage("ICCBased without profile".to_string()))?;
                    match profile.dict.get(b"N").and_then(Object::as_i64) {
                        Ok(1) => Ok(SampleSpace::Device(ColorSpace::Gray)),
                        Ok(3) => Ok(SampleSpace::Device(ColorSpace::Rgb)),
                        Ok(4) => Ok(SampleSpace::Device(ColorSpace::Cmyk)),
                        _ => match profile.dict.get(b"Alternate") {
                            Ok(alternate) => resolve_colorspace(doc, alternate),
                            Err(_) => Err(unsupported(b"ICCBased")),
                        },
                    }
                }
                b"CalGray" => Ok(SampleSpace::Device(ColorSpace::Gray)),
                b"CalRGB" => Ok(SampleSpace::Device(ColorSpace::Rgb)),
                b"Separation" => Ok(SampleSpace::Separation),
                b"Indexed" | b"I" => {
                    let base = match arr.get(1).map(|o| resolve_colorspace(doc, o)) {
                        Some(Ok(SampleSpace::Device(cs))) => cs,
                        _ => return Err(unsupported(b"Indexed")),
                    };
                    let hival = arr
                        .get(2)
                        .and_then(|o| o.as_i64().ok())
                        .filter(|v| (0..=255).contains(v))
                        .ok_or_else(|| PdfError::InvalidImage("Indexed hival out of range".to_string()))?
                        as usize;
                    let lookup = match arr.get(3).map(|o| doc.dereference(o)) {
                        Some(Ok((_, Object::String(bytes, _)))) => bytes.clone(),
                        Some(Ok((_, Object::Stream(s)))) => unfilter(s, &filter_names(&s.dict))?,
                        _ => {
                            return Err(PdfError::InvalidImage("Indexed lookup missing".to_string()).into());
                        }
                    };
                    Ok(SampleSpace::Indexed {
                        base,
                        hival,
                        lookup,
                    })
                }
                name if arr.len() == 1 => device_space(name)
                    .map(SampleSpace::Device)
                    .ok_or_else(|| unsupported(name)),
                other => Err(unsupported(other)),
            }
        }
        _ => Err(PdfError::InvalidImage("malformed /ColorSpace".to_string()).into()),
    }
}

fn device_space(name: &[u8]) -> Option<ColorSpace> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Some(ColorSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(ColorSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" => Some(ColorSpace::Cmyk),
        _ => None,
    }
}

fn unsupported(name: &[u8]) -> crate::error::PdfScanError {
    PdfError::UnsupportedColorSpace(String::from_utf8_lossy(name).into_owned()).into()
}

/// Per-component flags for `/Decode` ranges that run high to low.
fn decode_inversions(dict: &Dictionary, components: usize) -> Vec<bool> {
    let ranges: Vec<f64> = dict
        .get(b"Decode")
        .and_then(Object::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|o| match o {
                    Object::Integer(i) => Some(*i as f64),
                    Object::Real(r) => Some(f64::from(*r)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    (0..components)
        .map(|c| match (ranges.get(2 * c), ranges.get(2 * c + 1)) {
            (Some(lo), Some(hi)) => lo > hi,
            _ => false,
        })
        .collect()
}

/// Split packed rows into one value per sample.
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bpc: u32,
) -> Result<Vec<u16>> {
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(PdfError::InvalidImage(format!("unsupported BitsPerComponent {}", bpc)).into());
    }

    let per_row = width as usize * components;
    let row_bytes = (per_row * bpc as usize).div_ceil(8);
    let needed = row_bytes * height as usize;
    if data.len() < needed {
        return Err(PdfError::InvalidImage(format!(
            "sample data too short: got {} bytes, expected {}",
            data.len(),
            needed
        ))
        .into());
    }

    let mut out = Vec::with_capacity(per_row * height as usize);
    for row in data[..needed].chunks_exact(row_bytes) {
        match bpc {
            8 => out.extend(row.iter().map(|&b| u16::from(b))),
            16 => out.extend(
                row.chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
            ),
            _ => {
                let mask = (1u16 << bpc) - 1;
                for s in 0..per_row {
                    let bit = s * bpc as usize;
                    let shift = 8 - bpc as usize - bit % 8;
                    out.push((u16::from(row[bit / 8]) >> shift) & mask);
                }
            }
        }
    }
    Ok(out)
}

fn expand_indexed(indices: &[u16], base: ColorSpace, hival: usize, lookup: &[u8]) -> Vec<u8> {
    let n = base.components();
    let mut out = Vec::with_capacity(indices.len() * n);
    for &index in indices {
        let start = (index as usize).min(hival) * n;
        match lookup.get(start..start + n) {
            Some(entry) => out.extend_from_slice(entry),
            None => out.extend(std::iter::repeat_n(0, n)),
        }
    }
    out
}

/// Undo the general-purpose filters `filters`, a prefix of the stream's chain.
fn unfilter(stream: &Stream, filters: &[Vec<u8>]) -> Result<Vec<u8>> {
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }

    let mut dict = stream.dict.clone();
    dict.set(
        "Filter",
        Object::Array(filters.iter().map(|f| Object::Name(f.clone())).collect()),
    );
    // lopdf reads /DecodeParms as one dictionary; predictors belong to the last filter run.
    if let Ok(Object::Array(_)) = stream.dict.get(b"DecodeParms") {
        match decode_params(&stream.dict, filters.len() - 1) {
            Some(params) => dict.set("DecodeParms", params.clone()),
            None => {
                dict.remove(b"DecodeParms");
            }
        }
    }

    Stream::new(dict, stream.content.clone())
        .decompressed_content()
        .map_err(|e| {
            let names: Vec<_> = filters.iter().map(|f| String::from_utf8_lossy(f)).collect();
            crate::error::PdfScanError::from(PdfError::UnsupportedFilter(format!(
                "{} ({})",
                names.join(", "),
                e
            )))
        })
}

fn decode_params(dict: &Dictionary, index: usize) -> Option<&Dictionary> {
    match dict.get(b"DecodeParms").ok()? {
        Object::Dictionary(params) => Some(params),
        Object::Array(arr) => arr.get(index)?.as_dict().ok(),
        _ => None,
    }
}

const TIFF_SHORT: u16 = 3;
const TIFF_LONG: u16 = 4;

/// Wrap a CCITT fax payload in a single-strip little-endian TIFF.
fn ccitt_to_tiff(dict: &Dictionary, params_index: usize, payload: &[u8]) -> Result<Vec<u8>> {
    let (width, height) = image_size(dict)?;
    let params = decode_params(dict, params_index);
    let param = |key: &[u8]| params.and_then(|p| p.get(key).ok());
    let positive = |key: &[u8], default: u32| {
        param(key)
            .and_then(|o| o.as_i64().ok())
            .filter(|v| *v > 0 && *v <= i64::from(u32::MAX))
            .map_or(default, |v| v as u32)
    };

    let k = param(b"K").and_then(|o| o.as_i64().ok()).unwrap_or(0);
    let columns = positive(b"Columns", width);
    let rows = positive(b"Rows", height);
    let black_is_1 = param(b"BlackIs1").and_then(|o| o.as_bool().ok()).unwrap_or(false);
    let length = u32::try_from(payload.len())
        .map_err(|_| PdfError::InvalidImage("CCITT stream too large for TIFF".to_string()))?;

    // T6 for pure 2D coding, T4 (1D or mixed) otherwise.
    let (compression, options_tag, options) = if k < 0 {
        (4, 293, 0)
    } else {
        (3, 292, u32::from(k > 0))
    };
    // Fax runs are white-is-zero; BlackIs1 and a /Decode [1 0] each flip what the page shows.
    let inverted = black_is_1 != decode_inversions(dict, 1)[0];
    let photometric = u32::from(inverted);

    const ENTRIES: usize = 10;
    let data_offset = (8 + 2 + ENTRIES * 12 + 4) as u32;
    let entries: [(u16, u16, u32); ENTRIES] = [
        (256, TIFF_LONG, columns),
        (257, TIFF_LONG, rows),
        (258, TIFF_SHORT, 1),
        (259, TIFF_SHORT, compression),
        (262, TIFF_SHORT, photometric),
        (273, TIFF_LONG, data_offset),
        (277, TIFF_SHORT, 1),
        (278, TIFF_LONG, rows),
        (279, TIFF_LONG, length),
        (options_tag, TIFF_LONG, options),
    ];

    let mut out = Vec::with_capacity(data_offset as usize + payload.len());
    out.extend_from_slice(b"II*\0");
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&(ENTRIES as u16).to_le_bytes());
    for (tag, kind, value) in entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        if kind == TIFF_SHORT {
            out.extend_from_slice(&(value as u16).to_le_bytes());
            out.extend_from_slice(&[0, 0]);
        } else {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}
