use crate::error::DetectError;
use crate::orientation::Orientation;

const SOI: u16 = 0xFFD8;
const EOI: u16 = 0xFFD9;
const SOS: u16 = 0xFFDA;
const APP1: u16 = 0xFFE1;
const TEM: u16 = 0xFF01;

const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";
const TAG_ORIENTATION: u16 = 0x0112;
const IFD_ENTRY_LEN: usize = 12;

/// Outcome of a successful orientation scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Detected(Orientation),
    /// No EXIF segment, no orientation tag, or a tag value outside 1..=8.
    Absent,
}

impl Detection {
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            Detection::Detected(o) => Some(o),
            Detection::Absent => None,
        }
    }
}

/// Find the EXIF orientation of a JPEG by walking its header segments.
///
/// Only the marker/length framing before the first scan is read; pixel data
/// is never touched. Returns [`DetectError::InvalidContainer`] when the
/// buffer does not start with `FF D8` and [`DetectError::CorruptMetadata`]
/// when a length or offset would read past the data it describes.
pub fn detect_orientation(bytes: &[u8]) -> Result<Detection, DetectError> {
    if read_u16_be(bytes, 0) != Some(SOI) {
        return Err(DetectError::InvalidContainer {
            found: bytes.iter().take(2).copied().collect(),
        });
    }

    let mut offset = 2;
    loop {
        // Fill bytes: any number of 0xFF may precede a marker.
        while bytes.get(offset) == Some(&0xFF) && bytes.get(offset + 1) == Some(&0xFF) {
            offset += 1;
        }

        if offset == bytes.len() {
            return Ok(Detection::Absent);
        }
        let Some(marker) = read_u16_be(bytes, offset) else {
            return Err(corrupt(offset, 0, "truncated segment marker"));
        };
        if marker & 0xFF00 != 0xFF00 || marker == SOS || marker == EOI {
            log::debug!("orientation scan stopped at marker {marker:#06X} (byte {offset})");
            return Ok(Detection::Absent);
        }
        offset += 2;

        if is_standalone(marker) {
            continue;
        }

        let Some(length) = read_u16_be(bytes, offset) else {
            return Err(corrupt(offset, marker, "truncated segment length"));
        };
        let length = usize::from(length);
        if length < 2 {
            return Err(corrupt(offset, marker, "segment length smaller than its own field"));
        }
        let end = offset + length;
        if end > bytes.len() {
            return Err(corrupt(offset, marker, "segment length runs past end of buffer"));
        }

        let payload = &bytes[offset + 2..end];
        if marker == APP1 {
            if payload.starts_with(EXIF_SIGNATURE) {
                return parse_exif(payload, offset + 2);
            }
            log::debug!("skipping non-EXIF APP1 segment at byte {offset}");
        }

        offset = end;
    }
}

/// Markers that are not followed by a length field.
fn is_standalone(marker: u16) -> bool {
    marker == TEM || (0xFFD0..=0xFFD7).contains(&marker)
}

/// Parse the TIFF structure inside an `Exif\0\0` APP1 payload.
///
/// `base` is the absolute offset of `payload` in the file, used for error context.
fn parse_exif(payload: &[u8], base: usize) -> Result<Detection, DetectError> {
    let tiff = &payload[EXIF_SIGNATURE.len()..];
    let tiff_base = base + EXIF_SIGNATURE.len();
    let fail = |at: usize, reason| corrupt(tiff_base.saturating_add(at), APP1, reason);

    let order = match tiff.get(0..2) {
        Some(b"II") => ByteOrder::Little,
        Some(b"MM") => ByteOrder::Big,
        _ => return Err(fail(0, "unknown TIFF byte order")),
    };
    if order.u16(tiff, 2) != Some(42) {
        return Err(fail(2, "bad TIFF magic"));
    }
    let ifd = order
        .u32(tiff, 4)
        .ok_or_else(|| fail(4, "truncated TIFF header"))?;
    let ifd = usize::try_from(ifd).map_err(|_| fail(4, "IFD0 offset outside segment"))?;

    let count = order
        .u16(tiff, ifd)
        .ok_or_else(|| fail(ifd, "IFD0 offset outside segment"))?;
    let entries = ifd + 2;
    let table_end = entries + usize::from(count) * IFD_ENTRY_LEN;
    if table_end > tiff.len() {
        return Err(fail(entries, "IFD0 entry table runs past end of segment"));
    }

    for i in 0..usize::from(count) {
        let entry = entries + i * IFD_ENTRY_LEN;
        if order.u16(tiff, entry) != Some(TAG_ORIENTATION) {
            continue;
        }
        let value = order
            .u16(tiff, entry + 8)
            .ok_or_else(|| fail(entry, "truncated orientation entry"))?;
        return Ok(match Orientation::from_exif(value) {
            Some(o) => Detection::Detected(o),
            None => {
                log::warn!("ignoring out-of-range orientation value {value}");
                Detection::Absent
            }
        });
    }

    Ok(Detection::Absent)
}

fn corrupt(offset: usize, marker: u16, reason: &'static str) -> DetectError {
    DetectError::CorruptMetadata {
        offset,
        marker,
        reason,
    }
}

fn read_u16_be(bytes: &[u8], at: usize) -> Option<u16> {
    ByteOrder::Big.u16(bytes, at)
}

#[derive(Debug, Clone, Copy)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, bytes: &[u8], at: usize) -> Option<u16> {
        let raw: [u8; 2] = bytes.get(at..at.checked_add(2)?)?.try_into().ok()?;
        Some(match self {
            ByteOrder::Little => u16::from_le_bytes(raw),
            ByteOrder::Big => u16::from_be_bytes(raw),
        })
    }

    fn u32(self, bytes: &[u8], at: usize) -> Option<u32> {
        let raw: [u8; 4] = bytes.get(at..at.checked_add(4)?)?.try_into().ok()?;
        Some(match self {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        })
    }
}
