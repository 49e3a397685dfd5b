use image::{Rgb, RgbImage};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use upright::encode::{Quality, decode, encode_jpeg};
use upright::exif::{Detection, detect_orientation};
use upright::orientation::Orientation;
use upright::pipeline::{NormalizeOptions, normalize};
use upright::{DetectError, NormalizeError, Stage};

/// TIFF data (no `Exif\0\0` prefix) with an IFD0 holding only the orientation tag.
fn orientation_tiff(value: u16, little: bool) -> Vec<u8> {
    let mut tiff = Vec::new();
    if little {
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x0112u16.to_le_bytes());
        tiff.extend_from_slice(&3u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&value.to_le_bytes());
    } else {
        tiff.extend_from_slice(b"MM");
        tiff.extend_from_slice(&42u16.to_be_bytes());
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&value.to_be_bytes());
    }
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&[0, 0, 0, 0]);
    tiff
}

fn with_orientation(plain: &[u8], value: u16, little: bool) -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(plain)).unwrap();
    jpeg.set_exif(Some(Bytes::from(orientation_tiff(value, little))));
    jpeg.encoder().bytes().to_vec()
}

fn solid_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 140, 200]));
    encode_jpeg(&img, Quality::new(0.9).unwrap()).unwrap()
}

/// 64x32 with the left half red and the right half blue.
fn split_jpeg() -> Vec<u8> {
    let img = RgbImage::from_fn(64, 32, |x, _| {
        if x < 32 { Rgb([230, 20, 20]) } else { Rgb([20, 20, 230]) }
    });
    encode_jpeg(&img, Quality::new(0.95).unwrap()).unwrap()
}

fn is_red(p: &Rgb<u8>) -> bool {
    p[0] > 150 && p[2] < 100
}

fn is_blue(p: &Rgb<u8>) -> bool {
    p[2] > 150 && p[0] < 100
}

// ── end-to-end scenarios ─────────────────────────────────────────────

#[test]
fn portrait_with_orientation_6_becomes_landscape() {
    let raw = with_orientation(&solid_jpeg(100, 200), 6, false);
    assert_eq!(
        detect_orientation(&raw).unwrap(),
        Detection::Detected(Orientation::Rotate90)
    );

    let out = normalize(&raw, &NormalizeOptions::default()).unwrap();
    assert_eq!((out.width, out.height), (200, 100));
    assert_eq!(out.transform.as_tuple(), (0, 1, -1, 0, 200, 0));
    assert_eq!(out.quality.factor(), 0.25);
    assert_eq!(decode(&out.bytes).unwrap().dimensions(), (200, 100));
}

#[test]
fn portrait_without_metadata_is_unchanged_in_shape() {
    let raw = solid_jpeg(100, 200);
    let out = normalize(&raw, &NormalizeOptions::default()).unwrap();
    assert_eq!((out.width, out.height), (100, 200));
    assert!(out.transform.is_identity());
    assert_eq!(out.orientation, None);
}

#[test]
fn four_byte_buffers_never_panic() {
    let err = normalize(&[0xFF, 0xD8, 0xFF, 0xE1], &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, NormalizeError::Detect(DetectError::CorruptMetadata { .. })));

    assert_eq!(
        detect_orientation(&[0xFF, 0xD8, 0x00, 0x00]).unwrap(),
        Detection::Absent
    );
}

// ── properties ───────────────────────────────────────────────────────

#[test]
fn every_code_gives_expected_dimensions() {
    let plain = solid_jpeg(48, 16);
    for code in 1..=8u16 {
        for little in [true, false] {
            let raw = with_orientation(&plain, code, little);
            let out = normalize(&raw, &NormalizeOptions::default()).unwrap();
            let expected = if code >= 5 { (16, 48) } else { (48, 16) };
            assert_eq!((out.width, out.height), expected, "code {code}");
            assert_eq!(out.orientation.map(Orientation::to_exif), Some(code));
        }
    }
}

#[test]
fn rotate90_puts_left_half_on_top() {
    let raw = with_orientation(&split_jpeg(), 6, true);
    let out = decode(&normalize(&raw, &NormalizeOptions::default()).unwrap().bytes).unwrap();
    assert_eq!(out.dimensions(), (32, 64));
    assert!(is_red(out.get_pixel(16, 12)), "{:?}", out.get_pixel(16, 12));
    assert!(is_blue(out.get_pixel(16, 52)), "{:?}", out.get_pixel(16, 52));
}

#[test]
fn rotate270_puts_left_half_at_bottom() {
    let raw = with_orientation(&split_jpeg(), 8, true);
    let out = decode(&normalize(&raw, &NormalizeOptions::default()).unwrap().bytes).unwrap();
    assert_eq!(out.dimensions(), (32, 64));
    assert!(is_blue(out.get_pixel(16, 12)));
    assert!(is_red(out.get_pixel(16, 52)));
}

#[test]
fn mirror_swaps_halves() {
    let raw = with_orientation(&split_jpeg(), 2, false);
    let out = decode(&normalize(&raw, &NormalizeOptions::default()).unwrap().bytes).unwrap();
    assert_eq!(out.dimensions(), (64, 32));
    assert!(is_blue(out.get_pixel(12, 16)));
    assert!(is_red(out.get_pixel(52, 16)));
}

#[test]
fn output_carries_no_orientation_tag() {
    let raw = with_orientation(&solid_jpeg(20, 40), 6, true);
    let out = normalize(&raw, &NormalizeOptions::default()).unwrap();

    assert_eq!(detect_orientation(&out.bytes).unwrap(), Detection::Absent);
    let parsed = Jpeg::from_bytes(Bytes::from(out.bytes)).unwrap();
    assert!(parsed.exif().is_none());
}

#[test]
fn lower_quality_gives_smaller_output() {
    let img = RgbImage::from_fn(96, 96, |x, y| Rgb([(x * 2) as u8, (y * 2) as u8, ((x + y) % 256) as u8]));
    let raw = encode_jpeg(&img, Quality::new(1.0).unwrap()).unwrap();

    let small = normalize(&raw, &NormalizeOptions::default()).unwrap();
    let large = normalize(
        &raw,
        &NormalizeOptions {
            quality: Quality::new(0.95).unwrap(),
            ..NormalizeOptions::default()
        },
    )
    .unwrap();
    assert!(small.bytes.len() < large.bytes.len());
}

#[test]
fn non_jpeg_inputs_are_invalid_container() {
    let inputs: [&[u8]; 4] = [b"", b"\x00", b"GIF89a", b"\xD8\xFF\xE1\x00"];
    for input in inputs {
        let err = normalize(input, &NormalizeOptions::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::Detect(DetectError::InvalidContainer { .. })), "{input:?}");
        assert_eq!(err.stage(), Stage::Detecting);
    }
}

#[test]
fn truncated_exif_is_corrupt_not_a_panic() {
    let raw = with_orientation(&solid_jpeg(8, 8), 6, true);
    // Cut inside the EXIF segment.
    let cut = &raw[..24];
    assert!(matches!(
        normalize(cut, &NormalizeOptions::default()),
        Err(NormalizeError::Detect(DetectError::CorruptMetadata { .. }))
    ));
}

#[test]
fn concurrent_calls_are_independent() {
    let inputs: Vec<(u16, Vec<u8>)> = (1..=8u16)
        .map(|code| (code, with_orientation(&solid_jpeg(30, 12), code, code % 2 == 0)))
        .collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|(code, raw)| {
                s.spawn(move || {
                    let out = normalize(raw, &NormalizeOptions::default()).unwrap();
                    (*code, out.width, out.height)
                })
            })
            .collect();

        for handle in handles {
            let (code, w, h) = handle.join().unwrap();
            let expected = if code >= 5 { (12, 30) } else { (30, 12) };
            assert_eq!((w, h), expected, "code {code}");
        }
    });
}
