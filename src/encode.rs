use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;
use crate::orientation::OrientationPlan;

/// JPEG quality as a factor in (0, 1].
///
/// Defaults to 0.25: cover photos are shown small, so upload size wins over
/// fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    pub const DEFAULT: Self = Self(0.25);

    pub fn new(factor: f32) -> Result<Self, NormalizeError> {
        if factor > 0.0 && factor <= 1.0 {
            Ok(Self(factor))
        } else {
            Err(NormalizeError::InvalidQuality(factor))
        }
    }

    pub fn factor(self) -> f32 {
        self.0
    }

    /// The encoder's 1..=100 scale.
    pub fn to_percent(self) -> u8 {
        let percent = (self.0 * 100.0).round().clamp(1.0, 100.0);
        // Clamped to 1..=100 above.
        percent as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f32> for Quality {
    type Error = NormalizeError;

    fn try_from(factor: f32) -> Result<Self, Self::Error> {
        Self::new(factor)
    }
}

impl From<Quality> for f32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Decode JPEG bytes to 8-bit RGB. Alpha and extra channels are dropped.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, NormalizeError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(NormalizeError::DecodeFailure)?;
    Ok(img.into_rgb8())
}

/// Draw `src` through the plan's transform onto a fresh canvas.
///
/// Every source pixel lands on exactly one canvas pixel; no resampling.
pub fn draw(src: &RgbImage, plan: &OrientationPlan) -> Result<RgbImage, NormalizeError> {
    let (width, height) = src.dimensions();
    let expected = if plan.transform.b != 0 {
        (height, width)
    } else {
        (width, height)
    };
    if expected != (plan.canvas_width, plan.canvas_height) {
        return Err(NormalizeError::EncodingFailure(format!(
            "canvas {}x{} does not fit a {width}x{height} source",
            plan.canvas_width, plan.canvas_height
        )));
    }

    if plan.is_identity() {
        return Ok(src.clone());
    }

    let mut canvas = RgbImage::new(plan.canvas_width, plan.canvas_height);
    for (x, y, pixel) in src.enumerate_pixels() {
        let (dx, dy) = plan.transform.map_pixel(x, y);
        let target = u32::try_from(dx)
            .ok()
            .zip(u32::try_from(dy).ok())
            .filter(|&(dx, dy)| dx < plan.canvas_width && dy < plan.canvas_height);
        let Some((dx, dy)) = target else {
            return Err(NormalizeError::EncodingFailure(format!(
                "transform maps pixel ({x}, {y}) outside the {}x{} canvas",
                plan.canvas_width, plan.canvas_height
            )));
        };
        canvas.put_pixel(dx, dy, *pixel);
    }

    Ok(canvas)
}

/// Encode RGB pixels as a baseline JPEG.
pub fn encode_jpeg(img: &RgbImage, quality: Quality) -> Result<Vec<u8>, NormalizeError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.to_percent());
    encoder
        .encode_image(img)
        .map_err(|e| NormalizeError::EncodingFailure(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::{Orientation, plan};
    use image::Rgb;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    /// 3x2 image with a single red pixel at the top-left corner.
    fn marked() -> RgbImage {
        let mut img = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, RED);
        img
    }

    fn red_at(img: &RgbImage) -> (u32, u32) {
        img.enumerate_pixels()
            .find(|(_, _, p)| **p == RED)
            .map(|(x, y, _)| (x, y))
            .unwrap()
    }

    // ── Quality ──────────────────────────────────────────────────────

    #[test]
    fn default_quality_is_quarter() {
        assert_eq!(Quality::default().factor(), 0.25);
        assert_eq!(Quality::default().to_percent(), 25);
    }

    #[test]
    fn quality_bounds() {
        assert!(Quality::new(1.0).is_ok());
        assert!(Quality::new(0.001).is_ok());
        assert!(Quality::new(0.0).is_err());
        assert!(Quality::new(1.5).is_err());
        assert!(Quality::new(f32::NAN).is_err());
        assert_eq!(Quality::new(0.001).unwrap().to_percent(), 1);
    }

    #[test]
    fn quality_deserializes_with_validation() {
        let q: Quality = serde_json::from_str("0.5").unwrap();
        assert_eq!(q.to_percent(), 50);
        assert!(serde_json::from_str::<Quality>("2.0").is_err());
    }

    // ── draw ─────────────────────────────────────────────────────────

    #[test]
    fn corner_lands_where_each_code_puts_it() {
        // Source is 3 wide, 2 tall; red pixel at (0, 0).
        let expected = [
            (1, (0, 0)),
            (2, (2, 0)),
            (3, (2, 1)),
            (4, (0, 1)),
            (5, (0, 0)),
            (6, (1, 0)),
            (7, (1, 2)),
            (8, (0, 2)),
        ];
        let src = marked();
        for (code, at) in expected {
            let p = plan(3, 2, Orientation::from_exif(code));
            let out = draw(&src, &p).unwrap();
            assert_eq!(out.dimensions(), (p.canvas_width, p.canvas_height));
            assert_eq!(red_at(&out), at, "code {code}");
        }
    }

    #[test]
    fn identity_draw_is_pixel_identical() {
        let src = marked();
        let out = draw(&src, &plan(3, 2, None)).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn mismatched_canvas_fails() {
        let src = marked();
        let p = plan(5, 5, Some(Orientation::Rotate90));
        assert!(matches!(
            draw(&src, &p),
            Err(NormalizeError::EncodingFailure(_))
        ));
    }

    #[test]
    fn plan_for_wrong_shape_fails_instead_of_panicking() {
        // Same area, wrong shape.
        let src = RgbImage::new(2, 3);
        let p = plan(3, 2, Some(Orientation::Rotate180));
        assert!(draw(&src, &p).is_err());
    }

    #[test]
    fn identity_plan_for_wrong_shape_fails() {
        let src = RgbImage::new(2, 3);
        assert!(matches!(
            draw(&src, &plan(3, 2, None)),
            Err(NormalizeError::EncodingFailure(_))
        ));
    }

    #[test]
    fn swapping_plan_accepts_transposed_source() {
        let src = RgbImage::new(2, 3);
        let out = draw(&src, &plan(2, 3, Some(Orientation::Rotate270))).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
    }

    // ── encode / decode ──────────────────────────────────────────────

    #[test]
    fn encode_then_decode_keeps_dimensions() {
        let img = RgbImage::from_pixel(40, 24, Rgb([120, 80, 40]));
        let bytes = encode_jpeg(&img, Quality::DEFAULT).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(decode(&bytes).unwrap().dimensions(), (40, 24));
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(matches!(
            decode(&[0xFF, 0xD8, 0xFF, 0xD9]),
            Err(NormalizeError::DecodeFailure(_))
        ));
    }
}
