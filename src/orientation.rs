//! EXIF orientation codes and the canvas transform that puts an image upright.
//!
//! ```text
//!     1: Normal      2: MirrorH     3: Rotate180   4: MirrorV
//!     ┌───┐          ┌───┐          ┌───┐          ┌───┐
//!     │ F │          │ Ꟊ │          │   │          │   │
//!     │   │          │   │          │ Ꟊ │          │ F │
//!     └───┘          └───┘          └───┘          └───┘
//!
//!     5: Transpose   6: Rotate90    7: Transverse  8: Rotate270
//!     ┌────┐         ┌────┐         ┌────┐         ┌────┐
//!     │ F  │         │  F │         │  Ꟊ │         │ Ꟊ  │
//!     └────┘         └────┘         └────┘         └────┘
//! ```
//!
//! The drawings show how the stored pixels look; [`plan`] gives the transform
//! that undoes it.

use std::fmt;

/// The EXIF orientation tag value (0x0112), restricted to the eight defined codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// 1
    Normal,
    /// 2
    MirrorHorizontal,
    /// 3
    Rotate180,
    /// 4
    MirrorVertical,
    /// 5: mirrored horizontally, then rotated 270° clockwise.
    MirrorHorizontalRotate270,
    /// 6
    Rotate90,
    /// 7: mirrored horizontally, then rotated 90° clockwise.
    MirrorHorizontalRotate90,
    /// 8
    Rotate270,
}

impl Orientation {
    const ALL: [Self; 8] = [
        Self::Normal,
        Self::MirrorHorizontal,
        Self::Rotate180,
        Self::MirrorVertical,
        Self::MirrorHorizontalRotate270,
        Self::Rotate90,
        Self::MirrorHorizontalRotate90,
        Self::Rotate270,
    ];

    /// Create from the raw tag value. Returns `None` outside 1..=8.
    pub fn from_exif(value: u16) -> Option<Self> {
        match value {
            1..=8 => Some(Self::ALL[usize::from(value - 1)]),
            _ => None,
        }
    }

    /// The raw tag value (1..=8).
    pub fn to_exif(self) -> u16 {
        match self {
            Self::Normal => 1,
            Self::MirrorHorizontal => 2,
            Self::Rotate180 => 3,
            Self::MirrorVertical => 4,
            Self::MirrorHorizontalRotate270 => 5,
            Self::Rotate90 => 6,
            Self::MirrorHorizontalRotate90 => 7,
            Self::Rotate270 => 8,
        }
    }

    /// Whether correcting this orientation swaps width and height.
    pub fn swaps_axes(self) -> bool {
        self.to_exif() > 4
    }

    pub fn is_normal(self) -> bool {
        self == Self::Normal
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Normal => "normal",
            Self::MirrorHorizontal => "mirrored horizontal",
            Self::Rotate180 => "rotated 180",
            Self::MirrorVertical => "mirrored vertical",
            Self::MirrorHorizontalRotate270 => "mirrored horizontal, rotated 270",
            Self::Rotate90 => "rotated 90",
            Self::MirrorHorizontalRotate90 => "mirrored horizontal, rotated 90",
            Self::Rotate270 => "rotated 270",
        };
        write!(f, "{} ({label})", self.to_exif())
    }
}

/// A 2D affine transform in canvas order `(a, b, c, d, e, f)`:
///
/// ```text
///     x' = a·x + c·y + e
///     y' = b·x + d·y + f
/// ```
///
/// Orientation transforms only ever hold 0/±1 in the linear part and whole
/// pixel counts in the translation, so everything stays in integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
    pub e: i64,
    pub f: i64,
}

impl Transform {
    pub const IDENTITY: Self = Self::new(1, 0, 0, 1, 0, 0);

    pub const fn new(a: i64, b: i64, c: i64, d: i64, e: i64, f: i64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn as_tuple(self) -> (i64, i64, i64, i64, i64, i64) {
        (self.a, self.b, self.c, self.d, self.e, self.f)
    }

    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }

    /// Map a point.
    pub fn apply(self, x: i64, y: i64) -> (i64, i64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// `self` followed by `next`.
    pub fn then(self, next: Self) -> Self {
        Self {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    /// Map the pixel at column `x`, row `y` to its destination pixel.
    ///
    /// The pixel centre `(x + ½, y + ½)` is transformed and floored back to
    /// a pixel index. Done in doubled coordinates to stay exact.
    pub fn map_pixel(self, x: u32, y: u32) -> (i64, i64) {
        let cx = 2 * i64::from(x) + 1;
        let cy = 2 * i64::from(y) + 1;
        let dx = self.a * cx + self.c * cy + 2 * self.e;
        let dy = self.b * cx + self.d * cy + 2 * self.f;
        ((dx - 1).div_euclid(2), (dy - 1).div_euclid(2))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The transform and target canvas size that put a `width × height` image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationPlan {
    pub transform: Transform,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl OrientationPlan {
    /// Whether drawing through this plan would leave the pixels untouched.
    pub fn is_identity(&self) -> bool {
        self.transform.is_identity()
    }
}

/// Build the canvas transform for an image of the given decoded size.
///
/// `None` (no orientation tag) and [`Orientation::Normal`] both give the
/// identity with the canvas at source size. Codes 5–8 swap the canvas sides.
pub fn plan(width: u32, height: u32, orientation: Option<Orientation>) -> OrientationPlan {
    let w = i64::from(width);
    let h = i64::from(height);

    let transform = match orientation {
        None | Some(Orientation::Normal) => Transform::IDENTITY,
        Some(Orientation::MirrorHorizontal) => Transform::new(-1, 0, 0, 1, w, 0),
        Some(Orientation::Rotate180) => Transform::new(-1, 0, 0, -1, w, h),
        Some(Orientation::MirrorVertical) => Transform::new(1, 0, 0, -1, 0, h),
        Some(Orientation::MirrorHorizontalRotate270) => Transform::new(0, 1, 1, 0, 0, 0),
        Some(Orientation::Rotate90) => Transform::new(0, 1, -1, 0, h, 0),
        Some(Orientation::MirrorHorizontalRotate90) => Transform::new(0, -1, -1, 0, h, w),
        Some(Orientation::Rotate270) => Transform::new(0, -1, 1, 0, 0, w),
    };

    let (canvas_width, canvas_height) = match orientation {
        Some(o) if o.swaps_axes() => (height, width),
        _ => (width, height),
    };

    OrientationPlan {
        transform,
        canvas_width,
        canvas_height,
    }
}
