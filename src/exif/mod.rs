//! Reading EXIF metadata from JPEG files.
//!
//! - [`detect_orientation`]: byte-level scan for the orientation tag; drives normalization
//! - [`read_summary`]: camera make/model/date via `nom-exif`, for diagnostics only

mod reader;
mod summary;

pub use reader::{Detection, detect_orientation};
pub use summary::{ExifSummary, read_summary};
