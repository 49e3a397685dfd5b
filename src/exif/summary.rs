use anyhow::{Context, Result};
use nom_exif::*;
use std::path::Path;

/// Camera metadata shown next to the orientation in `--inspect` output.
///
/// Read with `nom-exif`, independently of [`detect_orientation`](super::detect_orientation).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExifSummary {
    pub make: Option<String>,
    pub model: Option<String>,
    pub taken_at: Option<String>,
    /// Orientation as nom-exif reports it, unparsed.
    pub orientation: Option<String>,
}

/// Read an [`ExifSummary`] from an image file.
///
/// A file without EXIF data yields an empty summary rather than an error.
pub fn read_summary(path: &Path) -> Result<ExifSummary> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(ExifSummary::default());
        }
    };
    let exif: Exif = iter.into();

    Ok(ExifSummary {
        make: exif.get(ExifTag::Make).and_then(entry_to_string),
        model: exif.get(ExifTag::Model).and_then(entry_to_string),
        taken_at: exif.get(ExifTag::DateTimeOriginal).and_then(entry_to_string),
        orientation: exif.get(ExifTag::Orientation).and_then(entry_to_string),
    })
}

fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}
