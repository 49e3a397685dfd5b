use std::fmt;

/// Where a normalization request stopped.
///
/// A request moves `Idle → Detecting → Transforming → Encoding → Ready`.
/// Any stage may fail instead; `Ready` and a failure are both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Detecting,
    Transforming,
    Encoding,
    Ready,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Detecting => "detecting",
            Stage::Transforming => "transforming",
            Stage::Encoding => "encoding",
            Stage::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Fatal outcomes of the orientation scan.
///
/// Missing orientation metadata is not one of them; see
/// [`Detection::Absent`](crate::exif::Detection::Absent).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectError {
    /// The buffer does not start with the JPEG start-of-image marker.
    #[error("not a JPEG: expected FF D8, found {found:02X?}")]
    InvalidContainer { found: Vec<u8> },
    /// A segment length or EXIF offset points outside the data it belongs to.
    #[error("corrupt metadata at byte {offset} (marker {marker:#06X}): {reason}")]
    CorruptMetadata {
        offset: usize,
        marker: u16,
        reason: &'static str,
    },
}

/// Every way a normalization request can fail.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The orientation scan rejected the input.
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error("failed to decode image: {0}")]
    DecodeFailure(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    EncodingFailure(String),
    #[error("quality must be in (0, 1], got {0}")]
    InvalidQuality(f32),
    #[error("input is {len} bytes, limit is {max}")]
    InputTooLarge { len: usize, max: usize },
    /// The worker running a stage panicked or was cancelled.
    #[error("{stage} stage interrupted: {reason}")]
    Interrupted { stage: Stage, reason: String },
}

impl NormalizeError {
    /// The stage that was running when this error ended the request.
    pub fn stage(&self) -> Stage {
        match self {
            NormalizeError::InvalidQuality(_) | NormalizeError::InputTooLarge { .. } => Stage::Idle,
            NormalizeError::Detect(_) => Stage::Detecting,
            NormalizeError::DecodeFailure(_) => Stage::Transforming,
            NormalizeError::EncodingFailure(_) => Stage::Encoding,
            NormalizeError::Interrupted { stage, .. } => *stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_error_converts_preserving_context() {
        let err: NormalizeError = DetectError::CorruptMetadata {
            offset: 4,
            marker: 0xFFE1,
            reason: "segment length runs past end of buffer",
        }
        .into();
        match err {
            NormalizeError::Detect(DetectError::CorruptMetadata { offset, marker, .. }) => {
                assert_eq!(offset, 4);
                assert_eq!(marker, 0xFFE1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn stage_of_each_error() {
        assert_eq!(NormalizeError::InvalidQuality(0.0).stage(), Stage::Idle);
        assert_eq!(
            NormalizeError::from(DetectError::InvalidContainer { found: vec![0, 0] }).stage(),
            Stage::Detecting
        );
        assert_eq!(
            NormalizeError::EncodingFailure("boom".into()).stage(),
            Stage::Encoding
        );
    }

    #[test]
    fn messages_carry_offset_and_marker() {
        let err = DetectError::CorruptMetadata {
            offset: 20,
            marker: 0xFFE1,
            reason: "IFD0 offset outside segment",
        };
        let msg = err.to_string();
        assert!(msg.contains("byte 20"), "{msg}");
        assert!(msg.contains("0xFFE1"), "{msg}");
    }

    #[test]
    fn detect_errors_display_the_same_when_wrapped() {
        let err = DetectError::InvalidContainer {
            found: vec![0x47, 0x49],
        };
        let wrapped = NormalizeError::from(err.clone());
        assert_eq!(wrapped.to_string(), err.to_string());
    }
}
