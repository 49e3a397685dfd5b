//! # upright
//!
//! Put JPEG cover photos upright before they are uploaded. The EXIF
//! orientation tag is read straight from the JPEG header, the pixels are
//! redrawn through the matching canvas transform, and the result is
//! re-encoded as a compact JPEG (quality 0.25 by default).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use upright::pipeline::{normalize, NormalizeOptions};
//!
//! fn main() -> anyhow::Result<()> {
//!     let raw = std::fs::read("cover.jpg")?;
//!     let image = normalize(&raw, &NormalizeOptions::default())?;
//!
//!     println!("orientation: {:?}", image.orientation);
//!     println!("{}x{}, {} bytes", image.width, image.height, image.bytes.len());
//!     std::fs::write("cover-upright.jpg", &image.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Uploading
//!
//! ```rust,no_run
//! use upright::pipeline::{upload_cover, NormalizeOptions};
//! use upright::storage::{DirectoryStore, DEFAULT_KEY_PREFIX};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = DirectoryStore::new("./bucket");
//!     let upload = upload_cover(
//!         Path::new("cover.jpg"),
//!         &store,
//!         NormalizeOptions::default(),
//!         DEFAULT_KEY_PREFIX,
//!     )
//!     .await?;
//!     println!("{} -> {}", upload.key, upload.url);
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! ```rust,no_run
//! use upright::encode::{decode, draw, encode_jpeg, Quality};
//! use upright::exif::detect_orientation;
//! use upright::orientation::plan;
//!
//! # fn example(raw: &[u8]) -> anyhow::Result<()> {
//! let orientation = detect_orientation(raw)?.orientation();
//! let src = decode(raw)?;
//! let plan = plan(src.width(), src.height(), orientation);
//! let jpeg = encode_jpeg(&draw(&src, &plan)?, Quality::DEFAULT)?;
//! # let _ = jpeg;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`exif`]: orientation detection and a diagnostic EXIF summary
//! - [`orientation`]: orientation codes, canvas transforms, and plans
//! - [`encode`]: decode, draw through a transform, encode JPEG
//! - [`pipeline`]: the normalize request, file collection, upload
//! - [`storage`]: object store trait and backends
//! - [`config`]: configuration types and loading/saving
//! - [`error`]: error types and pipeline stages

pub mod config;
pub mod encode;
pub mod error;
pub mod exif;
pub mod orientation;
pub mod pipeline;
pub mod storage;

pub use error::{DetectError, NormalizeError, Stage};
