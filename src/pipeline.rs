use anyhow::{Context, Result};
use base64::Engine;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, NormalizeConfig, StorageBackend};
use crate::encode::{self, Quality};
use crate::error::{NormalizeError, Stage};
use crate::exif::{Detection, detect_orientation};
use crate::orientation::{self, Orientation, OrientationPlan, Transform};
use crate::storage::{self, DirectoryStore, HttpStore, ObjectStore};

/// Supported image extensions. Cover photos are JPEG only.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Per-call normalization options.
///
/// # Example
///
/// ```rust
/// use upright::encode::Quality;
/// use upright::pipeline::NormalizeOptions;
///
/// let options = NormalizeOptions {
///     quality: Quality::new(0.5).unwrap(),
///     ..NormalizeOptions::default()
/// };
/// assert!(!options.passthrough_upright);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    pub quality: Quality,
    /// Return the input unchanged when no correction is needed.
    pub passthrough_upright: bool,
    pub max_input_bytes: Option<usize>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            quality: Quality::DEFAULT,
            passthrough_upright: false,
            max_input_bytes: None,
        }
    }
}

impl From<&NormalizeConfig> for NormalizeOptions {
    fn from(config: &NormalizeConfig) -> Self {
        Self {
            quality: config.quality,
            passthrough_upright: config.passthrough_upright,
            max_input_bytes: config.max_input_bytes,
        }
    }
}

/// An upright, re-encoded image ready for upload.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// The orientation read from the input, `None` if it had none.
    pub orientation: Option<Orientation>,
    /// The transform that was drawn through.
    pub transform: Transform,
    /// `false` when the input was passed through untouched.
    pub reencoded: bool,
    pub quality: Quality,
}

impl NormalizedImage {
    /// The image as a `data:image/jpeg;base64,...` URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Normalize one JPEG: detect its orientation, draw it upright, re-encode it.
///
/// The request goes `Idle → Detecting → Transforming → Encoding → Ready`.
/// Any failure ends it; [`NormalizeError::stage`] tells which stage failed.
/// Nothing is retried.
///
/// # Example
///
/// ```rust,no_run
/// use upright::pipeline::{normalize, NormalizeOptions};
///
/// # fn example() -> anyhow::Result<()> {
/// let raw = std::fs::read("photo.jpg")?;
/// let image = normalize(&raw, &NormalizeOptions::default())?;
/// println!(
///     "{}x{}, orientation {:?}, {} bytes",
///     image.width, image.height, image.orientation, image.bytes.len()
/// );
/// # Ok(())
/// # }
/// ```
pub fn normalize(bytes: &[u8], options: &NormalizeOptions) -> Result<NormalizedImage, NormalizeError> {
    check_input(bytes, options)?;

    enter(Stage::Detecting);
    let orientation = detect(bytes)?;

    enter(Stage::Transforming);
    let (canvas, plan) = match transform(bytes, orientation, options)? {
        Drawn::Canvas(canvas, plan) => (canvas, plan),
        Drawn::Unchanged { width, height } => {
            return Ok(passthrough(bytes, width, height, orientation, options));
        }
    };

    enter(Stage::Encoding);
    let encoded = encode::encode_jpeg(&canvas, options.quality)?;

    enter(Stage::Ready);
    Ok(finish(encoded, &plan, orientation, options))
}

/// [`normalize`] as a sequence of awaited stages.
///
/// Decoding, drawing, and encoding run on the blocking thread pool so a
/// large photo does not stall the runtime.
pub async fn normalize_async(
    bytes: Vec<u8>,
    options: NormalizeOptions,
) -> Result<NormalizedImage, NormalizeError> {
    check_input(&bytes, &options)?;

    enter(Stage::Detecting);
    let orientation = detect(&bytes)?;

    enter(Stage::Transforming);
    let (bytes, transformed) = blocking(Stage::Transforming, move || {
        let result = transform(&bytes, orientation, &options);
        (bytes, result)
    })
    .await?;
    let (canvas, plan) = match transformed? {
        Drawn::Canvas(canvas, plan) => (canvas, plan),
        Drawn::Unchanged { width, height } => {
            return Ok(passthrough(&bytes, width, height, orientation, &options));
        }
    };

    enter(Stage::Encoding);
    let quality = options.quality;
    let encoded = blocking(Stage::Encoding, move || encode::encode_jpeg(&canvas, quality)).await??;

    enter(Stage::Ready);
    Ok(finish(encoded, &plan, orientation, &options))
}

fn enter(stage: Stage) {
    log::debug!("normalize: {stage}");
}

fn check_input(bytes: &[u8], options: &NormalizeOptions) -> Result<(), NormalizeError> {
    match options.max_input_bytes {
        Some(max) if bytes.len() > max => Err(NormalizeError::InputTooLarge {
            len: bytes.len(),
            max,
        }),
        _ => Ok(()),
    }
}

fn detect(bytes: &[u8]) -> Result<Option<Orientation>, NormalizeError> {
    let detection = detect_orientation(bytes)?;
    match detection {
        Detection::Detected(o) => log::debug!("orientation {o}"),
        Detection::Absent => log::debug!("no orientation metadata"),
    }
    Ok(detection.orientation())
}

/// What the transforming stage produced.
enum Drawn {
    Canvas(image::RgbImage, OrientationPlan),
    /// Already upright and passthrough is on; the input stands as is.
    Unchanged { width: u32, height: u32 },
}

fn transform(
    bytes: &[u8],
    orientation: Option<Orientation>,
    options: &NormalizeOptions,
) -> Result<Drawn, NormalizeError> {
    // Decoded even on passthrough: the bytes must be a real image before they are handed on.
    let src = encode::decode(bytes)?;
    let (width, height) = src.dimensions();

    if options.passthrough_upright && orientation.is_none_or(Orientation::is_normal) {
        return Ok(Drawn::Unchanged { width, height });
    }

    let plan = orientation::plan(width, height, orientation);
    let canvas = encode::draw(&src, &plan)?;
    Ok(Drawn::Canvas(canvas, plan))
}

fn passthrough(
    bytes: &[u8],
    width: u32,
    height: u32,
    orientation: Option<Orientation>,
    options: &NormalizeOptions,
) -> NormalizedImage {
    log::debug!("normalize: {} (passthrough)", Stage::Ready);
    NormalizedImage {
        bytes: bytes.to_vec(),
        width,
        height,
        orientation,
        transform: Transform::IDENTITY,
        reencoded: false,
        quality: options.quality,
    }
}

fn finish(
    bytes: Vec<u8>,
    plan: &OrientationPlan,
    orientation: Option<Orientation>,
    options: &NormalizeOptions,
) -> NormalizedImage {
    NormalizedImage {
        bytes,
        width: plan.canvas_width,
        height: plan.canvas_height,
        orientation,
        transform: plan.transform,
        reencoded: true,
        quality: options.quality,
    }
}

async fn blocking<T, F>(stage: Stage, f: F) -> Result<T, NormalizeError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NormalizeError::Interrupted {
            stage,
            reason: e.to_string(),
        })
}

/// The result of processing a single file.
#[derive(Debug, serde::Serialize)]
pub struct ProcessResult {
    pub path: PathBuf,
    /// Detected EXIF orientation value (1..=8), `None` if absent.
    pub orientation: Option<u16>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub reencoded: bool,
    pub output_bytes: Option<usize>,
    /// Where the normalized file was written, if an output directory is set.
    pub output_path: Option<PathBuf>,
    /// URL returned by the object store, if an upload happened.
    pub url: Option<String>,
    pub error: Option<String>,
}

/// Collect JPEG files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks).
///
/// # Example
///
/// ```rust,no_run
/// use upright::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("cover.jpg"),        // single file
///     PathBuf::from("./covers/"),        // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a JPEG extension.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Build the object store named in the config, if any.
///
/// Returns `None` (with a warning) when the backend is selected but not
/// configured.
pub fn build_store(config: &Config) -> Option<Box<dyn ObjectStore>> {
    match config.storage.backend {
        StorageBackend::None => None,
        StorageBackend::Directory => {
            if config.storage.directory.is_empty() {
                log::warn!("Directory storage selected but no directory configured");
                return None;
            }
            Some(Box::new(DirectoryStore::new(&config.storage.directory)))
        }
        StorageBackend::Http => {
            if config.storage.endpoint.is_empty() {
                log::warn!("HTTP storage selected but no endpoint configured");
                return None;
            }
            Some(Box::new(HttpStore::new(
                config.storage.endpoint.clone(),
                config.storage.token.clone(),
            )))
        }
    }
}

/// Result of [`upload_cover`].
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub key: String,
    pub url: String,
    pub image: NormalizedImage,
}

/// Normalize a cover photo and hand it to `store`.
///
/// Only JPEG input is accepted, by extension or by its leading bytes.
pub async fn upload_cover(
    path: &Path,
    store: &dyn ObjectStore,
    options: NormalizeOptions,
    key_prefix: &str,
) -> Result<UploadResult> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if !is_supported_image(path) && !raw.starts_with(&[0xFF, 0xD8]) {
        anyhow::bail!("Not a JPEG image: {}", path.display());
    }

    let image = normalize_async(raw, options).await?;

    let key = storage::object_key(key_prefix, storage::unique_millis());
    let url = store
        .store(&key, &image.bytes)
        .await
        .with_context(|| format!("{} store failed for {key}", store.name()))?;
    log::info!("Uploaded {} to {url}", path.display());

    Ok(UploadResult { key, url, image })
}

/// Process a single file: normalize, optionally write it out, optionally upload it.
///
/// Errors are captured in [`ProcessResult::error`] so a batch can continue.
pub async fn process_image(
    path: &Path,
    store: Option<&dyn ObjectStore>,
    config: &Config,
) -> ProcessResult {
    let mut result = ProcessResult {
        path: path.to_path_buf(),
        orientation: None,
        width: None,
        height: None,
        reencoded: false,
        output_bytes: None,
        output_path: None,
        url: None,
        error: None,
    };

    if let Err(e) = process_into(path, store, config, &mut result).await {
        result.error = Some(format!("{e:#}"));
    }

    result
}

async fn process_into(
    path: &Path,
    store: Option<&dyn ObjectStore>,
    config: &Config,
    result: &mut ProcessResult,
) -> Result<()> {
    let options = NormalizeOptions::from(&config.normalize);

    let image = match store {
        Some(store) if !config.output.dry_run => {
            let upload =
                upload_cover(path, store, options, &config.storage.key_prefix).await?;
            result.url = Some(upload.url);
            upload.image
        }
        _ => {
            let raw = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            normalize_async(raw, options).await?
        }
    };

    result.orientation = image.orientation.map(Orientation::to_exif);
    result.width = Some(image.width);
    result.height = Some(image.height);
    result.reencoded = image.reencoded;
    result.output_bytes = Some(image.bytes.len());

    if let Some(ref out_dir) = config.output.out_dir {
        let out_path = output_path(Path::new(out_dir), path, &config.output.suffix);
        if !config.output.dry_run {
            tokio::fs::create_dir_all(out_dir)
                .await
                .with_context(|| format!("Failed to create {out_dir}"))?;
            tokio::fs::write(&out_path, &image.bytes)
                .await
                .with_context(|| format!("Failed to write {}", out_path.display()))?;
        }
        result.output_path = Some(out_path);
    }

    Ok(())
}

/// `out_dir/<stem><suffix>.jpg`
fn output_path(out_dir: &Path, input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    out_dir.join(format!("{stem}{suffix}.jpg"))
}
