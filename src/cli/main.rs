use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use upright::encode::Quality;
use upright::exif::{self, Detection};
use upright::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "upright",
    version,
    about = "Put JPEG cover photos upright: apply the EXIF orientation, re-encode, and optionally upload"
)]
struct Cli {
    /// JPEG files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// JPEG quality factor in (0, 1] (overrides config)
    #[arg(short, long, value_name = "FACTOR")]
    quality: Option<f32>,

    /// Write normalized images into this directory (overrides config)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Upload normalized images to the configured storage backend
    #[arg(long)]
    upload: bool,

    /// Only report the orientation and camera metadata of each image
    #[arg(long)]
    inspect: bool,

    /// Preview without writing or uploading anything
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No JPEG files found in the specified paths.");
    }

    // Handle --inspect
    if cli.inspect {
        let mut reports = Vec::new();
        for image_path in &images {
            reports.push(inspect(image_path, cli.json)?);
        }
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        return Ok(());
    }

    // Load config and apply CLI overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(q) = cli.quality {
        config.normalize.quality = Quality::new(q)?;
    }
    if let Some(ref dir) = cli.out_dir {
        config.output.out_dir = Some(dir.to_string_lossy().into_owned());
    }
    if cli.dry_run {
        config.output.dry_run = true;
    }

    let store = if cli.upload {
        match pipeline::build_store(&config) {
            Some(store) => Some(store),
            None => anyhow::bail!(
                "No storage backend configured. Run `upright --init` and set \"storage.backend\" in config.json."
            ),
        }
    } else {
        None
    };

    if !cli.upload && config.output.out_dir.is_none() {
        log::warn!("Neither --out-dir nor --upload given; results are reported but not kept");
    }

    log::info!("Found {} image(s) to process", images.len());
    if config.output.dry_run {
        log::info!("DRY RUN: no files will be written or uploaded");
    }
    log::info!(
        "Quality {} ({}%)",
        config.normalize.quality.factor(),
        config.normalize.quality.to_percent()
    );

    let mut results = Vec::new();
    let total = images.len();

    for (i, image_path) in images.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, image_path.display());

        let result = pipeline::process_image(image_path, store.as_deref(), &config).await;

        if let Some(ref err) = result.error {
            log::error!("  Error: {err}");
        } else {
            match result.orientation {
                Some(o) => log::info!("  Orientation: {o}"),
                None => log::info!("  Orientation: absent"),
            }
            if let (Some(w), Some(h)) = (result.width, result.height) {
                let action = if result.reencoded { "Re-encoded" } else { "Passed through" };
                log::info!(
                    "  {action}: {w}x{h}, {} bytes",
                    result.output_bytes.unwrap_or_default()
                );
            }
            if let Some(ref out) = result.output_path {
                let verb = if config.output.dry_run { "Would write" } else { "Wrote" };
                log::info!("  {verb}: {}", out.display());
            }
            if let Some(ref url) = result.url {
                log::info!("  Uploaded: {url}");
            }
        }

        results.push(result);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Summary
    let success = results.iter().filter(|r| r.error.is_none()).count();
    let failed = total - success;
    log::info!("Done: {success} succeeded, {failed} failed out of {total} images");

    Ok(())
}

/// Print the detected orientation and the nom-exif summary of one image.
fn inspect(path: &Path, json: bool) -> Result<serde_json::Value> {
    let bytes = std::fs::read(path)?;
    let (orientation, error) = match exif::detect_orientation(&bytes) {
        Ok(Detection::Detected(o)) => (Some(o), None),
        Ok(Detection::Absent) => (None, None),
        Err(e) => (None, Some(e.to_string())),
    };
    let summary = exif::read_summary(path).unwrap_or_else(|e| {
        log::debug!("EXIF summary unavailable for {}: {e}", path.display());
        exif::ExifSummary::default()
    });

    if !json {
        println!("{}", path.display());
        match (&orientation, &error) {
            (_, Some(err)) => println!("  Orientation: error: {err}"),
            (Some(o), None) => println!("  Orientation: {o}"),
            (None, None) => println!("  Orientation: absent"),
        }
        if let Some(ref make) = summary.make {
            println!("  Make:        {make}");
        }
        if let Some(ref model) = summary.model {
            println!("  Model:       {model}");
        }
        if let Some(ref taken) = summary.taken_at {
            println!("  Taken:       {taken}");
        }
    }

    Ok(serde_json::json!({
        "path": path.display().to_string(),
        "orientation": orientation.map(|o| o.to_exif()),
        "error": error,
        "exif": summary,
    }))
}
