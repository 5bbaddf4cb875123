use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image::ImageReader;
use siftmatch_cli::{render_matches, Config, FeatureMatcher};
use siftmatch_core::FeatureKind;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Guess from the file header
    Auto,
    Lowe,
    Oxford,
}

impl Format {
    fn kind(self) -> Option<FeatureKind> {
        match self {
            Format::Auto => None,
            Format::Lowe => Some(FeatureKind::Lowe),
            Format::Oxford => Some(FeatureKind::Oxford),
        }
    }
}

/// Match SIFT keypoints between two feature files
#[derive(Debug, Parser)]
#[command(name = "siftmatch", version)]
struct Args {
    /// Features of the first image (queries)
    features1: PathBuf,
    /// Features of the second image (indexed)
    features2: PathBuf,
    /// Feature file format
    #[arg(long, value_enum, default_value_t = Format::Auto)]
    format: Format,
    /// Matcher configuration file (.json or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Maximum leaf visits per search
    #[arg(long)]
    max_visits: Option<usize>,
    /// Threshold on the squared nearest / second-nearest distance ratio
    #[arg(long)]
    ratio: Option<f64>,
    /// Worker threads for matching
    #[arg(long)]
    threads: Option<usize>,
    /// Write accepted matches to this text file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// First image, for drawing matches
    #[arg(long, requires_all = ["image2", "output_image"])]
    image1: Option<PathBuf>,
    /// Second image, for drawing matches
    #[arg(long, requires = "image1")]
    image2: Option<PathBuf>,
    /// Write the stacked match image here (format from extension)
    #[arg(short = 'm', long, requires = "image1")]
    output_image: Option<PathBuf>,
    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let base = match &args.config {
        Some(path) => Config::load(path).map_err(|e| anyhow::anyhow!("loading {}: {}", path.display(), e))?,
        None => Config::default(),
    };
    let mut builder = base.to_builder();
    if let Some(max_visits) = args.max_visits {
        builder = builder.max_visits(max_visits);
    }
    if let Some(ratio) = args.ratio {
        builder = builder.ratio_threshold(ratio);
    }
    if let Some(threads) = args.threads {
        builder = builder.threads(threads);
    }
    let config = builder.to_config();
    info!("{}", config.summary());

    let matcher = FeatureMatcher::new(config)?;

    info!(path = %args.features1.display(), "Finding features");
    let features1 = FeatureMatcher::load_features(&args.features1, args.format.kind())?;
    info!(path = %args.features2.display(), "Finding features");
    let features2 = FeatureMatcher::load_features(&args.features2, args.format.kind())?;

    let t0 = Instant::now();
    let (matches, _stats) = matcher.match_features(&features1, &features2)?;
    info!(elapsed = ?t0.elapsed(), "matching done");

    if let Some(out) = &args.output {
        siftmatch_io::export_matches(out, &matches).with_context(|| format!("writing {}", out.display()))?;
        info!(path = %out.display(), "saved matches");
    }

    if let (Some(path1), Some(path2), Some(out)) = (&args.image1, &args.image2, &args.output_image) {
        let img1 = ImageReader::open(path1)?.decode()?.to_rgb8();
        let img2 = ImageReader::open(path2)?.decode()?.to_rgb8();
        let stacked = render_matches(&img1, &img2, &matches);
        stacked.save(out).with_context(|| format!("writing {}", out.display()))?;
        info!(path = %out.display(), "saved match image");
    }

    Ok(())
}
