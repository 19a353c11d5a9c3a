//! imgpress CLI Tool
//!
//! Command-line interface for compressing images and resolving Dify image
//! references.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use imgpress_core::params::megabytes_to_bytes;
use imgpress_core::{CompressionParams, CompressionResult};
use imgpress_encoder::{plan_outputs, BatchCompressor, BatchConfig, Compressor};
use imgpress_resolver::{FetchConfig, Fetcher, FileReference, UrlResolver};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "imgpress")]
#[command(about = "imgpress - batch image compression with Dify URL repair")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress one or more image files
    Compress(CompressArgs),

    /// Repair a Dify image reference into a fetchable URL
    Resolve {
        /// Raw reference, e.g. /files/tools/abc.png?sign=...
        reference: String,

        /// Public base URL of the Dify deployment
        #[arg(long, env = "IMGPRESS_HOST_URL")]
        host_url: Option<String>,
    },

    /// Download a Dify image reference, compress it and save it
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Input image files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (default: next to each input, as NAME.min.EXT)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    compression: CompressionArgs,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long, default_value = "0")]
    jobs: usize,

    /// Print one JSON object per image
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Raw reference, e.g. /files/tools/abc.png?sign=...
    reference: String,

    /// Public base URL of the Dify deployment
    #[arg(long, env = "IMGPRESS_HOST_URL")]
    host_url: Option<String>,

    /// Declared MIME type of the file (checked before downloading)
    #[arg(long)]
    mime: Option<String>,

    /// Output file (default: the file name from the resolved URL, in the
    /// current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    compression: CompressionArgs,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct CompressionArgs {
    /// Encoding quality (1-100)
    #[arg(short, long, default_value = "85", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Target output size in MB; derives the quality per image
    #[arg(long, conflicts_with = "quality")]
    target_size: Option<f64>,

    /// Maximum output width in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_width: Option<u32>,

    /// Maximum output height in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_height: Option<u32>,
}

impl CompressionArgs {
    fn params(&self) -> CompressionParams {
        CompressionParams::new(self.quality).with_max_size(self.max_width, self.max_height)
    }

    /// Target size in bytes; zero or negative sizes mean "no target"
    fn target_bytes(&self) -> Option<u64> {
        self.target_size
            .map(megabytes_to_bytes)
            .filter(|&bytes| bytes > 0)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Compress(args) => compress_files(&args, &mut out)?,

        Commands::Resolve {
            reference,
            host_url,
        } => resolve(&reference, host_url, &mut out)?,

        Commands::Fetch(args) => {
            fetch(&args, &mut out)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Compresses every input, skipping those that fail.
///
/// Fails only when no image at all could be compressed and written.
fn compress_files(args: &CompressArgs, out: &mut impl Write) -> Result<()> {
    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir).context("Failed to create output directory")?;
    }

    let config = BatchConfig {
        params: args.compression.params(),
        target_size: args.compression.target_bytes(),
        jobs: args.jobs,
    };
    debug!(?config, "batch configuration");

    if !args.json {
        writeln!(out, "Compressing {} image(s)...", args.inputs.len())?;
    }

    // Inputs whose output would clobber something are never compressed
    let plans = plan_outputs(&args.inputs, args.output.as_deref());
    let runnable: Vec<&PathBuf> = args
        .inputs
        .iter()
        .zip(&plans)
        .filter(|(_, plan)| plan.is_ok())
        .map(|(input, _)| input)
        .collect();

    let report = BatchCompressor::new(config)
        .run_paths(&runnable)
        .context("Failed to start batch")?;
    let mut outcomes = report.outcomes.iter();
    let mut failures = 0;

    for (input, plan) in args.inputs.iter().zip(&plans) {
        let written = match plan {
            Err(e) => Err(anyhow!("{}", e)),
            Ok(path) => {
                let outcome = outcomes.next().context("Batch returned too few results")?;
                match &outcome.result {
                    Ok(result) => save(result, path).map(|()| (result, path)),
                    Err(e) => Err(anyhow!("{}", e)),
                }
            }
        };

        match written {
            Ok((result, path)) => print_result(out, result, path, args.json)?,
            Err(e) => {
                failures += 1;
                print_failure(out, &input.display().to_string(), &e, args.json)?;
            }
        }
    }

    let succeeded = args.inputs.len() - failures;
    if !args.json {
        let (input_bytes, output_bytes) = report.total_sizes();
        writeln!(
            out,
            "\nCompressed {} / {} image(s): {} -> {}",
            succeeded,
            args.inputs.len(),
            format_size(input_bytes),
            format_size(output_bytes)
        )?;
    }

    if succeeded == 0 {
        bail!("No image could be compressed");
    }
    Ok(())
}

fn resolve(reference: &str, host_url: Option<String>, out: &mut impl Write) -> Result<()> {
    let url = UrlResolver::new(host_url)
        .resolve(reference)
        .context("Failed to resolve reference")?;
    writeln!(out, "{}", url)?;
    Ok(())
}

/// Downloads, compresses and saves one referenced image.
///
/// With a target size the quality is derived from the downloaded size.
fn fetch(args: &FetchArgs, out: &mut impl Write) -> Result<CompressionResult> {
    let config = FetchConfig {
        timeout: Duration::from_secs(args.timeout),
        ..FetchConfig::default()
    };
    let fetcher = Fetcher::new(config, UrlResolver::new(args.host_url.clone()))
        .context("Failed to create HTTP client")?;

    let mut file = FileReference::new(args.reference.as_str());
    file.mime_type = args.mime.clone();

    let asset = fetcher.fetch(&file).context("Failed to download image")?;

    let mut params = args.compression.params();
    if let Some(target) = args.compression.target_bytes() {
        params.quality = CompressionParams::for_target_size(target, asset.data_size()).quality;
    }

    let result = Compressor::new(params)
        .compress(&asset)
        .context("Failed to compress image")?;

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(result.output_file_name()));
    save(&result, &path)?;
    print_result(out, &result, &path, args.json)?;
    Ok(result)
}

fn save(result: &CompressionResult, path: &Path) -> Result<()> {
    std::fs::write(path, &result.data)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn print_result(
    out: &mut impl Write,
    result: &CompressionResult,
    path: &Path,
    json: bool,
) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(&result.meta())?)?;
    } else {
        writeln!(
            out,
            "  {} -> {} ({}x{}, q={}, {} -> {}, {:.1}%)",
            result.file_name.as_deref().unwrap_or("image"),
            path.display(),
            result.width,
            result.height,
            result.quality,
            format_size(result.original_size),
            format_size(result.size()),
            result.ratio() * 100.0
        )?;
    }
    Ok(())
}

fn print_failure(
    out: &mut impl Write,
    name: &str,
    error: &anyhow::Error,
    json: bool,
) -> Result<()> {
    if json {
        let message = serde_json::json!({ "result": format!("{}: {:#}", name, error) });
        writeln!(out, "{}", message)?;
    } else {
        writeln!(out, "  {} skipped: {:#}", name, error)?;
    }
    Ok(())
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
