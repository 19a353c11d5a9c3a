//! Batch compression of independent images

use crate::{compressor, BatchConfig, Error, ProgressTracker, Result};
use imgpress_core::{CompressionResult, ImageAsset};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Log progress every this many finished images
pub const PROGRESS_REPORT_INTERVAL: u64 = 10;

/// Outcome of compressing one batch item
#[derive(Debug)]
pub struct BatchOutcome {
    /// Position of the item in the input
    pub index: usize,
    /// Display name of the item (file name or path)
    pub name: String,
    pub result: Result<CompressionResult>,
}

/// Outcomes of a batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&BatchOutcome, &CompressionResult)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().map(|r| (outcome, r)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&BatchOutcome, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|e| (outcome, e)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Total input and output bytes over successful items
    pub fn total_sizes(&self) -> (usize, usize) {
        self.succeeded()
            .fold((0, 0), |(input, output), (_, r)| (input + r.original_size, output + r.size()))
    }
}

/// Compresses many images with shared configuration.
///
/// Items run on a dedicated rayon pool sized from the configuration. A
/// failing item is logged and recorded; the rest of the batch carries on.
pub struct BatchCompressor {
    config: BatchConfig,
}

impl BatchCompressor {
    /// Creates a new batch compressor with the given configuration
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Compresses already loaded assets
    pub fn run(&self, assets: &[ImageAsset]) -> Result<BatchReport> {
        self.run_with(
            assets,
            |index, asset| {
                asset
                    .file_name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("image #{}", index + 1))
            },
            |asset| self.compress_one(asset),
        )
    }

    /// Loads and compresses files; a file that cannot be loaded fails only
    /// its own item
    pub fn run_paths<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Result<BatchReport> {
        self.run_with(
            paths,
            |_, path| path.as_ref().display().to_string(),
            |path| {
                let asset = ImageAsset::open(path)?;
                self.compress_one(&asset)
            },
        )
    }

    fn compress_one(&self, asset: &ImageAsset) -> Result<CompressionResult> {
        let params = self.config.params_for(asset.data_size());
        compressor::compress(asset, &params)
    }

    fn run_with<T, N, F>(&self, items: &[T], name_of: N, work: F) -> Result<BatchReport>
    where
        T: Sync,
        N: Fn(usize, &T) -> String + Sync,
        F: Fn(&T) -> Result<CompressionResult> + Sync,
    {
        if items.is_empty() {
            return Ok(BatchReport::default());
        }

        let workers = self.config.worker_count(items.len());
        let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
        let tracker = ProgressTracker::new(items.len() as u64, "images");
        debug!(items = items.len(), workers, "starting batch");

        let outcomes: Vec<BatchOutcome> = pool.install(|| {
            items
                .par_iter()
                .enumerate()
                .map(|(index, item)| {
                    let name = name_of(index, item);
                    let result = work(item);
                    if let Err(e) = &result {
                        warn!(item = %name, error = %e, "skipping image");
                    }
                    tracker.record(result.is_ok(), PROGRESS_REPORT_INTERVAL);
                    BatchOutcome { index, name, result }
                })
                .collect()
        });

        Ok(BatchReport { outcomes })
    }
}

/// Derives an output path for `input`.
///
/// With an output directory the file name is kept; without one the output
/// sits next to the input with `.min` before the extension.
pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.join(input.file_name().unwrap_or(input.as_os_str())),
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "compressed_image".to_string());
            let file_name = match input.extension() {
                Some(ext) => format!("{}.min.{}", stem, ext.to_string_lossy()),
                None => format!("{}.min", stem),
            };
            input.with_file_name(file_name)
        }
    }
}

/// Output paths for a whole batch, one per input.
///
/// An output that would overwrite one of the inputs, or that more than one
/// input maps to, is an [`Error::OutputConflict`] for every input involved.
pub fn plan_outputs<P: AsRef<Path>>(
    inputs: &[P],
    output_dir: Option<&Path>,
) -> Vec<Result<PathBuf>> {
    let outputs: Vec<PathBuf> = inputs
        .iter()
        .map(|input| output_path(input.as_ref(), output_dir))
        .collect();
    let normalized: Vec<PathBuf> = outputs.iter().map(|path| normalize(path)).collect();
    let sources: Vec<PathBuf> = inputs.iter().map(|input| normalize(input.as_ref())).collect();

    let mut counts: HashMap<&PathBuf, usize> = HashMap::new();
    for path in &normalized {
        *counts.entry(path).or_default() += 1;
    }

    outputs
        .iter()
        .zip(&normalized)
        .map(|(output, key)| {
            if sources.contains(key) {
                Err(Error::OutputConflict(format!(
                    "{} would overwrite an input file",
                    output.display()
                )))
            } else if counts[key] > 1 {
                Err(Error::OutputConflict(format!(
                    "{} is the output of more than one input",
                    output.display()
                )))
            } else {
                Ok(output.clone())
            }
        })
        .collect()
}

/// Canonical form of `path`, resolving the parent when the file itself does
/// not exist yet
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (std::fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}
