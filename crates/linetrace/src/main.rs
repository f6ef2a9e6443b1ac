//! linetrace: turn a binary raster mask into cleaned GeoJSON line topology.
//!
//! Decodes the mask, runs the staged pipeline with per-stage diagnostics,
//! writes the lines as a GeoJSON `FeatureCollection`, and prints a
//! diagnostics report. Optional outputs: a stats JSON file and an SVG
//! preview.
//!
//! # Usage
//!
//! ```text
//! linetrace [OPTIONS] --bbox <MIN_X> <MIN_Y> <MAX_X> <MAX_Y> --output <OUTPUT> <MASK>
//! ```
//!
//! Set `RUST_LOG=debug` to see per-stage log lines.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use linetrace_export::SvgMetadata;
use linetrace_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use linetrace_pipeline::{Bounds, GrayImage, KernelShape, PipelineConfig, StructuringElement};

/// Convert a binary raster mask into vector line topology.
///
/// Every non-zero pixel of the mask is foreground. The mask is thinned to
/// a skeleton, traced into paths, bridged, projected into the bounding
/// box, and cleaned.
#[derive(Parser)]
#[command(name = "linetrace", version)]
struct Cli {
    /// Path to the mask image (PNG, JPEG, BMP, TIFF).
    mask_path: PathBuf,

    /// World bounding box the mask covers.
    #[arg(
        long,
        num_args = 4,
        value_names = ["MIN_X", "MIN_Y", "MAX_X", "MAX_Y"],
        allow_negative_numbers = true,
        required = true
    )]
    bbox: Vec<f64>,

    /// Where to write the GeoJSON `FeatureCollection`.
    #[arg(long)]
    output: PathBuf,

    /// Write diagnostics (counts, durations, parameters) as JSON to a file.
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Write an SVG preview of the final lines.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Number of runs for averaging stage timings.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Structuring element shape used by thinning.
    #[arg(long, value_enum, default_value_t = Kernel::Cross)]
    kernel_shape: Kernel,

    /// Structuring element side length (odd, at least 3).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_KERNEL_SIZE)]
    kernel_size: u32,

    /// Longest dead-end branch, in pixels, removed after thinning (0 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SPUR_PRUNE_LENGTH)]
    spur_prune_length: usize,

    /// Minimum traced path length in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MIN_PATH_LENGTH)]
    min_path_length: usize,

    /// Largest gap, in pixels, bridged between path ends (0 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_GAP_BRIDGE_TOLERANCE)]
    gap_bridge_tolerance: f64,

    /// Minimum line length in world units (0 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MIN_LINE_LENGTH)]
    min_line_length: f64,

    /// Endpoint snapping radius in world units (0 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SNAP_TOLERANCE)]
    snap_tolerance: f64,

    /// Simplification tolerance in world units (0 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SIMPLIFY_EPSILON)]
    simplify_epsilon: f64,

    /// Chaikin smoothing iterations (0 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SMOOTH_ITERATIONS)]
    smooth_iterations: u32,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long, conflicts_with = "config")]
    config_json: Option<String>,

    /// Path to a JSON file holding the full pipeline config.
    ///
    /// Same semantics as `--config-json`.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Structuring element shape selection.
#[derive(Clone, Copy, ValueEnum)]
enum Kernel {
    /// Plus-shaped element.
    Cross,
    /// Full square element.
    Square,
}

impl From<Kernel> for KernelShape {
    fn from(kernel: Kernel) -> Self {
        match kernel {
            Kernel::Cross => Self::Cross,
            Kernel::Square => Self::Square,
        }
    }
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` or `--config` is provided, the JSON is parsed
/// directly and all individual parameter flags are ignored. Otherwise, a
/// config is assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }
    if let Some(ref path) = cli.config {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        return serde_json::from_str(&text)
            .map_err(|e| format!("Error parsing {}: {e}", path.display()));
    }

    Ok(PipelineConfig {
        structuring_element: StructuringElement {
            shape: cli.kernel_shape.into(),
            size: cli.kernel_size,
        },
        spur_prune_length: cli.spur_prune_length,
        min_path_length: cli.min_path_length,
        gap_bridge_tolerance: cli.gap_bridge_tolerance,
        min_line_length: cli.min_line_length,
        snap_tolerance: cli.snap_tolerance,
        simplify_epsilon: cli.simplify_epsilon,
        smooth_iterations: cli.smooth_iterations,
    })
}

/// Interpret the four `--bbox` values.
fn bounds_from_cli(cli: &Cli) -> Result<Bounds, String> {
    match cli.bbox.as_slice() {
        &[min_x, min_y, max_x, max_y] => Ok(Bounds::new(min_x, min_y, max_x, max_y)),
        other => Err(format!(
            "--bbox takes exactly 4 values, got {}",
            other.len()
        )),
    }
}

/// Decode any supported image format to an 8-bit grayscale mask.
fn load_mask(path: &Path) -> Result<GrayImage, String> {
    image::open(path)
        .map(|img| img.to_luma8())
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

fn write_file(path: &Path, contents: &str, what: &str) -> Result<(), String> {
    std::fs::write(path, contents)
        .map_err(|e| format!("Error writing {what} to {}: {e}", path.display()))?;
    eprintln!(
        "{what} written to {} ({} bytes)",
        path.display(),
        contents.len()
    );
    Ok(())
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    let bounds = bounds_from_cli(cli)?;
    let mask = load_mask(&cli.mask_path)?;

    log::info!(
        "mask {} ({}x{}), bounds {bounds:?}",
        cli.mask_path.display(),
        mask.width(),
        mask.height(),
    );
    log::debug!("config: {config:?}");

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (staged, diagnostics) = linetrace_pipeline::diagnostics::process_staged_with_diagnostics(
            &mask, bounds, &config, &StdClock,
        )
        .map_err(|e| format!("Pipeline error: {e}"))?;

        if cli.json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }

        // Write outputs on the first run only.
        if run == 0 {
            let geojson = linetrace_export::to_geojson_string(&staged.lines)
                .map_err(|e| format!("Error encoding GeoJSON: {e}"))?;
            write_file(&cli.output, &geojson, "GeoJSON")?;

            if let Some(ref stats_path) = cli.stats {
                let stats = serde_json::to_string_pretty(&diagnostics)
                    .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
                write_file(stats_path, &stats, "Stats")?;
            }

            if let Some(ref svg_path) = cli.svg {
                let title = cli
                    .mask_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("linetrace");
                let config_json = serde_json::to_string(&config)
                    .map_err(|e| format!("Error serializing config: {e}"))?;
                let metadata = SvgMetadata {
                    title: Some(title),
                    description: Some("Exported by linetrace"),
                    config_json: Some(&config_json),
                };
                let svg = linetrace_export::to_svg(&staged.lines, &staged.bounds, &metadata);
                write_file(svg_path, &svg, "SVG")?;
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated timings across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    for (index, (name, _)) in first.stages().iter().enumerate() {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| d.stages()[index].1.duration.as_secs_f64() * 1000.0)
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
