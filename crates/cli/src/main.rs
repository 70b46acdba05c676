//! sarflood CLI - automatic flood water delineation from Sentinel-1 SAR

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sarflood_core::io::read_geotiff;
use sarflood_core::Raster;
use sarflood_pipeline::{run, DetectionReport, FloodConfig};

#[derive(Parser)]
#[command(name = "sarflood")]
#[command(author, version, about = "Automatic flood water delineation from SAR amplitude imagery", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delineate surface water in a SAR amplitude scene
    Detect {
        /// Input SAR amplitude raster (digital numbers)
        input: PathBuf,
        /// Co-registered DEM raster
        #[arg(long)]
        dem: PathBuf,
        /// Output classified raster (0 = nodata, 1 = land, 255 = water)
        output: PathBuf,
        /// Directory for scratch artifacts
        #[arg(long, default_value = "sarflood_scratch")]
        scratch_dir: PathBuf,
        /// Statistics tile size in pixels
        #[arg(long, default_value = "512")]
        tile_size: usize,
        /// Halo width for the tile-independent stages, in pixels
        #[arg(long, default_value = "256")]
        tile_expand: usize,
        /// Seed threshold on the fused score
        #[arg(long, default_value = "0.6")]
        seed_threshold: f64,
        /// Grow threshold on the fused score
        #[arg(long, default_value = "0.45")]
        grow_threshold: f64,
        /// Maximum number of threshold-estimation tiles
        #[arg(long, default_value = "5")]
        max_tiles: usize,
        /// Keep scratch artifacts after a successful run
        #[arg(long)]
        keep_scratch: bool,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn print_report(report: &DetectionReport) {
    println!("Threshold: {:.2} ({:.2} dB)", report.threshold, report.threshold_db);
    println!(
        "  Per-tile spread: {:.2} dB across {} tiles{}",
        report.threshold_stddev_db,
        report.kept_tiles.len(),
        if report.threshold_stddev_ok && report.threshold_db_ok {
            ""
        } else {
            "  [outside quality gates]"
        }
    );
    println!(
        "Water height: {:.1} m (stddev {:.1} m)",
        report.mean_water_height, report.stddev_water_height
    );
    println!(
        "Blob size bounds: {} - {} px",
        report.min_blob_size, report.max_blob_size
    );
    println!("Water pixels: {}", report.water_pixels);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Detect {
            input,
            dem,
            output,
            scratch_dir,
            tile_size,
            tile_expand,
            seed_threshold,
            grow_threshold,
            max_tiles,
            keep_scratch,
        } => {
            let config = FloodConfig {
                tile_size,
                tile_expand,
                seed_threshold,
                grow_threshold,
                max_tiles,
                keep_scratch,
                ..FloodConfig::default()
            };

            let start = Instant::now();
            let pb = spinner("Detecting surface water...");
            let report = run(&input, &dem, &output, &scratch_dir, &config)
                .context("Detection failed")?;
            pb.finish_and_clear();

            print_report(&report);
            println!("Classified raster saved to: {}", output.display());
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster: Raster<f32> =
                read_geotiff(&input, None).context("Failed to read raster")?;
            pb.finish_and_clear();

            let (rows, cols) = raster.shape();
            let stats = raster.statistics();
            info!("Input: {} x {}", cols, rows);

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            if let Some(size) = raster.cell_size() {
                println!("Cell size: {}", size);
            }
            if let Some(mpp) = raster.meters_per_pixel() {
                println!("Resolution: {:.1} m/px", mpp);
            }
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let (Some(min), Some(max)) = (stats.min, stats.max) {
                println!("  Min: {:.4}", min);
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }
    }

    Ok(())
}
