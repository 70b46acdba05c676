//! # sarflood-pipeline
//!
//! End-to-end orchestration of the split-based water detection pipeline
//! (Martinis, Kersten & Twele 2015): preprocessing, tiled statistics, tile
//! selection, Kittler–Illingworth thresholding, fuzzy refinement against a
//! DEM and water-body sizes, and the final two-level flood fill.
//!
//! [`detect_water`] is the in-memory core; [`run`] wraps it with file I/O
//! and scratch-artifact ownership.

pub mod config;
pub mod scratch;

pub use config::FloodConfig;
pub use scratch::ScratchDir;

use sarflood_algorithms::blobs::blob_sizes;
use sarflood_algorithms::floodfill::two_level_flood_fill;
use sarflood_algorithms::fuzzy::{defuzz, fuzzify, SMembership, ZMembership};
use sarflood_algorithms::global_threshold::compute_global_threshold;
use sarflood_algorithms::preprocess::{preprocess, proc_to_db, DB_MAX, DB_MIN, PROC_MAX, PROC_MIN};
use sarflood_algorithms::resample::{project_to_frame, subsample};
use sarflood_algorithms::stats::masked_mean_stddev;
use sarflood_algorithms::terrain::slope_degrees;
use sarflood_algorithms::threshold::classify;
use sarflood_algorithms::tile_select::select_tiles;
use sarflood_algorithms::tile_stats::compute_tile_stats;
use sarflood_core::io::{read_geotiff, write_geotiff};
use sarflood_core::{Error, Raster, Result};
use sarflood_parallel::TileGrid;
use std::path::Path;
use tracing::{info, warn};

/// Output class for water pixels
pub const WATER_CLASS: u8 = 255;
/// Output class for land pixels
pub const LAND_CLASS: u8 = 1;
/// Output class (and nodata) for invalid pixels
pub const NODATA_CLASS: u8 = 0;

/// Default nodata for DEMs that do not declare one
const DEM_DEFAULT_NODATA: f32 = -3.402_823_466_385_288_6e38;

/// Slope membership bounds, in degrees
const SLOPE_DEGREES_LOW: f64 = 0.0;
const SLOPE_DEGREES_HIGH: f64 = 15.0;

/// Quality gates from the paper, in dB (diagnostic only)
const MAX_THRESHOLD_STDDEV_DB: f64 = 5.0;
const MAX_THRESHOLD_DB: f64 = 10.0;

/// Diagnostics of a completed detection run.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// Scene threshold in the processing domain
    pub threshold: f64,
    /// Scene threshold mapped back to dB
    pub threshold_db: f64,
    /// Population stddev of the per-tile thresholds, processing domain
    pub threshold_stddev: f64,
    /// The same spread in dB
    pub threshold_stddev_db: f64,
    /// Per-tile thresholds in dB
    pub per_tile_thresholds_db: Vec<f64>,
    /// Selected tiles as `(tile_row, tile_col)`
    pub kept_tiles: Vec<(usize, usize)>,
    /// Whether the threshold spread passes the paper's 5 dB gate
    pub threshold_stddev_ok: bool,
    /// Whether the threshold passes the paper's 10 dB gate
    pub threshold_db_ok: bool,
    /// Mean backscatter of initial water pixels, processing domain
    pub mean_water_backscatter: f64,
    /// Mean DEM height under the initial water mask, meters
    pub mean_water_height: f64,
    /// Stddev of DEM height under the initial water mask, meters
    pub stddev_water_height: f64,
    /// Blob membership bounds, pixels
    pub min_blob_size: u32,
    pub max_blob_size: u32,
    /// Water pixels in the final classification
    pub water_pixels: usize,
}

/// Convert the blob-size raster into an all-valid float channel.
///
/// Land pixels keep their size of 0, which the S-membership maps to 0 so
/// the veto mean keeps them out of the water class; masking them instead
/// would wrongly turn them into nodata.
fn blob_channel(sizes: &Raster<u32>) -> Raster<f32> {
    let (rows, cols) = sizes.shape();
    let mut out: Raster<f32> = sizes.with_same_georef(rows, cols);
    for row in 0..rows {
        for col in 0..cols {
            let v = unsafe { sizes.get_unchecked(row, col) };
            unsafe { out.set_unchecked(row, col, v as f32) };
        }
    }
    out
}

/// Detect surface water in a Sentinel-1 amplitude scene.
///
/// `sar` must carry a georeference; `dem` must overlap it in an equivalent
/// CRS. Returns the classified raster ({0 = nodata, 1 = land, 255 = water},
/// georeferenced to the input) and the run diagnostics. When `scratch` is
/// given, the intermediate rasters are persisted as inspection artifacts.
pub fn detect_water(
    sar: &Raster<u16>,
    dem: &Raster<f32>,
    config: &FloodConfig,
    mut scratch: Option<&mut ScratchDir>,
) -> Result<(Raster<u8>, DetectionReport)> {
    config.validate()?;

    let transform = *sar.transform().ok_or(Error::MissingGeoreference)?;
    let (rows, cols) = sar.shape();
    let meters_per_pixel = sar
        .meters_per_pixel()
        .expect("transform present implies resolution");
    info!(rows, cols, meters_per_pixel, "starting detection");

    // Preprocess: DN -> dB, median filter, rescale into [PROC_MIN, PROC_MAX]
    let preprocessed = preprocess(sar);
    if let Some(scratch) = scratch.as_deref_mut() {
        scratch.write(scratch::PREPROCESSED_IMAGE, &preprocessed)?;
    }

    // Per-tile statistics over full tiles only
    let grid = TileGrid::divide(preprocessed.extent(), config.tile_size, false);
    if grid.is_empty() {
        return Err(Error::algorithm(
            "tile statistics",
            format!(
                "image {}x{} is smaller than one {}-pixel tile",
                cols, rows, config.tile_size
            ),
        ));
    }
    let tile_stats = compute_tile_stats(&preprocessed, &grid, config.min_percent_valid);
    if let Some(scratch) = scratch.as_deref_mut() {
        scratch.write(scratch::TILE_MEANS, &tile_stats.means)?;
        scratch.write(scratch::TILE_STDDEVS, &tile_stats.stddevs)?;
    }

    // Tiles likely to straddle a land/water boundary
    let selection = select_tiles(&tile_stats, config.max_tiles, config.stddev_percentile_cutoff)?;
    info!(kept = selection.kept.len(), "selected threshold tiles");
    if let Some(scratch) = scratch.as_deref_mut() {
        scratch.write(scratch::INITIAL_KEPT_TILES, &selection.initial_candidates)?;
        scratch.write(scratch::FINAL_KEPT_TILES, &selection.final_kept)?;
    }

    // Scene threshold from the selected tiles
    let global = compute_global_threshold(
        &preprocessed,
        &grid,
        &selection.kept,
        PROC_MIN,
        PROC_MAX,
    )?;
    let threshold_db = proc_to_db(global.threshold);
    let threshold_stddev_db = global.stddev * (DB_MAX - DB_MIN) / (PROC_MAX - PROC_MIN);
    info!(
        threshold = global.threshold,
        threshold_db, threshold_stddev_db, "aggregated global threshold"
    );

    let threshold_stddev_ok = threshold_stddev_db <= MAX_THRESHOLD_STDDEV_DB;
    let threshold_db_ok = threshold_db <= MAX_THRESHOLD_DB;
    if !threshold_stddev_ok {
        warn!(
            threshold_stddev_db,
            "per-tile thresholds disagree beyond the {} dB gate", MAX_THRESHOLD_STDDEV_DB
        );
    }
    if !threshold_db_ok {
        warn!(
            threshold_db,
            "threshold exceeds the {} dB gate", MAX_THRESHOLD_DB
        );
    }

    // Initial hard classification
    let initial = classify(&preprocessed, global.threshold, WATER_CLASS, LAND_CLASS);
    if let Some(scratch) = scratch.as_deref_mut() {
        scratch.write(scratch::INITIAL_WATER_DETECT, &initial)?;
    }

    // Water-body sizes on the initial mask
    let min_blob_size = (config.min_blob_size_meters / meters_per_pixel).max(1.0) as u32;
    let max_blob_size = (config.max_blob_size_meters / meters_per_pixel).max(2.0) as u32;
    let sizes = blob_sizes(
        &initial,
        WATER_CLASS,
        config.tile_size,
        config.tile_expand,
        max_blob_size,
    );
    if let Some(scratch) = scratch.as_deref_mut() {
        scratch.write(scratch::BLOB_SIZES, &sizes)?;
    }

    // Backscatter and DEM statistics under the initial mask, decimated
    let factor = config.dem_stats_subsample;
    let low_res_mask = subsample(&initial, factor);
    let low_res_proc = subsample(&preprocessed, factor);

    let mean_water_backscatter = masked_mean_stddev(&low_res_proc, &low_res_mask, WATER_CLASS)?
        .map(|(mean, _)| mean)
        .ok_or_else(|| {
            Error::algorithm(
                "water statistics",
                format!(
                    "initial threshold {:.2} produced no water pixels",
                    global.threshold
                ),
            )
        })?;

    let mut dem = dem.clone();
    if dem.nodata().is_none() {
        dem.set_nodata(Some(DEM_DEFAULT_NODATA));
    }
    let dem_in_frame = project_to_frame(&dem, &transform, sar.crs(), rows, cols)?;
    let low_res_dem = subsample(&dem_in_frame, factor);

    let (mean_water_height, stddev_water_height) =
        masked_mean_stddev(&low_res_dem, &low_res_mask, WATER_CLASS)?.ok_or_else(|| {
            Error::algorithm(
                "water statistics",
                "DEM has no valid samples under the initial water mask".to_string(),
            )
        })?;
    info!(
        mean_water_backscatter,
        mean_water_height, stddev_water_height, "computed water statistics"
    );

    // Four fuzzy channels
    let backscatter_fuzz = fuzzify(
        &preprocessed,
        &ZMembership::new(mean_water_backscatter, global.threshold)?,
    );

    // The paper's upper height bound; a flat water surface would collapse
    // the interval, so hold it open by a meter.
    let height_spread = (stddev_water_height * (stddev_water_height + 3.5)).max(1.0);
    let height_fuzz = fuzzify(
        &dem_in_frame,
        &ZMembership::new(mean_water_height, mean_water_height + height_spread)?,
    );

    let slope_fuzz = fuzzify(
        &slope_degrees(&dem_in_frame),
        &ZMembership::new(SLOPE_DEGREES_LOW, SLOPE_DEGREES_HIGH)?,
    );

    let blob_fuzz = fuzzify(
        &blob_channel(&sizes),
        &SMembership::new(min_blob_size as f64, max_blob_size as f64)?,
    );

    let defuzzed = defuzz([&backscatter_fuzz, &height_fuzz, &slope_fuzz, &blob_fuzz])?;

    // Seed-and-grow segmentation of the fused score
    let mut classes = two_level_flood_fill(
        &defuzzed,
        config.tile_size,
        config.tile_expand,
        config.seed_threshold,
        config.grow_threshold,
        LAND_CLASS,
        WATER_CLASS,
    );

    // Pixels outside the valid input footprint stay nodata no matter what
    // grew over them
    let mut water_pixels = 0usize;
    for row in 0..rows {
        for col in 0..cols {
            if unsafe { initial.get_unchecked(row, col) } == NODATA_CLASS {
                unsafe { classes.set_unchecked(row, col, NODATA_CLASS) };
            } else if unsafe { classes.get_unchecked(row, col) } == WATER_CLASS {
                water_pixels += 1;
            }
        }
    }
    classes.set_crs(sar.crs().cloned());
    info!(water_pixels, "classification complete");

    let report = DetectionReport {
        threshold: global.threshold,
        threshold_db,
        threshold_stddev: global.stddev,
        threshold_stddev_db,
        per_tile_thresholds_db: global.per_tile.iter().map(|&t| proc_to_db(t)).collect(),
        kept_tiles: selection.kept,
        threshold_stddev_ok,
        threshold_db_ok,
        mean_water_backscatter,
        mean_water_height,
        stddev_water_height,
        min_blob_size,
        max_blob_size,
        water_pixels,
    };

    Ok((classes, report))
}

/// File-based entry point: read the scene and DEM, run [`detect_water`]
/// with scratch artifacts under `scratch_root`, write the classified
/// raster to `output_path`.
///
/// Scratch artifacts are removed on success and on clean failure (kept
/// when the configuration says so); a crash leaves them for inspection.
pub fn run(
    input_path: &Path,
    dem_path: &Path,
    output_path: &Path,
    scratch_root: &Path,
    config: &FloodConfig,
) -> Result<DetectionReport> {
    let sar: Raster<u16> = read_geotiff(input_path, None)?;
    let dem: Raster<f32> = read_geotiff(dem_path, None)?;

    let mut scratch = ScratchDir::create(scratch_root)?;
    let result = detect_water(&sar, &dem, config, Some(&mut scratch)).and_then(
        |(classes, report)| {
            write_geotiff(&classes, output_path)?;
            info!(output = %output_path.display(), "wrote classified raster");
            Ok(report)
        },
    );

    if !config.keep_scratch {
        scratch.remove_artifacts();
    }
    result
}
