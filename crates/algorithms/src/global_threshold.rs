//! Global threshold aggregation
//!
//! Each selected tile yields an optimal local threshold via
//! Kittler–Illingworth on its own histogram; the scene-wide threshold is
//! their arithmetic mean. The spread of the local thresholds is kept as a
//! quality diagnostic (the Martinis paper gates on it; this implementation
//! surfaces it and leaves the decision to the caller).

use crate::stats::{self, Histogram};
use crate::threshold::kittler_illingworth;
use sarflood_core::{Error, Raster, Result};
use sarflood_parallel::TileGrid;

const STAGE: &str = "global threshold";
const TILE_HISTOGRAM_BINS: usize = 255;

/// Aggregated threshold with its per-tile inputs and spread.
#[derive(Debug, Clone)]
pub struct GlobalThreshold {
    /// Mean of the per-tile thresholds, in the processing domain
    pub threshold: f64,
    /// Population stddev of the per-tile thresholds (diagnostic)
    pub stddev: f64,
    /// The individual tile thresholds that entered the mean
    pub per_tile: Vec<f64>,
    /// Tiles whose histogram the optimizer could not split
    pub failed_tiles: Vec<(usize, usize)>,
}

/// Estimate the scene threshold from the selected tiles.
///
/// Histograms span `[min_val, max_val]` (the processing domain). Tiles on
/// which the optimizer fails are skipped and reported; the stage only
/// fails when every selected tile fails.
pub fn compute_global_threshold(
    image: &Raster<f32>,
    grid: &TileGrid,
    kept_tiles: &[(usize, usize)],
    min_val: f64,
    max_val: f64,
) -> Result<GlobalThreshold> {
    if kept_tiles.is_empty() {
        return Err(Error::algorithm(STAGE, "no tiles selected"));
    }

    let mut per_tile = Vec::with_capacity(kept_tiles.len());
    let mut failed_tiles = Vec::new();

    for &(r, c) in kept_tiles {
        let tile = grid.get(r, c).ok_or_else(|| {
            Error::algorithm(STAGE, format!("tile ({}, {}) outside the grid", r, c))
        })?;

        let samples = (tile.y..tile.y_end()).flat_map(|row| {
            (tile.x..tile.x_end()).filter_map(move |col| {
                let v = unsafe { image.get_unchecked(row, col) };
                (!image.is_nodata(v)).then_some(v as f64)
            })
        });
        let hist = Histogram::from_values(samples, TILE_HISTOGRAM_BINS, min_val, max_val)?;

        match kittler_illingworth(&hist) {
            Ok(threshold) => per_tile.push(threshold),
            Err(_) => failed_tiles.push((r, c)),
        }
    }

    let threshold = stats::mean(&per_tile).ok_or_else(|| {
        Error::algorithm(
            STAGE,
            format!(
                "optimizer failed on all {} selected tiles",
                kept_tiles.len()
            ),
        )
    })?;
    let stddev = stats::population_stddev(&per_tile, threshold).expect("non-empty thresholds");

    Ok(GlobalThreshold {
        threshold,
        stddev,
        per_tile,
        failed_tiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sarflood_core::Window;

    /// 64x64 image, each 32x32 tile split into dark and bright halves
    fn boundary_image() -> (Raster<f32>, TileGrid) {
        let mut image: Raster<f32> = Raster::new(64, 64);
        for row in 0..64 {
            for col in 0..64 {
                let v = if col % 32 < 16 { 80.0 } else { 320.0 };
                // A little per-pixel spread keeps class variances positive
                let jitter = ((row * 31 + col * 17) % 8) as f32;
                image.set(row, col, v + jitter).unwrap();
            }
        }
        let grid = TileGrid::divide(Window::of_extent(64, 64), 32, false);
        (image, grid)
    }

    #[test]
    fn test_threshold_between_classes() {
        let (image, grid) = boundary_image();
        let kept = vec![(0, 0), (0, 1), (1, 0)];
        let result = compute_global_threshold(&image, &grid, &kept, 0.0, 400.0).unwrap();

        assert!(
            result.threshold > 60.0 && result.threshold < 320.0,
            "threshold {} does not separate the classes",
            result.threshold
        );
        assert_eq!(result.per_tile.len(), 3);
        assert!(result.failed_tiles.is_empty());
        // Statistically identical tiles agree, so the diagnostic spread is tiny
        assert!(result.stddev < 5.0);
    }

    #[test]
    fn test_uniform_tiles_all_fail() {
        let image: Raster<f32> = Raster::filled(64, 64, 200.0);
        let grid = TileGrid::divide(Window::of_extent(64, 64), 32, false);
        let err = compute_global_threshold(&image, &grid, &[(0, 0), (1, 1)], 0.0, 400.0)
            .unwrap_err();
        assert!(matches!(err, Error::Algorithm { stage, .. } if stage == STAGE));
    }

    #[test]
    fn test_no_tiles_is_error() {
        let image: Raster<f32> = Raster::filled(32, 32, 100.0);
        let grid = TileGrid::divide(Window::of_extent(32, 32), 32, false);
        assert!(compute_global_threshold(&image, &grid, &[], 0.0, 400.0).is_err());
    }
}
