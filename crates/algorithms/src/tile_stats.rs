//! Tiled statistics engine
//!
//! For each grid tile, splits the tile into four quadrants of integer half
//! dimensions, keeps quadrants with enough valid pixels, and records the
//! mean and population stddev of the kept quadrant means. High stddev
//! flags tiles whose quadrants disagree, i.e. tiles likely to straddle a
//! land/water boundary.

use crate::stats;
use sarflood_core::{Raster, Window};
use sarflood_parallel::{process_tiles, TileGrid};

/// Per-tile statistics tables, indexed `(tile_row, tile_col)` and sized
/// `(grid.rows(), grid.cols())`. Rejected tiles are NaN in both tables.
#[derive(Debug, Clone)]
pub struct TileStats {
    pub means: Raster<f32>,
    pub stddevs: Raster<f32>,
}

impl TileStats {
    /// Whether tile `(r, c)` produced valid statistics
    pub fn is_valid(&self, r: usize, c: usize) -> bool {
        self.means
            .get(r, c)
            .map(|v| !self.means.is_nodata(v))
            .unwrap_or(false)
    }
}

/// Mean of the valid pixels in `window` and the fraction of pixels that
/// were valid. An empty window reports no mean and zero validity.
fn mean_and_validity(image: &Raster<f32>, window: &Window) -> (Option<f64>, f64) {
    if window.is_empty() {
        return (None, 0.0);
    }
    let mut sum = 0.0;
    let mut count = 0usize;
    for row in window.y..window.y_end() {
        for col in window.x..window.x_end() {
            let v = unsafe { image.get_unchecked(row, col) };
            if !image.is_nodata(v) {
                sum += v as f64;
                count += 1;
            }
        }
    }
    let fraction = count as f64 / window.area() as f64;
    ((count > 0).then(|| sum / count as f64), fraction)
}

/// Statistics for one tile: mean of kept-quadrant means and their
/// population stddev, or `None` when the tile is rejected.
fn tile_statistics(image: &Raster<f32>, tile: Window, min_percent_valid: f64) -> Option<(f32, f32)> {
    let hw = tile.width / 2;
    let hh = tile.height / 2;
    let quadrants = [
        Window::new(tile.x, tile.y, hw, hh),
        Window::new(tile.x + hw, tile.y, hw, hh),
        Window::new(tile.x + hw, tile.y + hh, hw, hh),
        Window::new(tile.x, tile.y + hh, hw, hh),
    ];

    let mut means = Vec::with_capacity(4);
    for quadrant in &quadrants {
        let (mean, fraction) = mean_and_validity(image, quadrant);
        if fraction >= min_percent_valid {
            if let Some(m) = mean {
                means.push(m);
            }
        }
    }

    let mean_of_means = stats::mean(&means)?;
    if mean_of_means <= 0.0 {
        return None;
    }
    let stddev = stats::population_stddev(&means, mean_of_means)?;
    Some((mean_of_means as f32, stddev as f32))
}

/// Compute the per-tile statistics tables for every tile of `grid`.
///
/// Tiles run on the rayon pool; each result is written into its own
/// `(tile_row, tile_col)` cell once all tiles have finished, so the tables
/// are complete when this returns.
pub fn compute_tile_stats(
    image: &Raster<f32>,
    grid: &TileGrid,
    min_percent_valid: f64,
) -> TileStats {
    let results = process_tiles(grid, |_, _, tile| {
        tile_statistics(image, tile, min_percent_valid)
    });

    let mut means: Raster<f32> = Raster::filled(grid.rows(), grid.cols(), f32::NAN);
    let mut stddevs: Raster<f32> = Raster::filled(grid.rows(), grid.cols(), f32::NAN);
    means.set_nodata(Some(f32::NAN));
    stddevs.set_nodata(Some(f32::NAN));

    for (r, c, stats) in results {
        if let Some((mean, stddev)) = stats {
            unsafe {
                means.set_unchecked(r, c, mean);
                stddevs.set_unchecked(r, c, stddev);
            }
        }
    }

    TileStats { means, stddevs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid_for(image: &Raster<f32>, size: usize) -> TileGrid {
        TileGrid::divide(image.extent(), size, false)
    }

    #[test]
    fn test_uniform_tile_has_zero_stddev() {
        let image: Raster<f32> = Raster::filled(64, 64, 25.0);
        let stats = compute_tile_stats(&image, &grid_for(&image, 32), 0.9);

        assert_eq!(stats.means.shape(), (2, 2));
        assert_relative_eq!(stats.means.get(0, 0).unwrap(), 25.0);
        assert_relative_eq!(stats.stddevs.get(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_quadrant_disagreement_raises_stddev() {
        // Left half dark, right half bright inside a single 32x32 tile
        let mut image: Raster<f32> = Raster::filled(32, 32, 10.0);
        for row in 0..32 {
            for col in 16..32 {
                image.set(row, col, 200.0).unwrap();
            }
        }
        let stats = compute_tile_stats(&image, &grid_for(&image, 32), 0.9);
        assert_relative_eq!(stats.means.get(0, 0).unwrap(), 105.0);
        assert_relative_eq!(stats.stddevs.get(0, 0).unwrap(), 95.0);
    }

    #[test]
    fn test_sparse_tile_rejected() {
        // More than 10% invalid in every quadrant
        let mut image: Raster<f32> = Raster::filled(16, 16, 50.0);
        for row in 0..16 {
            for col in 0..16 {
                if (row + col) % 4 == 0 {
                    image.set(row, col, f32::NAN).unwrap();
                }
            }
        }
        let stats = compute_tile_stats(&image, &grid_for(&image, 16), 0.9);
        assert!(!stats.is_valid(0, 0));
    }

    #[test]
    fn test_partial_invalidity_keeps_good_quadrants() {
        // One all-invalid quadrant; the other three agree
        let mut image: Raster<f32> = Raster::filled(32, 32, 40.0);
        for row in 0..16 {
            for col in 0..16 {
                image.set(row, col, f32::NAN).unwrap();
            }
        }
        let stats = compute_tile_stats(&image, &grid_for(&image, 32), 0.9);
        assert!(stats.is_valid(0, 0));
        assert_relative_eq!(stats.means.get(0, 0).unwrap(), 40.0);
        assert_relative_eq!(stats.stddevs.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_nonpositive_mean_rejected() {
        let image: Raster<f32> = Raster::filled(16, 16, 0.0);
        let stats = compute_tile_stats(&image, &grid_for(&image, 16), 0.9);
        assert!(!stats.is_valid(0, 0));
    }
}
