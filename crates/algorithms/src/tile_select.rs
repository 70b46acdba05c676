//! Selection of threshold-estimation tiles
//!
//! Water is darker than land in SAR amplitude, so tiles that straddle a
//! land/water boundary combine a high stddev of quadrant means with a
//! below-average brightness. Up to `max_tiles` such tiles feed the global
//! threshold estimate.

use crate::stats::{self, Histogram};
use crate::tile_stats::TileStats;
use sarflood_core::{Error, Raster, Result};

const STAGE: &str = "tile selection";
const CUTOFF_BINS: usize = 255;

/// Outcome of tile selection.
///
/// `initial_candidates` and `final_kept` mark the respective tile sets with
/// 255 in grid-shaped masks, mirroring the scratch artifacts the pipeline
/// writes for inspection.
#[derive(Debug, Clone)]
pub struct TileSelection {
    /// Kept tiles as `(tile_row, tile_col)`
    pub kept: Vec<(usize, usize)>,
    pub initial_candidates: Raster<u8>,
    pub final_kept: Raster<u8>,
}

/// Pick up to `max_tiles` tiles whose stddev exceeds the
/// `stddev_percentile` cutoff of all valid tile stddevs and whose mean
/// lies below the global mean of valid tile means.
pub fn select_tiles(
    tile_stats: &TileStats,
    max_tiles: usize,
    stddev_percentile: f64,
) -> Result<TileSelection> {
    let (rows, cols) = tile_stats.means.shape();

    let mut valid_means = Vec::new();
    let mut valid_stddevs = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if tile_stats.is_valid(r, c) {
                valid_means.push(unsafe { tile_stats.means.get_unchecked(r, c) } as f64);
                valid_stddevs.push(unsafe { tile_stats.stddevs.get_unchecked(r, c) } as f64);
            }
        }
    }

    let global_mean = stats::mean(&valid_means)
        .ok_or_else(|| Error::algorithm(STAGE, "no valid tiles in the statistics tables"))?;

    let stddev_min = valid_stddevs.iter().copied().fold(f64::INFINITY, f64::min);
    let stddev_max = valid_stddevs
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    // With all stddevs equal no tile stands out; the strict > comparison
    // below then empties the candidate set.
    let stddev_cutoff = if stddev_max - stddev_min <= f64::EPSILON {
        stddev_max
    } else {
        let hist = Histogram::from_values(
            valid_stddevs.iter().copied(),
            CUTOFF_BINS,
            stddev_min,
            stddev_max,
        )?;
        let bin = hist
            .percentile_bin(stddev_percentile)
            .expect("histogram of a non-empty sample");
        hist.bin_value(bin)
    };

    let mut initial_candidates: Raster<u8> = Raster::new(rows, cols);
    initial_candidates.set_nodata(Some(0));
    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if !tile_stats.is_valid(r, c) {
                continue;
            }
            let mean = unsafe { tile_stats.means.get_unchecked(r, c) } as f64;
            let stddev = unsafe { tile_stats.stddevs.get_unchecked(r, c) } as f64;
            if stddev > stddev_cutoff && mean < global_mean {
                candidates.push((r, c, stddev));
                unsafe { initial_candidates.set_unchecked(r, c, 255) };
            }
        }
    }

    if candidates.is_empty() {
        return Err(Error::algorithm(
            STAGE,
            format!(
                "no heterogeneous tiles (stddev cutoff {:.4}, global mean {:.4}, {} valid tiles)",
                stddev_cutoff,
                global_mean,
                valid_means.len()
            ),
        ));
    }

    if candidates.len() > max_tiles {
        // Keep the highest-stddev candidates
        candidates.sort_by(|a, b| a.2.partial_cmp(&b.2).expect("finite stddevs"));
        candidates.drain(..candidates.len() - max_tiles);
    }

    let mut final_kept: Raster<u8> = Raster::new(rows, cols);
    final_kept.set_nodata(Some(0));
    let kept: Vec<(usize, usize)> = candidates
        .iter()
        .map(|&(r, c, _)| {
            unsafe { final_kept.set_unchecked(r, c, 255) };
            (r, c)
        })
        .collect();

    Ok(TileSelection {
        kept,
        initial_candidates,
        final_kept,
    })
}
