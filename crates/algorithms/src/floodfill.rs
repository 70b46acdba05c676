//! Two-level flood fill
//!
//! Hysteresis-style segmentation of the defuzzed score raster: pixels at or
//! above the seed threshold start 4-connected regions, which grow through
//! every pixel at or above the lower grow threshold. Growth happens per
//! tile within a halo-expanded window (the same approximation as the blob
//! sizer): a region can be grown independently by the tiles whose halos see
//! one of its seeds.

use ndarray::Array2;
use sarflood_core::{Raster, Window};
use sarflood_parallel::{process_tiles, TileGrid};
use std::collections::VecDeque;

const NEIGHBORS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Classify a defuzzed score raster by seeded region growth.
///
/// Valid pixels come back as `water` when they are reachable from a pixel
/// `>= seed_threshold` through pixels `>= grow_threshold`, and as `land`
/// otherwise; invalid pixels come back as 0, the output's nodata.
pub fn two_level_flood_fill(
    defuzzed: &Raster<f32>,
    tile_size: usize,
    halo: usize,
    seed_threshold: f64,
    grow_threshold: f64,
    land: u8,
    water: u8,
) -> Raster<u8> {
    let (rows, cols) = defuzzed.shape();
    let grid = TileGrid::divide(defuzzed.extent(), tile_size, true);

    let tile_outputs = process_tiles(&grid, |_, _, tile| {
        fill_tile(
            defuzzed,
            tile,
            halo,
            seed_threshold,
            grow_threshold,
            land,
            water,
        )
    });

    let mut out: Raster<u8> = defuzzed.with_same_georef(rows, cols);
    out.set_nodata(Some(0));
    for (_, _, (tile, classes)) in tile_outputs {
        for (local_row, row) in (tile.y..tile.y_end()).enumerate() {
            for (local_col, col) in (tile.x..tile.x_end()).enumerate() {
                unsafe { out.set_unchecked(row, col, classes[(local_row, local_col)]) };
            }
        }
    }
    out
}

fn fill_tile(
    defuzzed: &Raster<f32>,
    tile: Window,
    halo: usize,
    seed_threshold: f64,
    grow_threshold: f64,
    land: u8,
    water: u8,
) -> (Window, Array2<u8>) {
    let (rows, cols) = defuzzed.shape();
    let expanded = tile.expand(halo, rows, cols);

    let score = |row: usize, col: usize| -> Option<f64> {
        let v = unsafe { defuzzed.get_unchecked(row, col) };
        (!defuzzed.is_nodata(v)).then_some(v as f64)
    };

    let mut reached = Array2::<bool>::from_elem((expanded.height, expanded.width), false);
    let mut queue = VecDeque::new();

    // Seed pass over the expanded window, so that regions seeded in a
    // neighboring tile still grow into this one.
    for row in expanded.y..expanded.y_end() {
        for col in expanded.x..expanded.x_end() {
            if let Some(v) = score(row, col) {
                if v >= seed_threshold {
                    let local = (row - expanded.y, col - expanded.x);
                    if !reached[local] {
                        reached[local] = true;
                        queue.push_back((row, col));
                    }
                }
            }
        }
    }

    // Grow through the relaxed threshold
    while let Some((row, col)) = queue.pop_front() {
        for (dr, dc) in NEIGHBORS_4 {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr < 0 || nc < 0 {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if !expanded.contains(nr, nc) {
                continue;
            }
            let local = (nr - expanded.y, nc - expanded.x);
            if reached[local] {
                continue;
            }
            if let Some(v) = score(nr, nc) {
                if v >= grow_threshold {
                    reached[local] = true;
                    queue.push_back((nr, nc));
                }
            }
        }
    }

    let mut classes = Array2::<u8>::zeros((tile.height, tile.width));
    for row in tile.y..tile.y_end() {
        for col in tile.x..tile.x_end() {
            let class = match score(row, col) {
                None => 0,
                Some(_) if reached[(row - expanded.y, col - expanded.x)] => water,
                Some(_) => land,
            };
            classes[(row - tile.y, col - tile.x)] = class;
        }
    }
    (tile, classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATER: u8 = 255;
    const LAND: u8 = 1;

    fn scores(rows: usize, cols: usize, fill: f32) -> Raster<f32> {
        let mut r: Raster<f32> = Raster::filled(rows, cols, fill);
        r.set_nodata(Some(f32::NAN));
        r
    }

    #[test]
    fn test_seeded_region_grows_fully() {
        // A strip at grow level with one seed pixel becomes water end to end
        let mut defuzzed = scores(8, 8, 0.1);
        for col in 0..8 {
            defuzzed.set(4, col, 0.5).unwrap();
        }
        defuzzed.set(4, 3, 0.9).unwrap();

        let out = two_level_flood_fill(&defuzzed, 8, 4, 0.6, 0.45, LAND, WATER);
        for col in 0..8 {
            assert_eq!(out.get(4, col).unwrap(), WATER);
        }
        assert_eq!(out.get(0, 0).unwrap(), LAND);
    }

    #[test]
    fn test_unseeded_region_stays_land() {
        // Entirely between the thresholds, no seed anywhere
        let mut defuzzed = scores(8, 8, 0.1);
        for col in 2..6 {
            defuzzed.set(2, col, 0.5).unwrap();
        }
        let out = two_level_flood_fill(&defuzzed, 8, 4, 0.6, 0.45, LAND, WATER);
        for col in 2..6 {
            assert_eq!(out.get(2, col).unwrap(), LAND);
        }
    }

    #[test]
    fn test_growth_does_not_cross_gap() {
        // Seeded region separated from a grow-level region by a low pixel
        let mut defuzzed = scores(1, 7, 0.5);
        defuzzed.set(0, 0, 0.9).unwrap();
        defuzzed.set(0, 3, 0.2).unwrap();

        let out = two_level_flood_fill(&defuzzed, 8, 4, 0.6, 0.45, LAND, WATER);
        assert_eq!(out.get(0, 1).unwrap(), WATER);
        assert_eq!(out.get(0, 2).unwrap(), WATER);
        assert_eq!(out.get(0, 3).unwrap(), LAND);
        assert_eq!(out.get(0, 4).unwrap(), LAND);
    }

    #[test]
    fn test_invalid_is_nodata_and_blocks_growth() {
        let mut defuzzed = scores(1, 5, 0.5);
        defuzzed.set(0, 0, 0.9).unwrap();
        defuzzed.set(0, 2, f32::NAN).unwrap();

        let out = two_level_flood_fill(&defuzzed, 8, 4, 0.6, 0.45, LAND, WATER);
        assert_eq!(out.get(0, 1).unwrap(), WATER);
        assert_eq!(out.get(0, 2).unwrap(), 0);
        assert_eq!(out.get(0, 3).unwrap(), LAND);
    }

    #[test]
    fn test_idempotent_on_own_output() {
        // With land=0 and water=1 the output classes sit on either side of
        // the thresholds, so a second pass reproduces the first exactly.
        let mut defuzzed = scores(16, 16, 0.5);
        defuzzed.set(3, 3, 0.95).unwrap();
        defuzzed.set(10, 12, 0.1).unwrap();

        let first = two_level_flood_fill(&defuzzed, 8, 4, 0.6, 0.45, 0, 1);

        let mut as_scores: Raster<f32> = Raster::new(16, 16);
        as_scores.set_nodata(Some(f32::NAN));
        for r in 0..16 {
            for c in 0..16 {
                as_scores.set(r, c, first.get(r, c).unwrap() as f32).unwrap();
            }
        }
        let second = two_level_flood_fill(&as_scores, 8, 4, 0.6, 0.45, 0, 1);

        for r in 0..16 {
            for c in 0..16 {
                assert_eq!(first.get(r, c).unwrap(), second.get(r, c).unwrap());
            }
        }
    }

    #[test]
    fn test_cross_tile_growth_through_halo() {
        // Seed in the first 8x8 tile, region extending into the second;
        // the halo lets the neighbor tile see the seed.
        let mut defuzzed = scores(8, 16, 0.1);
        for col in 2..14 {
            defuzzed.set(4, col, 0.5).unwrap();
        }
        defuzzed.set(4, 2, 0.9).unwrap();

        let out = two_level_flood_fill(&defuzzed, 8, 8, 0.6, 0.45, LAND, WATER);
        for col in 2..14 {
            assert_eq!(out.get(4, col).unwrap(), WATER, "col {}", col);
        }
    }
}
