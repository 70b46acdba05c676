//! Approximate connected-component sizing
//!
//! Labels 4-connected water components and writes each water pixel's
//! component size, saturated at `max_blob_size`. To stay tile-parallel the
//! image is processed in tiles grown by a halo: components fully inside an
//! expanded tile are sized exactly, components crossing the halo boundary
//! are sized only within it. Because sizes saturate, any component larger
//! than the halo can reach the cap anyway, which keeps the approximation
//! error bounded for the downstream monotone membership.

use ndarray::Array2;
use sarflood_core::{Raster, Window};
use sarflood_parallel::{process_tiles, TileGrid};
use std::collections::VecDeque;

const NEIGHBORS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Sizes of the 4-connected components of `mask == water_class`.
///
/// Water pixels receive their component's pixel count clamped to
/// `max_blob_size`; all other pixels (land and nodata) receive 0, which is
/// also the output's nodata value.
pub fn blob_sizes(
    mask: &Raster<u8>,
    water_class: u8,
    tile_size: usize,
    halo: usize,
    max_blob_size: u32,
) -> Raster<u32> {
    let (rows, cols) = mask.shape();
    let grid = TileGrid::divide(mask.extent(), tile_size, true);

    let tile_outputs = process_tiles(&grid, |_, _, tile| {
        size_tile(mask, water_class, tile, halo, max_blob_size)
    });

    let mut out: Raster<u32> = mask.with_same_georef(rows, cols);
    out.set_nodata(Some(0));
    for (_, _, (tile, sizes)) in tile_outputs {
        for (local_row, row) in (tile.y..tile.y_end()).enumerate() {
            for (local_col, col) in (tile.x..tile.x_end()).enumerate() {
                unsafe { out.set_unchecked(row, col, sizes[(local_row, local_col)]) };
            }
        }
    }
    out
}

/// Component sizes for the core pixels of one tile, measured within the
/// halo-expanded window.
fn size_tile(
    mask: &Raster<u8>,
    water_class: u8,
    tile: Window,
    halo: usize,
    max_blob_size: u32,
) -> (Window, Array2<u32>) {
    let (rows, cols) = mask.shape();
    let expanded = tile.expand(halo, rows, cols);

    let is_water = |row: usize, col: usize| unsafe { mask.get_unchecked(row, col) } == water_class;

    let mut sizes = Array2::<u32>::zeros((tile.height, tile.width));
    let mut visited = Array2::<bool>::from_elem((expanded.height, expanded.width), false);
    let mut component = Vec::new();
    let mut queue = VecDeque::new();

    for seed_row in expanded.y..expanded.y_end() {
        for seed_col in expanded.x..expanded.x_end() {
            if visited[(seed_row - expanded.y, seed_col - expanded.x)]
                || !is_water(seed_row, seed_col)
            {
                continue;
            }

            // Flood the component within the expanded window
            component.clear();
            queue.push_back((seed_row, seed_col));
            visited[(seed_row - expanded.y, seed_col - expanded.x)] = true;
            while let Some((row, col)) = queue.pop_front() {
                component.push((row, col));
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
                    if !visited[local] && is_water(nr, nc) {
                        visited[local] = true;
                        queue.push_back((nr, nc));
                    }
                }
            }

            let size = (component.len() as u64).min(max_blob_size as u64) as u32;
            for &(row, col) in &component {
                if tile.contains(row, col) {
                    sizes[(row - tile.y, col - tile.x)] = size;
                }
            }
        }
    }

    (tile, sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: usize, cols: usize, water: &[(usize, usize)]) -> Raster<u8> {
        let mut mask: Raster<u8> = Raster::filled(rows, cols, 1);
        mask.set_nodata(Some(0));
        for &(r, c) in water {
            mask.set(r, c, 255).unwrap();
        }
        mask
    }

    #[test]
    fn test_single_component_sized_exactly() {
        // An L-shaped component of five pixels
        let mask = mask_from(
            16,
            16,
            &[(2, 2), (3, 2), (4, 2), (4, 3), (4, 4)],
        );
        let sizes = blob_sizes(&mask, 255, 16, 4, 10_000);
        for &(r, c) in &[(2, 2), (3, 2), (4, 2), (4, 3), (4, 4)] {
            assert_eq!(sizes.get(r, c).unwrap(), 5);
        }
        assert_eq!(sizes.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_diagonal_pixels_are_separate() {
        let mask = mask_from(8, 8, &[(1, 1), (2, 2)]);
        let sizes = blob_sizes(&mask, 255, 8, 2, 100);
        assert_eq!(sizes.get(1, 1).unwrap(), 1);
        assert_eq!(sizes.get(2, 2).unwrap(), 1);
    }

    #[test]
    fn test_size_clamped_to_max() {
        // A 6x6 block of 36 pixels against a cap of 20
        let water: Vec<_> = (4..10).flat_map(|r| (4..10).map(move |c| (r, c))).collect();
        let mask = mask_from(16, 16, &water);
        let sizes = blob_sizes(&mask, 255, 16, 4, 20);
        assert_eq!(sizes.get(5, 5).unwrap(), 20);
    }

    #[test]
    fn test_component_within_halo_consistent_across_tiles() {
        // A 4x4 square straddling the boundary of 8-pixel tiles; the halo
        // covers it fully from both sides, so every pixel reports 16.
        let water: Vec<_> = (6..10).flat_map(|r| (6..10).map(move |c| (r, c))).collect();
        let mask = mask_from(16, 16, &water);
        let sizes = blob_sizes(&mask, 255, 8, 4, 1000);
        for &(r, c) in &water {
            assert_eq!(sizes.get(r, c).unwrap(), 16, "pixel ({}, {})", r, c);
        }
    }

    #[test]
    fn test_mass_conservation_within_tile() {
        // Sum of 1/size over water pixels equals the component count when
        // each component fits inside one expanded tile.
        let mask = mask_from(
            32,
            32,
            &[(1, 1), (1, 2), (5, 5), (20, 20), (20, 21), (21, 20)],
        );
        let sizes = blob_sizes(&mask, 255, 32, 8, 1000);
        let mut inverse_sum = 0.0f64;
        for r in 0..32 {
            for c in 0..32 {
                let s = sizes.get(r, c).unwrap();
                if s > 0 {
                    inverse_sum += 1.0 / s as f64;
                }
            }
        }
        assert!((inverse_sum - 3.0).abs() < 1e-9);
    }
}
