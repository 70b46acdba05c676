//! Tile grid partitioning

use rayon::prelude::*;
use sarflood_core::Window;

/// A row-major grid of square tiles covering an image extent.
///
/// Tile `(r, c)` has its origin at `(extent.x + c * size, extent.y + r *
/// size)`. Edge tiles are clipped to the extent when partial tiles are
/// included, and dropped entirely otherwise.
#[derive(Debug, Clone)]
pub struct TileGrid {
    tiles: Vec<Window>,
    rows: usize,
    cols: usize,
    tile_size: usize,
}

impl TileGrid {
    /// Partition `extent` into tiles of `size` pixels.
    ///
    /// With `include_partials` the grid spans `ceil(extent / size)` tiles per
    /// axis and edge tiles may be smaller than `size`; without it the grid
    /// spans `floor(extent / size)` tiles and only full tiles remain.
    pub fn divide(extent: Window, size: usize, include_partials: bool) -> Self {
        assert!(size > 0, "tile size must be positive");

        let (cols, rows) = if include_partials {
            (extent.width.div_ceil(size), extent.height.div_ceil(size))
        } else {
            (extent.width / size, extent.height / size)
        };

        let mut tiles = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let x = extent.x + c * size;
                let y = extent.y + r * size;
                let width = size.min(extent.x_end() - x);
                let height = size.min(extent.y_end() - y);
                tiles.push(Window::new(x, y, width, height));
            }
        }

        Self {
            tiles,
            rows,
            cols,
            tile_size: size,
        }
    }

    /// Grid rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total tile count
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Edge length tiles were cut to
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Tile window at grid position `(r, c)`
    pub fn get(&self, r: usize, c: usize) -> Option<Window> {
        if r < self.rows && c < self.cols {
            Some(self.tiles[r * self.cols + c])
        } else {
            None
        }
    }

    /// Iterate tiles in row-major order with their grid positions
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Window)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, &w)| (i / self.cols, i % self.cols, w))
    }
}

/// Run `f` over every tile of `grid` on the rayon pool and collect the
/// results in row-major tile order.
///
/// This is the blocking bulk operation behind the tiled stages: it returns
/// only once every tile has produced its result, giving the caller a serial
/// barrier at which to merge position-addressed outputs.
pub fn process_tiles<R, F>(grid: &TileGrid, f: F) -> Vec<(usize, usize, R)>
where
    F: Fn(usize, usize, Window) -> R + Sync,
    R: Send,
{
    let tiles: Vec<(usize, usize, Window)> = grid.iter().collect();
    tiles
        .into_par_iter()
        .map(|(r, c, w)| (r, c, f(r, c, w)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_partials_included() {
        let grid = TileGrid::divide(Window::of_extent(1000, 1300), 512, true);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);

        // Edge tiles are clipped to the extent
        let edge = grid.get(1, 2).unwrap();
        assert_eq!(edge, Window::new(1024, 512, 1300 - 1024, 1000 - 512));
    }

    #[test]
    fn test_divide_partials_discarded() {
        let grid = TileGrid::divide(Window::of_extent(1000, 1300), 512, false);
        assert_eq!(grid.rows(), 1);
        assert_eq!(grid.cols(), 2);
        for (_, _, tile) in grid.iter() {
            assert_eq!(tile.width, 512);
            assert_eq!(tile.height, 512);
        }
    }

    #[test]
    fn test_row_major_origins() {
        let grid = TileGrid::divide(Window::of_extent(64, 64), 32, true);
        let positions: Vec<_> = grid.iter().collect();
        assert_eq!(positions[0], (0, 0, Window::new(0, 0, 32, 32)));
        assert_eq!(positions[1], (0, 1, Window::new(32, 0, 32, 32)));
        assert_eq!(positions[2], (1, 0, Window::new(0, 32, 32, 32)));
    }

    #[test]
    fn test_full_coverage() {
        let rows = 97;
        let cols = 61;
        let mut covered = vec![vec![0u8; cols]; rows];
        let grid = TileGrid::divide(Window::of_extent(rows, cols), 16, true);
        for (_, _, tile) in grid.iter() {
            for r in tile.y..tile.y_end() {
                for c in tile.x..tile.x_end() {
                    covered[r][c] += 1;
                }
            }
        }
        assert!(covered
            .iter()
            .all(|row| row.iter().all(|&count| count == 1)));
    }

    #[test]
    fn test_process_tiles_order_and_totals() {
        let grid = TileGrid::divide(Window::of_extent(100, 100), 30, true);
        let results = process_tiles(&grid, |_, _, w| w.area());
        assert_eq!(results.len(), 16);
        // Row-major positions preserved through the parallel map
        assert_eq!(results[0].0, 0);
        assert_eq!(results[0].1, 0);
        assert_eq!(results[5].0, 1);
        assert_eq!(results[5].1, 1);
        let total: usize = results.iter().map(|(_, _, a)| a).sum();
        assert_eq!(total, 100 * 100);
    }
}
