//! Tiled processing for large rasters
//!
//! Partitions an image extent into a row-major grid of fixed-size tiles and
//! runs per-tile work on a rayon pool. Tiles are disjoint, so stages that
//! write position-addressed results need no synchronization; stages that
//! need neighborhood context expand each tile by a halo before processing.

mod grid;

pub use grid::{process_tiles, TileGrid};
