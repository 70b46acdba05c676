//! # sarflood-core
//!
//! Core types and I/O for the sarflood surface-water detector.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced raster grid
//! - `GeoTransform`: affine pixel/geographic transformation
//! - `Crs`: coordinate reference system identifier
//! - `Window`: integer region of interest with halo expansion
//! - GeoTIFF reading and writing (native `tiff`, optional GDAL)

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::Crs;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement, Window};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement, Window};
}
