//! GeoTIFF reading and writing
//!
//! The native implementation (always available) covers single-band imagery
//! with pixel-scale/tiepoint georeferencing and a GDAL-style nodata tag,
//! which is everything the detection pipeline and its scratch artifacts
//! need. Enable the `gdal` feature for full CRS handling and exotic layouts.

#[cfg(feature = "gdal")]
mod gdal_io;
pub mod native;

#[cfg(feature = "gdal")]
pub use gdal_io::{read_geotiff, write_geotiff};

#[cfg(not(feature = "gdal"))]
pub use native::{read_geotiff, write_geotiff};
