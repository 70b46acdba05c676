//! # sarflood-algorithms
//!
//! The algorithmic stages of the sarflood surface-water detector:
//!
//! - **stats**: histograms, percentiles, masked moments
//! - **threshold**: Kittler–Illingworth minimum-error histogram splitting
//!   and hard classification
//! - **fuzzy**: Z/S membership functions and veto-mean fusion
//! - **preprocess**: DN→dB conversion, speckle median filter, linear
//!   rescaling into the processing domain
//! - **tile_stats**: per-tile mean / stddev-of-quadrant-means engine
//! - **tile_select**: heterogeneity-based selection of threshold tiles
//! - **global_threshold**: per-tile optimal thresholds and their aggregate
//! - **blobs**: approximate connected-component sizes on a water mask
//! - **floodfill**: two-level (seed and grow) flood fill
//! - **terrain**: slope angle from surface normals
//! - **resample**: decimation and same-CRS frame resampling

pub mod blobs;
pub mod floodfill;
pub mod fuzzy;
pub mod global_threshold;
mod maybe_rayon;
pub mod preprocess;
pub mod resample;
pub mod stats;
pub mod terrain;
pub mod threshold;
pub mod tile_select;
pub mod tile_stats;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::blobs::blob_sizes;
    pub use crate::floodfill::two_level_flood_fill;
    pub use crate::fuzzy::{defuzz, fuzzify, Membership, SMembership, ZMembership};
    pub use crate::global_threshold::{compute_global_threshold, GlobalThreshold};
    pub use crate::preprocess::{preprocess, PROC_MAX, PROC_MIN};
    pub use crate::resample::{project_to_frame, subsample};
    pub use crate::stats::Histogram;
    pub use crate::terrain::slope_degrees;
    pub use crate::threshold::{classify, kittler_illingworth};
    pub use crate::tile_select::{select_tiles, TileSelection};
    pub use crate::tile_stats::{compute_tile_stats, TileStats};
    pub use sarflood_core::prelude::*;
    pub use sarflood_parallel::TileGrid;
}
