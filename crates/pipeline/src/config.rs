//! Pipeline configuration

use sarflood_core::{Error, Result};

/// Tunable parameters of the detection pipeline.
///
/// The defaults reproduce the Martinis split-based configuration: 512-pixel
/// statistics tiles, five threshold tiles, a 256-pixel halo for the
/// tile-independent blob and flood-fill stages, and seed/grow levels of
/// 0.60/0.45 on the fused score.
#[derive(Debug, Clone)]
pub struct FloodConfig {
    /// Grid stride for the statistics and threshold tiles, in pixels
    pub tile_size: usize,
    /// Halo width for blob sizing and flood fill, in pixels
    pub tile_expand: usize,
    /// Smallest water body fed into the size membership, in meters
    pub min_blob_size_meters: f64,
    /// Size at which the size membership saturates, in meters
    pub max_blob_size_meters: f64,
    /// Decimation factor for the water/DEM statistics
    pub dem_stats_subsample: usize,
    /// Fused score at or above which a pixel seeds a water region
    pub seed_threshold: f64,
    /// Fused score at or above which a region may grow
    pub grow_threshold: f64,
    /// Valid-pixel fraction a quadrant needs to enter the tile statistics
    pub min_percent_valid: f64,
    /// Percentile of tile stddevs used as the heterogeneity cutoff
    pub stddev_percentile_cutoff: f64,
    /// Cap on the number of threshold-estimation tiles
    pub max_tiles: usize,
    /// Keep scratch artifacts after a successful run
    pub keep_scratch: bool,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            tile_size: 512,
            tile_expand: 256,
            min_blob_size_meters: 250.0,
            max_blob_size_meters: 1000.0,
            dem_stats_subsample: 10,
            seed_threshold: 0.60,
            grow_threshold: 0.45,
            min_percent_valid: 0.9,
            stddev_percentile_cutoff: 0.95,
            max_tiles: 5,
            keep_scratch: false,
        }
    }
}

impl FloodConfig {
    pub fn validate(&self) -> Result<()> {
        fn reject(name: &'static str, value: impl ToString, reason: &str) -> Result<()> {
            Err(Error::InvalidParameter {
                name,
                value: value.to_string(),
                reason: reason.to_string(),
            })
        }

        if self.tile_size < 2 {
            return reject(
                "tile_size",
                self.tile_size,
                "tiles must be at least 2 pixels to form quadrants",
            );
        }
        if self.tile_expand == 0 {
            return reject("tile_expand", self.tile_expand, "halo must be positive");
        }
        if self.dem_stats_subsample == 0 {
            return reject(
                "dem_stats_subsample",
                self.dem_stats_subsample,
                "subsample factor must be positive",
            );
        }
        if !(0.0..=1.0).contains(&self.seed_threshold)
            || !(0.0..=1.0).contains(&self.grow_threshold)
        {
            return reject(
                "seed_threshold/grow_threshold",
                format!("{}/{}", self.seed_threshold, self.grow_threshold),
                "flood-fill thresholds live on the fused score in [0, 1]",
            );
        }
        if self.grow_threshold > self.seed_threshold {
            return reject(
                "grow_threshold",
                self.grow_threshold,
                "grow level cannot exceed the seed level",
            );
        }
        if !(self.min_percent_valid > 0.0 && self.min_percent_valid <= 1.0) {
            return reject(
                "min_percent_valid",
                self.min_percent_valid,
                "quadrant validity is a fraction in (0, 1]",
            );
        }
        if !(self.stddev_percentile_cutoff > 0.0 && self.stddev_percentile_cutoff <= 1.0) {
            return reject(
                "stddev_percentile_cutoff",
                self.stddev_percentile_cutoff,
                "percentile is a fraction in (0, 1]",
            );
        }
        if self.max_tiles == 0 {
            return reject("max_tiles", self.max_tiles, "at least one tile is required");
        }
        if self.min_blob_size_meters <= 0.0
            || self.max_blob_size_meters <= self.min_blob_size_meters
        {
            return reject(
                "min_blob_size_meters/max_blob_size_meters",
                format!(
                    "{}/{}",
                    self.min_blob_size_meters, self.max_blob_size_meters
                ),
                "blob bounds must be positive and ordered",
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FloodConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = FloodConfig::default();
        config.tile_size = 1;
        assert!(config.validate().is_err());

        let mut config = FloodConfig::default();
        config.grow_threshold = 0.7;
        assert!(config.validate().is_err());

        let mut config = FloodConfig::default();
        config.max_blob_size_meters = 100.0;
        assert!(config.validate().is_err());

        let mut config = FloodConfig::default();
        config.stddev_percentile_cutoff = 0.0;
        assert!(config.validate().is_err());
    }
}
