//! Scratch artifact ownership
//!
//! The orchestrator persists intermediate rasters so the debug artifacts
//! can be inspected after a run and so downstream stages can re-read them.
//! The directory is owned for the duration of a run: artifacts are removed
//! on success and on clean failure, and left behind only when the process
//! dies mid-run (or when the caller asks to keep them).

use sarflood_core::io::native::{write_geotiff, GeoTiffPixel};
use sarflood_core::{Raster, Result};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tiff::encoder::TiffValue;
use tracing::{debug, warn};

pub const PREPROCESSED_IMAGE: &str = "preprocessed_image.tif";
pub const TILE_MEANS: &str = "tile_means.tif";
pub const TILE_STDDEVS: &str = "tile_stddevs.tif";
pub const INITIAL_KEPT_TILES: &str = "initial_kept_tiles.tif";
pub const FINAL_KEPT_TILES: &str = "final_kept_tiles.tif";
pub const INITIAL_WATER_DETECT: &str = "initial_water_detect.tif";
pub const BLOB_SIZES: &str = "blob_sizes.tif";

/// Owner of a run's scratch directory.
pub struct ScratchDir {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl ScratchDir {
    /// Use (and create if needed) `root` as the scratch directory.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            written: Vec::new(),
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Persist a raster artifact under `name`.
    pub fn write<T: GeoTiffPixel + Display>(
        &mut self,
        name: &str,
        raster: &Raster<T>,
    ) -> Result<&Path>
    where
        [T]: TiffValue,
    {
        let path = self.path(name);
        write_geotiff(raster, &path)?;
        debug!(artifact = name, "wrote scratch artifact");
        self.written.push(path);
        Ok(self.written.last().expect("just pushed").as_path())
    }

    /// Remove every artifact written during this run.
    ///
    /// Called explicitly on success and on clean failure; deliberately not
    /// a `Drop` impl, so a panicking run leaves its artifacts on disk for
    /// inspection.
    pub fn remove_artifacts(&mut self) {
        for path in self.written.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "could not remove scratch artifact");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_cleanup() {
        let dir = tempdir().unwrap();
        let mut scratch = ScratchDir::create(dir.path().join("run")).unwrap();

        let raster: Raster<u8> = Raster::filled(4, 4, 7);
        scratch.write(INITIAL_WATER_DETECT, &raster).unwrap();
        assert!(scratch.path(INITIAL_WATER_DETECT).exists());

        scratch.remove_artifacts();
        assert!(!scratch.path(INITIAL_WATER_DETECT).exists());
    }

    #[test]
    fn test_artifacts_survive_without_cleanup() {
        let dir = tempdir().unwrap();
        let path;
        {
            let mut scratch = ScratchDir::create(dir.path()).unwrap();
            let raster: Raster<u32> = Raster::filled(2, 2, 3);
            path = scratch.write(BLOB_SIZES, &raster).unwrap().to_path_buf();
        }
        // No cleanup call: the artifact stays, as after a crash
        assert!(path.exists());
    }
}
