//! Georeferenced raster grid

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement, Window};
use ndarray::Array2;

/// Mean WGS84 meters per degree of latitude, used to estimate ground
/// resolution for rasters in geographic coordinates.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// A georeferenced 2-D raster.
///
/// Values are stored row-major as `(row, col)`. A pixel is *invalid* when it
/// equals the declared nodata sentinel, or (for float rasters) when it is
/// NaN. Every algorithm in this workspace skips invalid pixels and
/// propagates invalidity to its outputs.
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: Option<GeoTransform>,
    crs: Option<Crs>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// A raster filled with zeros and no georeference
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// A raster filled with `value` and no georeference
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Wrap an existing array
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: None,
            crs: None,
            nodata: None,
        }
    }

    /// Build from a row-major buffer
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// A raster of a possibly different cell type carrying this raster's
    /// georeference.
    pub fn with_same_georef<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Same shape and georeference, filled with `value`
    pub fn like(&self, value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Window covering the whole raster
    pub fn extent(&self) -> Window {
        Window::of_extent(self.rows(), self.cols())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get without bounds checking
    ///
    /// # Safety
    /// Caller must ensure `row < self.rows()` and `col < self.cols()`
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set without bounds checking
    ///
    /// # Safety
    /// Caller must ensure `row < self.rows()` and `col < self.cols()`
    pub unsafe fn set_unchecked(&mut self, row: usize, col: usize, value: T) {
        unsafe {
            *self.data.uget_mut((row, col)) = value;
        }
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    pub fn transform(&self) -> Option<&GeoTransform> {
        self.transform.as_ref()
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = Some(transform);
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Whether a value is invalid for this raster
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Cell size in CRS units, assuming square pixels; requires a transform
    pub fn cell_size(&self) -> Option<f64> {
        self.transform.map(|t| t.cell_size())
    }

    /// Approximate ground resolution in meters per pixel.
    ///
    /// Projected rasters report the cell size directly. Geographic rasters
    /// convert degrees using the mean earth radius, shrinking the east-west
    /// scale by the cosine of the scene-center latitude.
    pub fn meters_per_pixel(&self) -> Option<f64> {
        let t = self.transform?;
        let geographic = self.crs.as_ref().map(|c| c.is_geographic()).unwrap_or(false);
        if !geographic {
            return Some(t.cell_size());
        }
        let (_, center_y) = t.pixel_to_geo(self.cols() / 2, self.rows() / 2);
        let mx = t.pixel_width.abs() * METERS_PER_DEGREE * center_y.to_radians().cos();
        let my = t.pixel_height.abs() * METERS_PER_DEGREE;
        Some((mx + my) / 2.0)
    }

    /// Min, max, mean and valid-pixel count, skipping invalid cells
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum = 0.0;
        let mut count = 0usize;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }
            if min.map(|m| value < m).unwrap_or(true) {
                min = Some(value);
            }
            if max.map(|m| value > m).unwrap_or(true) {
                max = Some(value);
            }
            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        RasterStatistics {
            min,
            max,
            mean: (count > 0).then(|| sum / count as f64),
            valid_count: count,
        }
    }
}

/// Basic whole-raster statistics
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
}
