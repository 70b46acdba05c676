//! Terrain slope from surface normals
//!
//! The slope channel measures how far the local surface normal tilts away
//! from vertical. Normals are computed from finite differences at unit x/y
//! spacing, matching the fuzzy slope parameters which are calibrated in
//! degrees on that convention.

use crate::maybe_rayon::*;
use ndarray::Array2;
use sarflood_core::Raster;

/// Slope angle in degrees from unit-spacing surface normals.
///
/// For gradients `p = dz/dx`, `q = dz/dy` the unnormalized normal is
/// `(-p, -q, 1)` and the slope angle is `acos(|n·ẑ|/|n|)`. Differences are
/// central where possible and one-sided at the raster border; a pixel is
/// invalid when it or any neighbor the difference needs is invalid.
pub fn slope_degrees(dem: &Raster<f32>) -> Raster<f32> {
    let (rows, cols) = dem.shape();

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            for (col, slot) in out.iter_mut().enumerate() {
                let center = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(center) {
                    continue;
                }

                let sample = |r: usize, c: usize| -> Option<f64> {
                    let v = unsafe { dem.get_unchecked(r, c) };
                    (!dem.is_nodata(v)).then_some(v as f64)
                };

                // Central difference over 2 cells, one-sided over 1 at edges
                let dz_dx = match (col > 0, col + 1 < cols) {
                    (true, true) => sample(row, col - 1)
                        .zip(sample(row, col + 1))
                        .map(|(a, b)| (b - a) / 2.0),
                    (false, true) => sample(row, col + 1).map(|b| b - center as f64),
                    (true, false) => sample(row, col - 1).map(|a| center as f64 - a),
                    (false, false) => Some(0.0),
                };
                let dz_dy = match (row > 0, row + 1 < rows) {
                    (true, true) => sample(row - 1, col)
                        .zip(sample(row + 1, col))
                        .map(|(a, b)| (b - a) / 2.0),
                    (false, true) => sample(row + 1, col).map(|b| b - center as f64),
                    (true, false) => sample(row - 1, col).map(|a| center as f64 - a),
                    (false, false) => Some(0.0),
                };

                if let (Some(p), Some(q)) = (dz_dx, dz_dy) {
                    // |n.z| / |n| for n = (-p, -q, 1)
                    let cos_angle = 1.0 / (1.0 + p * p + q * q).sqrt();
                    *slot = cos_angle.acos().to_degrees() as f32;
                }
            }
            out
        })
        .collect();

    let mut out: Raster<f32> = dem.with_same_georef(rows, cols);
    out.set_nodata(Some(f32::NAN));
    *out.data_mut() = Array2::from_shape_vec((rows, cols), data).expect("row-major fill");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_surface_zero_slope() {
        let dem: Raster<f32> = Raster::filled(8, 8, 120.0);
        let slope = slope_degrees(&dem);
        assert_relative_eq!(slope.get(4, 4).unwrap(), 0.0);
        assert_relative_eq!(slope.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_unit_ramp_is_45_degrees() {
        // z = x: gradient (1, 0), slope angle 45
        let mut dem: Raster<f32> = Raster::new(8, 8);
        for row in 0..8 {
            for col in 0..8 {
                dem.set(row, col, col as f32).unwrap();
            }
        }
        let slope = slope_degrees(&dem);
        assert_relative_eq!(slope.get(4, 4).unwrap(), 45.0, epsilon = 1e-4);
        // One-sided difference at the border sees the same gradient
        assert_relative_eq!(slope.get(4, 0).unwrap(), 45.0, epsilon = 1e-4);
    }

    #[test]
    fn test_invalid_neighbor_invalidates() {
        let mut dem: Raster<f32> = Raster::filled(5, 5, 10.0);
        dem.set(2, 2, f32::NAN).unwrap();
        let slope = slope_degrees(&dem);
        assert!(slope.get(2, 2).unwrap().is_nan());
        // (2, 1) needs (2, 2) for its central difference
        assert!(slope.get(2, 1).unwrap().is_nan());
        assert!(!slope.get(0, 0).unwrap().is_nan());
    }
}
