//! Decimation and frame resampling
//!
//! The DEM statistics run on 10×-decimated rasters for speed, and the DEM
//! itself is pulled into the SAR image's pixel frame by nearest-neighbour
//! lookup through both geotransforms. Rasters in different reference
//! systems are rejected; warping between systems belongs to the host I/O
//! layer, not this crate.

use crate::maybe_rayon::*;
use ndarray::Array2;
use sarflood_core::{Error, GeoTransform, Raster, RasterElement, Result};

/// Keep every `factor`-th pixel in both axes, starting at the origin.
///
/// The output dimensions are `ceil(n / factor)` and the georeference is
/// rescaled so the kept pixels keep their ground position.
pub fn subsample<T: RasterElement>(input: &Raster<T>, factor: usize) -> Raster<T> {
    assert!(factor > 0, "subsample factor must be positive");
    let (rows, cols) = input.shape();
    let out_rows = rows.div_ceil(factor);
    let out_cols = cols.div_ceil(factor);

    let mut out: Raster<T> = Raster::new(out_rows, out_cols);
    for row in 0..out_rows {
        for col in 0..out_cols {
            let v = unsafe { input.get_unchecked(row * factor, col * factor) };
            unsafe { out.set_unchecked(row, col, v) };
        }
    }

    if let Some(t) = input.transform() {
        out.set_transform(t.scaled(factor));
    }
    out.set_crs(input.crs().cloned());
    out.set_nodata(input.nodata());
    out
}

/// Resample `src` into a target pixel frame by nearest neighbour.
///
/// Every target pixel is located on the ground through `target_transform`
/// and looked up in `src` through its own transform. Target pixels falling
/// outside `src` are invalid. Both rasters must carry a georeference, and
/// when both declare a CRS the systems must be equivalent.
pub fn project_to_frame(
    src: &Raster<f32>,
    target_transform: &GeoTransform,
    target_crs: Option<&sarflood_core::Crs>,
    rows: usize,
    cols: usize,
) -> Result<Raster<f32>> {
    let src_transform = *src.transform().ok_or(Error::MissingGeoreference)?;

    if let (Some(sc), Some(tc)) = (src.crs(), target_crs) {
        if !sc.is_equivalent(tc) {
            return Err(Error::CrsMismatch(sc.identifier(), tc.identifier()));
        }
    }

    let (src_rows, src_cols) = src.shape();
    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            for (col, slot) in out.iter_mut().enumerate() {
                let (x, y) = target_transform.pixel_to_geo(col, row);
                let (src_col, src_row) = src_transform.geo_to_pixel(x, y);
                if !src_col.is_finite() || !src_row.is_finite() {
                    continue;
                }
                let (src_col, src_row) = (src_col.floor(), src_row.floor());
                if src_col < 0.0 || src_row < 0.0 {
                    continue;
                }
                let (src_col, src_row) = (src_col as usize, src_row as usize);
                if src_row >= src_rows || src_col >= src_cols {
                    continue;
                }
                let v = unsafe { src.get_unchecked(src_row, src_col) };
                if !src.is_nodata(v) {
                    *slot = v;
                }
            }
            out
        })
        .collect();

    let mut out: Raster<f32> = Raster::new(rows, cols);
    out.set_transform(*target_transform);
    out.set_crs(target_crs.cloned());
    out.set_nodata(Some(f32::NAN));
    *out.data_mut() = Array2::from_shape_vec((rows, cols), data).expect("row-major fill");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sarflood_core::Crs;

    #[test]
    fn test_subsample_decimates() {
        let mut input: Raster<f32> = Raster::new(10, 10);
        for row in 0..10 {
            for col in 0..10 {
                input.set(row, col, (row * 10 + col) as f32).unwrap();
            }
        }
        input.set_transform(GeoTransform::new(0.0, 0.0, 1.0, -1.0));

        let out = subsample(&input, 3);
        assert_eq!(out.shape(), (4, 4));
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(out.get(1, 2).unwrap(), 36.0);
        assert_relative_eq!(out.transform().unwrap().pixel_width, 3.0);
    }

    #[test]
    fn test_project_identity_frame() {
        let mut src: Raster<f32> = Raster::new(4, 4);
        for row in 0..4 {
            for col in 0..4 {
                src.set(row, col, (row * 4 + col) as f32).unwrap();
            }
        }
        let gt = GeoTransform::new(100.0, 50.0, 1.0, -1.0);
        src.set_transform(gt);

        let out = project_to_frame(&src, &gt, None, 4, 4).unwrap();
        for row in 0..4 {
            for col in 0..4 {
                assert_relative_eq!(out.get(row, col).unwrap(), src.get(row, col).unwrap());
            }
        }
    }

    #[test]
    fn test_project_coarser_source() {
        // Source at 2x the pixel size; each source cell covers 2x2 targets
        let mut src: Raster<f32> = Raster::new(2, 2);
        for row in 0..2 {
            for col in 0..2 {
                src.set(row, col, (row * 2 + col) as f32).unwrap();
            }
        }
        src.set_transform(GeoTransform::new(0.0, 0.0, 2.0, -2.0));

        let target = GeoTransform::new(0.0, 0.0, 1.0, -1.0);
        let out = project_to_frame(&src, &target, None, 4, 4).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(out.get(0, 3).unwrap(), 1.0);
        assert_relative_eq!(out.get(3, 0).unwrap(), 2.0);
        assert_relative_eq!(out.get(3, 3).unwrap(), 3.0);
    }

    #[test]
    fn test_project_outside_is_invalid() {
        let mut src: Raster<f32> = Raster::filled(2, 2, 5.0);
        src.set_transform(GeoTransform::new(0.0, 0.0, 1.0, -1.0));

        // Target frame shifted beyond the source footprint
        let target = GeoTransform::new(100.0, -100.0, 1.0, -1.0);
        let out = project_to_frame(&src, &target, None, 2, 2).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_project_rejects_crs_mismatch() {
        let mut src: Raster<f32> = Raster::filled(2, 2, 5.0);
        src.set_transform(GeoTransform::default());
        src.set_crs(Some(Crs::from_epsg(32615)));

        let err = project_to_frame(
            &src,
            &GeoTransform::default(),
            Some(&Crs::wgs84()),
            2,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, Error::CrsMismatch(..)));
    }

    #[test]
    fn test_project_requires_georeference() {
        let src: Raster<f32> = Raster::filled(2, 2, 5.0);
        assert!(matches!(
            project_to_frame(&src, &GeoTransform::default(), None, 2, 2),
            Err(Error::MissingGeoreference)
        ));
    }
}
