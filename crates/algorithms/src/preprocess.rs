//! SAR amplitude preprocessing
//!
//! Converts Sentinel-1 digital numbers to decibels, suppresses speckle with
//! a 3×3 median filter, and rescales linearly from the working dB range
//! into the processing domain used by the thresholding stages.

use crate::maybe_rayon::*;
use ndarray::Array2;
use sarflood_core::Raster;

/// Lower edge of the working dB range
pub const DB_MIN: f64 = 0.0;
/// Upper edge of the working dB range
pub const DB_MAX: f64 = 35.0;
/// Lower edge of the processing domain
pub const PROC_MIN: f64 = 0.0;
/// Upper edge of the processing domain
pub const PROC_MAX: f64 = 400.0;

/// Convert one digital number to decibels. Zero-valued pixels are sensor
/// dropouts, not measurements, and come back invalid.
pub fn dn_to_db(dn: u16) -> f32 {
    if dn == 0 {
        f32::NAN
    } else {
        10.0 * (dn as f32).log10()
    }
}

/// Map a processing-domain value back to decibels (diagnostics only).
pub fn proc_to_db(v: f64) -> f64 {
    DB_MIN + (v - PROC_MIN) * (DB_MAX - DB_MIN) / (PROC_MAX - PROC_MIN)
}

/// 3×3 median filter that ignores invalid neighbors.
///
/// Border pixels use the neighbors that exist. A pixel that is itself
/// invalid stays invalid rather than being filled from its neighborhood.
pub fn median_filter_3x3(input: &Raster<f32>) -> Raster<f32> {
    let (rows, cols) = input.shape();

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            let mut window = [0.0f32; 9];
            for (col, slot) in out.iter_mut().enumerate() {
                let center = unsafe { input.get_unchecked(row, col) };
                if input.is_nodata(center) {
                    continue;
                }

                let mut n = 0;
                for dr in -1i64..=1 {
                    for dc in -1i64..=1 {
                        let r = row as i64 + dr;
                        let c = col as i64 + dc;
                        if r < 0 || c < 0 || r >= rows as i64 || c >= cols as i64 {
                            continue;
                        }
                        let v = unsafe { input.get_unchecked(r as usize, c as usize) };
                        if !input.is_nodata(v) {
                            window[n] = v;
                            n += 1;
                        }
                    }
                }

                let values = &mut window[..n];
                values.sort_by(|a, b| a.partial_cmp(b).expect("no NaN in window"));
                *slot = values[n / 2];
            }
            out
        })
        .collect();

    let mut out: Raster<f32> = input.with_same_georef(rows, cols);
    out.set_nodata(Some(f32::NAN));
    *out.data_mut() = Array2::from_shape_vec((rows, cols), data).expect("row-major fill");
    out
}

/// Linear rescale from `[DB_MIN, DB_MAX]` into `[PROC_MIN, PROC_MAX]`,
/// clamping to the output range. Invalid stays invalid.
pub fn rescale_to_processing(input: &Raster<f32>) -> Raster<f32> {
    let gain = (PROC_MAX - PROC_MIN) / (DB_MAX - DB_MIN);
    let (rows, cols) = input.shape();

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            for (col, slot) in out.iter_mut().enumerate() {
                let v = unsafe { input.get_unchecked(row, col) };
                if input.is_nodata(v) {
                    continue;
                }
                let scaled = PROC_MIN + (v as f64 - DB_MIN) * gain;
                *slot = scaled.clamp(PROC_MIN, PROC_MAX) as f32;
            }
            out
        })
        .collect();

    let mut out: Raster<f32> = input.with_same_georef(rows, cols);
    out.set_nodata(Some(f32::NAN));
    *out.data_mut() = Array2::from_shape_vec((rows, cols), data).expect("row-major fill");
    out
}

/// Full preprocessing chain: DN→dB with dropout masking, speckle median
/// filter, rescale into the processing domain. The output carries the
/// input's georeference and uses NaN as its mask.
pub fn preprocess(input: &Raster<u16>) -> Raster<f32> {
    let (rows, cols) = input.shape();

    let db_data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            for (col, slot) in out.iter_mut().enumerate() {
                let dn = unsafe { input.get_unchecked(row, col) };
                if !input.is_nodata(dn) {
                    *slot = dn_to_db(dn);
                }
            }
            out
        })
        .collect();

    let mut db: Raster<f32> = input.with_same_georef(rows, cols);
    db.set_nodata(Some(f32::NAN));
    *db.data_mut() = Array2::from_shape_vec((rows, cols), db_data).expect("row-major fill");

    rescale_to_processing(&median_filter_3x3(&db))
}
