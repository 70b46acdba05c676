//! Histogram and moment statistics over masked pixel streams
//!
//! Empty or all-invalid inputs produce `None` (or an empty histogram),
//! never NaN.

use sarflood_core::{Error, Raster, Result};

/// A binned histogram over `[min_val, max_val]`.
///
/// Bin `i` covers `[min_val + i·w, min_val + (i+1)·w)` with `w = (max_val −
/// min_val) / num_bins`; the last bin is closed on both ends. Samples
/// outside the range and non-finite samples are discarded.
#[derive(Debug, Clone)]
pub struct Histogram {
    counts: Vec<f64>,
    min_val: f64,
    max_val: f64,
}

impl Histogram {
    /// Bin an iterator of samples.
    pub fn from_values(
        values: impl Iterator<Item = f64>,
        num_bins: usize,
        min_val: f64,
        max_val: f64,
    ) -> Result<Self> {
        if num_bins == 0 {
            return Err(Error::InvalidParameter {
                name: "num_bins",
                value: "0".to_string(),
                reason: "histogram needs at least one bin".to_string(),
            });
        }
        if !(max_val > min_val) {
            return Err(Error::InvalidParameter {
                name: "max_val",
                value: format!("{}", max_val),
                reason: format!("must exceed min_val = {}", min_val),
            });
        }

        let width = (max_val - min_val) / num_bins as f64;
        let mut counts = vec![0.0; num_bins];
        for v in values {
            if !v.is_finite() || v < min_val || v > max_val {
                continue;
            }
            let bin = (((v - min_val) / width) as usize).min(num_bins - 1);
            counts[bin] += 1.0;
        }

        Ok(Self {
            counts,
            min_val,
            max_val,
        })
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn min_val(&self) -> f64 {
        self.min_val
    }

    pub fn max_val(&self) -> f64 {
        self.max_val
    }

    pub fn bin_width(&self) -> f64 {
        (self.max_val - self.min_val) / self.num_bins() as f64
    }

    /// Lower edge of bin `i`
    pub fn bin_value(&self, i: usize) -> f64 {
        self.min_val + i as f64 * self.bin_width()
    }

    /// Total binned mass
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Frequencies summing to 1, or `None` for an empty histogram
    pub fn normalized(&self) -> Option<Vec<f64>> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        Some(self.counts.iter().map(|&c| c / total).collect())
    }

    /// Smallest bin index at which the cumulative mass reaches `p` of the
    /// total, for `p` in `[0, 1]`. `None` for an empty histogram.
    pub fn percentile_bin(&self, p: f64) -> Option<usize> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        let target = p * total;
        let mut cumulative = 0.0;
        for (i, &c) in self.counts.iter().enumerate() {
            cumulative += c;
            if cumulative >= target {
                return Some(i);
            }
        }
        Some(self.num_bins() - 1)
    }
}

/// Arithmetic mean, `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation about a known mean, `None` when empty
pub fn population_stddev(values: &[f64], mean: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Mean and population stddev of valid `values` pixels where `mask`
/// equals `select`. `Ok(None)` when no pixel qualifies.
pub fn masked_mean_stddev(
    values: &Raster<f32>,
    mask: &Raster<u8>,
    select: u8,
) -> Result<Option<(f64, f64)>> {
    let (rows, cols) = values.shape();
    if mask.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: mask.rows(),
            ac: mask.cols(),
        });
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for row in 0..rows {
        for col in 0..cols {
            if unsafe { mask.get_unchecked(row, col) } != select {
                continue;
            }
            let v = unsafe { values.get_unchecked(row, col) };
            if values.is_nodata(v) {
                continue;
            }
            let v = v as f64;
            sum += v;
            sum_sq += v * v;
            count += 1;
        }
    }

    if count == 0 {
        return Ok(None);
    }
    let n = count as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    Ok(Some((mean, variance.sqrt())))
}
