//! Minimum-error histogram thresholding
//!
//! Kittler & Illingworth's criterion models the histogram as a two-class
//! Gaussian mixture and scores every candidate split by the classification
//! error proxy
//!
//! ```text
//! J(t) = 1 + 2·(P1·ln σ1 + P2·ln σ2) − 2·(P1·ln P1 + P2·ln P2)
//! ```
//!
//! where P, μ, σ are the mass, mean and stddev of the classes on either
//! side of bin `t`. The split with minimal J wins.

use crate::stats::Histogram;
use sarflood_core::{Error, Raster, Result};

/// Score one candidate split; `None` when either class is empty or
/// degenerate (zero variance), which the caller treats as J = +∞.
fn split_score(freqs: &[f64], values: &[f64], t: usize) -> Option<f64> {
    let (lo, hi) = freqs.split_at(t + 1);
    let (lo_v, hi_v) = values.split_at(t + 1);

    let p1: f64 = lo.iter().sum();
    let p2: f64 = hi.iter().sum();
    if p1 <= 0.0 || p2 <= 0.0 {
        return None;
    }

    let mu1 = lo.iter().zip(lo_v).map(|(f, v)| f * v).sum::<f64>() / p1;
    let mu2 = hi.iter().zip(hi_v).map(|(f, v)| f * v).sum::<f64>() / p2;

    let var1 = lo
        .iter()
        .zip(lo_v)
        .map(|(f, v)| f * (v - mu1) * (v - mu1))
        .sum::<f64>()
        / p1;
    let var2 = hi
        .iter()
        .zip(hi_v)
        .map(|(f, v)| f * (v - mu2) * (v - mu2))
        .sum::<f64>()
        / p2;
    if var1 <= 0.0 || var2 <= 0.0 {
        return None;
    }

    let (sigma1, sigma2) = (var1.sqrt(), var2.sqrt());
    Some(1.0 + 2.0 * (p1 * sigma1.ln() + p2 * sigma2.ln()) - 2.0 * (p1 * p1.ln() + p2 * p2.ln()))
}

/// Optimal split threshold of a histogram by the Kittler–Illingworth
/// minimum-error criterion.
///
/// Returns the threshold value `min + w·(t* − 0.5)` for the best split bin
/// `t*`; ties break toward the lowest bin. Fails when the histogram is
/// empty or too sparse for any split to produce two populated,
/// non-degenerate classes.
pub fn kittler_illingworth(hist: &Histogram) -> Result<f64> {
    const STAGE: &str = "kittler-illingworth";

    let freqs = hist
        .normalized()
        .ok_or_else(|| Error::algorithm(STAGE, "empty histogram"))?;
    let k = hist.num_bins();
    let values: Vec<f64> = (0..k).map(|i| hist.bin_value(i)).collect();

    let mut best: Option<(usize, f64)> = None;
    for t in 1..k.saturating_sub(1) {
        if let Some(score) = split_score(&freqs, &values, t) {
            let better = best.map(|(_, s)| score < s).unwrap_or(true);
            if better {
                best = Some((t, score));
            }
        }
    }

    match best {
        Some((t, _)) => Ok(hist.min_val() + hist.bin_width() * (t as f64 - 0.5)),
        None => Err(Error::algorithm(
            STAGE,
            format!(
                "histogram too sparse to split ({} bins, total mass {})",
                k,
                hist.total()
            ),
        )),
    }
}

/// Hard-classify a raster against a threshold: valid pixels at or below
/// `threshold` become `water`, valid pixels above become `land`, invalid
/// pixels become 0 (the output's nodata).
pub fn classify(input: &Raster<f32>, threshold: f64, water: u8, land: u8) -> Raster<u8> {
    let (rows, cols) = input.shape();
    let mut out: Raster<u8> = input.with_same_georef(rows, cols);
    out.set_nodata(Some(0));

    for row in 0..rows {
        for col in 0..cols {
            let v = unsafe { input.get_unchecked(row, col) };
            let class = if input.is_nodata(v) {
                0
            } else if (v as f64) <= threshold {
                water
            } else {
                land
            };
            unsafe { out.set_unchecked(row, col, class) };
        }
    }
    out
}
