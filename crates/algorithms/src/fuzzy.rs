//! Fuzzy membership functions and channel fusion
//!
//! The refinement stage scores each pixel on four channels (backscatter,
//! elevation, slope, water-body size) with piecewise-quadratic membership
//! functions, then fuses the channels with a veto mean.

use crate::maybe_rayon::*;
use ndarray::Array2;
use sarflood_core::{Error, Raster, Result};

/// A scalar membership function over `[0, 1]`.
pub trait Membership: Sync {
    fn eval(&self, v: f64) -> f64;
}

fn check_bounds(a: f64, b: f64) -> Result<()> {
    if !(a < b) {
        return Err(Error::InvalidParameter {
            name: "membership bounds",
            value: format!("({}, {})", a, b),
            reason: "lower bound must be less than upper bound".to_string(),
        });
    }
    Ok(())
}

/// Z-shaped (high-to-low) membership: 1 below `a`, 0 above `b`, quadratic
/// blend through the midpoint.
#[derive(Debug, Clone, Copy)]
pub struct ZMembership {
    a: f64,
    b: f64,
    mid: f64,
    span: f64,
}

impl ZMembership {
    pub fn new(a: f64, b: f64) -> Result<Self> {
        check_bounds(a, b)?;
        Ok(Self {
            a,
            b,
            mid: (a + b) / 2.0,
            span: b - a,
        })
    }
}

impl Membership for ZMembership {
    fn eval(&self, v: f64) -> f64 {
        if v < self.a {
            1.0
        } else if v < self.mid {
            let t = (v - self.a) / self.span;
            1.0 - 2.0 * t * t
        } else if v < self.b {
            let t = (v - self.b) / self.span;
            2.0 * t * t
        } else {
            0.0
        }
    }
}

/// S-shaped (low-to-high) membership: 0 below `a`, 1 above `b`.
#[derive(Debug, Clone, Copy)]
pub struct SMembership {
    a: f64,
    b: f64,
    mid: f64,
    span: f64,
}

impl SMembership {
    pub fn new(a: f64, b: f64) -> Result<Self> {
        check_bounds(a, b)?;
        Ok(Self {
            a,
            b,
            mid: (a + b) / 2.0,
            span: b - a,
        })
    }
}

impl Membership for SMembership {
    fn eval(&self, v: f64) -> f64 {
        if v < self.a {
            0.0
        } else if v < self.mid {
            let t = (v - self.a) / self.span;
            2.0 * t * t
        } else if v < self.b {
            let t = (v - self.b) / self.span;
            1.0 - 2.0 * t * t
        } else {
            1.0
        }
    }
}

/// Apply a membership function per pixel; invalid stays invalid (NaN).
pub fn fuzzify<M: Membership>(input: &Raster<f32>, membership: &M) -> Raster<f32> {
    let (rows, cols) = input.shape();

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            for (col, slot) in out.iter_mut().enumerate() {
                let v = unsafe { input.get_unchecked(row, col) };
                if !input.is_nodata(v) {
                    *slot = membership.eval(v as f64) as f32;
                }
            }
            out
        })
        .collect();

    let mut out: Raster<f32> = input.with_same_georef(rows, cols);
    out.set_nodata(Some(f32::NAN));
    *out.data_mut() = Array2::from_shape_vec((rows, cols), data).expect("row-major fill");
    out
}

/// Fuse four fuzzy channels with a veto mean.
///
/// A pixel that is invalid on any channel is invalid in the output; a pixel
/// that scores exactly 0 on any channel scores 0; otherwise the output is
/// the arithmetic mean of the four scores (order-invariant).
pub fn defuzz(channels: [&Raster<f32>; 4]) -> Result<Raster<f32>> {
    let (rows, cols) = channels[0].shape();
    for ch in &channels[1..] {
        if ch.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: ch.rows(),
                ac: ch.cols(),
            });
        }
    }

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![f32::NAN; cols];
            for (col, slot) in out.iter_mut().enumerate() {
                let mut sum = 0.0f32;
                let mut veto = false;
                let mut invalid = false;
                for ch in &channels {
                    let v = unsafe { ch.get_unchecked(row, col) };
                    if ch.is_nodata(v) {
                        invalid = true;
                        break;
                    }
                    if v == 0.0 {
                        veto = true;
                    }
                    sum += v;
                }
                if invalid {
                    continue;
                }
                *slot = if veto { 0.0 } else { sum / 4.0 };
            }
            out
        })
        .collect();

    let mut out: Raster<f32> = channels[0].with_same_georef(rows, cols);
    out.set_nodata(Some(f32::NAN));
    *out.data_mut() = Array2::from_shape_vec((rows, cols), data).expect("row-major fill");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_z_shape_anchors() {
        let z = ZMembership::new(10.0, 30.0).unwrap();
        assert_relative_eq!(z.eval(5.0), 1.0);
        assert_relative_eq!(z.eval(10.0), 1.0);
        assert_relative_eq!(z.eval(20.0), 0.5);
        assert_relative_eq!(z.eval(30.0), 0.0);
        assert_relative_eq!(z.eval(100.0), 0.0);
        // Quadratic shoulder below the midpoint
        assert_relative_eq!(z.eval(15.0), 1.0 - 2.0 * 0.0625);
    }

    #[test]
    fn test_z_plus_s_is_one() {
        let z = ZMembership::new(-3.0, 7.5).unwrap();
        let s = SMembership::new(-3.0, 7.5).unwrap();
        let mut v = -5.0;
        while v < 10.0 {
            assert_relative_eq!(z.eval(v) + s.eval(v), 1.0, epsilon = 1e-12);
            v += 0.01;
        }
    }

    #[test]
    fn test_degenerate_bounds_rejected() {
        assert!(ZMembership::new(1.0, 1.0).is_err());
        assert!(SMembership::new(2.0, 1.0).is_err());
    }

    #[test]
    fn test_fuzzify_propagates_invalid() {
        let mut input: Raster<f32> = Raster::filled(2, 2, 0.0);
        input.set(1, 0, f32::NAN).unwrap();
        let z = ZMembership::new(0.0, 1.0).unwrap();
        let out = fuzzify(&input, &z);
        assert_relative_eq!(out.get(0, 0).unwrap(), 1.0);
        assert!(out.get(1, 0).unwrap().is_nan());
    }

    #[test]
    fn test_defuzz_veto_and_mean() {
        let a: Raster<f32> = Raster::filled(1, 3, 0.8);
        let mut b: Raster<f32> = Raster::filled(1, 3, 0.6);
        let c: Raster<f32> = Raster::filled(1, 3, 1.0);
        let mut d: Raster<f32> = Raster::filled(1, 3, 0.6);

        b.set(0, 1, 0.0).unwrap(); // veto
        d.set(0, 2, f32::NAN).unwrap(); // invalid

        let out = defuzz([&a, &b, &c, &d]).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.75);
        assert_relative_eq!(out.get(0, 1).unwrap(), 0.0);
        assert!(out.get(0, 2).unwrap().is_nan());
    }

    #[test]
    fn test_defuzz_order_invariant() {
        let a: Raster<f32> = Raster::filled(2, 2, 0.2);
        let b: Raster<f32> = Raster::filled(2, 2, 0.4);
        let c: Raster<f32> = Raster::filled(2, 2, 0.6);
        let d: Raster<f32> = Raster::filled(2, 2, 0.8);

        let forward = defuzz([&a, &b, &c, &d]).unwrap();
        let shuffled = defuzz([&d, &b, &a, &c]).unwrap();
        assert_relative_eq!(
            forward.get(1, 1).unwrap(),
            shuffled.get(1, 1).unwrap(),
            epsilon = 1e-12
        );
    }
}
