use crate::EcmError;

/// Floating point type used throughout the network.
pub type Real = f64;

/// Absolute/relative tolerance pair for scalar comparisons.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, EcmError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(EcmError::NonFinite { what, value: v })
    }
}

/// Finite and strictly greater than zero.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, EcmError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(EcmError::InvalidArg { what })
    }
}

/// Linear interpolation between `(x0, y0)` and `(x1, y1)` evaluated at `x`.
#[inline]
pub fn lerp(x0: Real, y0: Real, x1: Real, y1: Real, x: Real) -> Real {
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(ensure_positive(0.0, "r").is_err());
        assert!(ensure_positive(-1.0, "r").is_err());
        assert_eq!(ensure_positive(2.5, "r").unwrap(), 2.5);
    }

    #[test]
    fn lerp_midpoint_and_degenerate_interval() {
        assert_eq!(lerp(0.0, 0.0, 2.0, 4.0, 1.0), 2.0);
        assert_eq!(lerp(1.0, 7.0, 1.0, 9.0, 1.0), 7.0);
    }
}
