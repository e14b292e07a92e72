//! Clamped linear interpolation tables.
//!
//! Queries outside the sampled range return the nearest end value.

use crate::error::{EcmError, EcmResult};
use crate::numeric::{Real, lerp};

/// 1-D table `y(x)` over strictly increasing `x`.
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup1D {
    points: Vec<Real>,
    values: Vec<Real>,
}

impl Lookup1D {
    pub fn new(points: Vec<Real>, values: Vec<Real>) -> EcmResult<Self> {
        check_axis(&points, "lookup points")?;
        if values.len() != points.len() {
            return Err(EcmError::InvalidArg {
                what: "lookup values must match number of points",
            });
        }
        check_finite(&values, "lookup values")?;
        Ok(Self { points, values })
    }

    pub fn points(&self) -> &[Real] {
        &self.points
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    /// Interpolated value at `x`; NaN in gives NaN out.
    pub fn interpolate(&self, x: Real) -> Real {
        if x.is_nan() {
            return Real::NAN;
        }
        let (lo, hi) = bracket(&self.points, x);
        lerp(
            self.points[lo],
            self.values[lo],
            self.points[hi],
            self.values[hi],
            x.clamp(self.points[lo], self.points[hi]),
        )
    }

    pub fn min_value(&self) -> Real {
        self.values.iter().copied().fold(Real::INFINITY, Real::min)
    }

    pub fn max_value(&self) -> Real {
        self.values.iter().copied().fold(Real::NEG_INFINITY, Real::max)
    }
}

/// 2-D table `z(x, y)`, `data[row][col]` with rows along `x` and columns along `y`.
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup2D {
    rows: Vec<Real>,
    cols: Vec<Real>,
    data: Vec<Vec<Real>>,
}

impl Lookup2D {
    pub fn new(rows: Vec<Real>, cols: Vec<Real>, data: Vec<Vec<Real>>) -> EcmResult<Self> {
        check_axis(&rows, "lookup rows")?;
        check_axis(&cols, "lookup columns")?;
        if data.len() != rows.len() || data.iter().any(|r| r.len() != cols.len()) {
            return Err(EcmError::InvalidArg {
                what: "lookup data must be rows x columns",
            });
        }
        for row in &data {
            check_finite(row, "lookup data")?;
        }
        Ok(Self { rows, cols, data })
    }

    /// Bilinear interpolation, clamped on both axes.
    pub fn interpolate(&self, x: Real, y: Real) -> Real {
        if x.is_nan() || y.is_nan() {
            return Real::NAN;
        }
        let (r0, r1) = bracket(&self.rows, x);
        let (c0, c1) = bracket(&self.cols, y);
        let x = x.clamp(self.rows[r0], self.rows[r1]);
        let y = y.clamp(self.cols[c0], self.cols[c1]);

        let at_r0 = lerp(
            self.cols[c0],
            self.data[r0][c0],
            self.cols[c1],
            self.data[r0][c1],
            y,
        );
        let at_r1 = lerp(
            self.cols[c0],
            self.data[r1][c0],
            self.cols[c1],
            self.data[r1][c1],
            y,
        );
        lerp(self.rows[r0], at_r0, self.rows[r1], at_r1, x)
    }

    pub fn min_value(&self) -> Real {
        self.data
            .iter()
            .flatten()
            .copied()
            .fold(Real::INFINITY, Real::min)
    }

    pub fn max_value(&self) -> Real {
        self.data
            .iter()
            .flatten()
            .copied()
            .fold(Real::NEG_INFINITY, Real::max)
    }
}

fn check_axis(axis: &[Real], what: &'static str) -> EcmResult<()> {
    if axis.is_empty() {
        return Err(EcmError::InvalidArg { what });
    }
    check_finite(axis, what)?;
    if axis.windows(2).any(|w| w[1] <= w[0]) {
        return Err(EcmError::InvalidArg {
            what: "lookup axis must be strictly increasing",
        });
    }
    Ok(())
}

fn check_finite(values: &[Real], what: &'static str) -> EcmResult<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(EcmError::NonFinite { what, value }),
        None => Ok(()),
    }
}

/// Indices of the interval containing `x`; both equal the end index when clamped.
fn bracket(axis: &[Real], x: Real) -> (usize, usize) {
    let last = axis.len() - 1;
    if x.is_nan() || x <= axis[0] {
        return (0, 0);
    }
    if x >= axis[last] {
        return (last, last);
    }
    // first index with axis[i] > x; x is strictly inside so 1 <= hi <= last
    let hi = axis.partition_point(|&p| p <= x);
    (hi - 1, hi)
}
