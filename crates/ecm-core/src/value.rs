//! Scalar providers for circuit element parameters.
//!
//! A `ValueSource` is shared by one or more elements (`Arc<ValueSource>`) and
//! evaluated every step, so lookups bound to a [`StateCell`] follow the
//! state (SOC, temperature) as it evolves.

use std::sync::Arc;

use crate::error::{EcmError, EcmResult};
use crate::lookup::{Lookup1D, Lookup2D};
use crate::numeric::{Real, ensure_finite};
use crate::state::StateCell;

#[derive(Clone, Debug)]
pub enum ValueSource {
    /// Fixed value.
    Const(Real),
    /// 1-D table, optionally evaluated at a bound state.
    Lookup1D {
        table: Lookup1D,
        state: Option<StateCell>,
    },
    /// 2-D table, optionally evaluated at a pair of bound states.
    Lookup2D {
        table: Lookup2D,
        states: Option<(StateCell, StateCell)>,
    },
    /// `factor * source`
    Scaled {
        source: Arc<ValueSource>,
        factor: Real,
    },
    Sum(Vec<Arc<ValueSource>>),
    Product(Vec<Arc<ValueSource>>),
    /// First operand divided by every following one.
    Quotient(Vec<Arc<ValueSource>>),
}

impl ValueSource {
    pub fn constant(value: Real) -> Arc<Self> {
        Arc::new(Self::Const(value))
    }

    pub fn lookup_1d(table: Lookup1D, state: StateCell) -> Arc<Self> {
        Arc::new(Self::Lookup1D {
            table,
            state: Some(state),
        })
    }

    pub fn lookup_2d(table: Lookup2D, row_state: StateCell, col_state: StateCell) -> Arc<Self> {
        Arc::new(Self::Lookup2D {
            table,
            states: Some((row_state, col_state)),
        })
    }

    pub fn scaled(source: Arc<ValueSource>, factor: Real) -> Arc<Self> {
        Arc::new(Self::Scaled { source, factor })
    }

    pub fn product(operands: Vec<Arc<ValueSource>>) -> EcmResult<Arc<Self>> {
        if operands.is_empty() {
            return Err(EcmError::InvalidArg {
                what: "product needs at least one operand",
            });
        }
        Ok(Arc::new(Self::Product(operands)))
    }

    pub fn sum(operands: Vec<Arc<ValueSource>>) -> EcmResult<Arc<Self>> {
        if operands.is_empty() {
            return Err(EcmError::InvalidArg {
                what: "sum needs at least one operand",
            });
        }
        Ok(Arc::new(Self::Sum(operands)))
    }

    pub fn quotient(operands: Vec<Arc<ValueSource>>) -> EcmResult<Arc<Self>> {
        if operands.len() < 2 {
            return Err(EcmError::InvalidArg {
                what: "quotient needs at least two operands",
            });
        }
        Ok(Arc::new(Self::Quotient(operands)))
    }

    /// Current value. Lookups are evaluated at their bound states.
    pub fn value(&self) -> EcmResult<Real> {
        match self {
            Self::Const(v) => Ok(*v),
            Self::Lookup1D { table, state } => match state {
                Some(s) => Ok(table.interpolate(ensure_finite(s.get(), "lookup state")?)),
                None => Err(EcmError::UnsupportedOperation {
                    what: "value of a 1-D lookup without a bound state",
                }),
            },
            Self::Lookup2D { table, states } => match states {
                Some((r, c)) => Ok(table.interpolate(
                    ensure_finite(r.get(), "lookup row state")?,
                    ensure_finite(c.get(), "lookup column state")?,
                )),
                None => Err(EcmError::UnsupportedOperation {
                    what: "value of a 2-D lookup without bound states",
                }),
            },
            Self::Scaled { source, factor } => Ok(factor * source.value()?),
            Self::Sum(ops) => ops.iter().map(|o| o.value()).sum(),
            Self::Product(ops) => ops.iter().map(|o| o.value()).product(),
            Self::Quotient(ops) => {
                let mut it = ops.iter();
                let mut acc = match it.next() {
                    Some(first) => first.value()?,
                    None => {
                        return Err(EcmError::Invariant {
                            what: "quotient without operands",
                        });
                    }
                };
                for op in it {
                    acc /= op.value()?;
                }
                Ok(acc)
            }
        }
    }

    /// Value at an explicit 1-D coordinate.
    pub fn value_at(&self, x: Real) -> EcmResult<Real> {
        match self {
            Self::Const(v) => Ok(*v),
            Self::Lookup1D { table, .. } => {
                Ok(table.interpolate(ensure_finite(x, "lookup coordinate")?))
            }
            Self::Scaled { source, factor } => Ok(factor * source.value_at(x)?),
            _ => Err(EcmError::UnsupportedOperation {
                what: "1-D coordinate query",
            }),
        }
    }

    /// Value at an explicit 2-D coordinate.
    pub fn value_at_2d(&self, x: Real, y: Real) -> EcmResult<Real> {
        match self {
            Self::Const(v) => Ok(*v),
            Self::Lookup2D { table, .. } => Ok(table.interpolate(
                ensure_finite(x, "lookup row coordinate")?,
                ensure_finite(y, "lookup column coordinate")?,
            )),
            Self::Scaled { source, factor } => Ok(factor * source.value_at_2d(x, y)?),
            _ => Err(EcmError::UnsupportedOperation {
                what: "2-D coordinate query",
            }),
        }
    }

    /// Smallest value this source can take.
    pub fn min_value_of_lookup(&self) -> EcmResult<Real> {
        self.bounds().map(|(lo, _)| lo)
    }

    /// Largest value this source can take.
    pub fn max_value_of_lookup(&self) -> EcmResult<Real> {
        self.bounds().map(|(_, hi)| hi)
    }

    fn bounds(&self) -> EcmResult<(Real, Real)> {
        match self {
            Self::Const(v) => Ok((*v, *v)),
            Self::Lookup1D { table, .. } => Ok((table.min_value(), table.max_value())),
            Self::Lookup2D { table, .. } => Ok((table.min_value(), table.max_value())),
            Self::Scaled { source, factor } => {
                let (lo, hi) = source.bounds()?;
                if *factor >= 0.0 {
                    Ok((factor * lo, factor * hi))
                } else {
                    Ok((factor * hi, factor * lo))
                }
            }
            Self::Sum(ops) => ops.iter().try_fold((0.0, 0.0), |(lo, hi), op| {
                let (l, h) = op.bounds()?;
                Ok((lo + l, hi + h))
            }),
            Self::Product(ops) => ops.iter().try_fold((1.0, 1.0), |(lo, hi), op| {
                let (l, h) = op.bounds()?;
                if l < 0.0 {
                    return Err(EcmError::UnsupportedOperation {
                        what: "lookup bounds of a product with negative factors",
                    });
                }
                Ok((lo * l, hi * h))
            }),
            Self::Quotient(_) => Err(EcmError::UnsupportedOperation {
                what: "lookup bounds of a quotient",
            }),
        }
    }
}
