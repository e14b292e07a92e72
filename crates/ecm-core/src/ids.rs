use core::fmt;
use core::num::NonZeroU32;

use crate::error::{EcmError, EcmResult};

/// Which equation set a state index belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SystemKind {
    /// Rate equations `dx/dt = A·x + C`.
    Differential,
    /// Instantaneous constraints `0 = A·x + C`.
    Algebraic,
}

/// Unique, monotonically assigned index of one scalar unknown.
///
/// The index is local to its equation set: differential UIDs occupy columns
/// `[0, diff_count)` of the combined state vector, algebraic UIDs are shifted
/// by `diff_count`. Use [`Uid::column`] to get the combined column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid {
    kind: SystemKind,
    // index+1, keeps Option<Uid> compact
    slot: NonZeroU32,
}

impl Uid {
    /// Largest representable row index.
    pub const MAX_INDEX: usize = (u32::MAX - 1) as usize;

    /// Create a UID from a 0-based row index within its equation set.
    ///
    /// Indices above [`Uid::MAX_INDEX`] saturate; allocation goes through
    /// [`Uid::try_from_index`].
    pub fn from_index(kind: SystemKind, index: u32) -> Self {
        Self {
            kind,
            slot: NonZeroU32::MIN.saturating_add(index),
        }
    }

    /// Like [`Uid::from_index`], failing once the index space is exhausted.
    pub fn try_from_index(kind: SystemKind, index: usize) -> EcmResult<Self> {
        match u32::try_from(index) {
            Ok(i) if index <= Self::MAX_INDEX => Ok(Self::from_index(kind, i)),
            _ => Err(EcmError::IndexOob {
                what: "uid index space exhausted",
                index,
                len: Self::MAX_INDEX + 1,
            }),
        }
    }

    /// Equation set this UID was allocated from.
    pub fn kind(self) -> SystemKind {
        self.kind
    }

    /// 0-based row index within the owning equation set.
    pub fn index(self) -> usize {
        (self.slot.get() - 1) as usize
    }

    /// Column of this unknown in the combined `[x_d; x_a; 1]` state vector.
    pub fn column(self, diff_count: usize) -> usize {
        match self.kind {
            SystemKind::Differential => self.index(),
            SystemKind::Algebraic => diff_count + self.index(),
        }
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            SystemKind::Differential => 'd',
            SystemKind::Algebraic => 'a',
        };
        write!(f, "Uid({tag}{})", self.index())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}
