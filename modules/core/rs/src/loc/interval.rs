use std::fmt::Display;

use derive_getters::Dissolve;
use eyre::{eyre, Result};
use impl_tools::autoimpl;

/// Interval is a half-open, 0-based genomic region [start, end).
/// It's not represented as a Rust-native Range because empty intervals (start == end) and
/// intervals with negative length (start > end) must be impossible to construct.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Dissolve)]
pub struct Interval {
    start: u64,
    end: u64,
}

/// Trait for types that can be generally viewed as half-open genomic intervals [start, end).
#[autoimpl(for <T: trait + ?Sized> &T, Box<T>)]
#[allow(clippy::len_without_is_empty)]
pub trait IntervalOp {
    /// Start position of the interval-like object (0-based, inclusive).
    fn start(&self) -> u64;

    /// End position of the interval-like object (0-based, exclusive).
    fn end(&self) -> u64;

    /// Length of the interval-like object.
    fn len(&self) -> u64 {
        self.end() - self.start()
    }

    /// Check if the interval-like object contains a given 0-based position.
    fn contains(&self, pos: u64) -> bool {
        self.start() <= pos && pos < self.end()
    }

    /// Check if the interval-like object contains a given 1-based position, i.e. a position
    /// as reported by SAM/VCF/mpileup.
    fn contains_1based(&self, pos: u64) -> bool {
        pos > 0 && self.contains(pos - 1)
    }
}

impl IntervalOp for Interval {
    #[inline(always)]
    fn start(&self) -> u64 {
        self.start
    }

    #[inline(always)]
    fn end(&self) -> u64 {
        self.end
    }
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(eyre!("Invalid interval: start ({start}) >= end ({end})"))
        }
    }

    /// 1-based, fully closed coordinates [start + 1, end] used by samtools-like region strings.
    pub fn as_1based_closed(&self) -> (u64, u64) {
        (self.start + 1, self.end)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self { start: 0, end: 1 }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
