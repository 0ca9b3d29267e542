use std::fmt::Display;

use derive_getters::{Dissolve, Getters};
use eyre::{ensure, Result};

use super::interval::{Interval, IntervalOp};

/// Labeled target region of the screening (e.g. an exon or a whole gene).
/// The label is reported as the gene of every variant record found inside the region.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Dissolve, Getters)]
pub struct Region {
    contig: String,
    interval: Interval,
    label: String,
}

impl Region {
    pub fn new(contig: String, interval: Interval, label: String) -> Result<Self> {
        ensure!(!contig.is_empty(), "Region contig can't be empty");
        ensure!(!label.is_empty(), "Region label can't be empty");
        Ok(Self {
            contig,
            interval,
            label,
        })
    }

    /// Check whether a 1-based position on the given contig falls inside the region.
    pub fn covers(&self, contig: &str, position: u64) -> bool {
        self.contig == contig && self.interval.contains_1based(position)
    }

    /// samtools-style region string: `contig:start-end`, 1-based and fully closed.
    pub fn to_samtools(&self) -> String {
        let (start, end) = self.interval.as_1based_closed();
        format!("{}:{}-{}", self.contig, start, end)
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{} ({})",
            self.contig,
            self.interval.start(),
            self.interval.end(),
            self.label
        )
    }
}
