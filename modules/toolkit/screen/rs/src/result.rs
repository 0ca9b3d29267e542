use derive_getters::{Dissolve, Getters};
use derive_more::{Constructor, Display};

use varsieve_core_rs::loc::Interval;

#[derive(Clone, PartialEq, Eq, Debug, Default, Display)]
pub enum Outcome {
    // At least one pileup line was processed
    #[default]
    #[display("completed")]
    Completed,
    // The source produced no pileup lines for the region
    #[display("empty")]
    Empty,
    // The region was abandoned, none of its records are reported
    #[display("skipped ({_0})")]
    Skipped(String),
}

#[derive(Clone, PartialEq, Debug, Default, Constructor, Dissolve, Getters)]
pub struct Stats {
    // Processed region
    label: String,
    contig: String,
    interval: Interval,
    // Pileup lines seen, records emitted and positions dropped due to inconsistent depths
    positions: usize,
    records: usize,
    dropped: usize,
    // Time spent processing the region
    time_s: f64,
    outcome: Outcome,
}
