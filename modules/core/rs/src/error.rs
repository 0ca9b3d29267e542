use derive_more::{Display, Error};

/// Failures with a well-defined meaning for the screening pipeline. They travel inside
/// `eyre::Report` and can be recovered with `report.downcast_ref::<Error>()`.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
pub enum Error {
    /// A line of the region catalog can't be turned into a region. Aborts the run.
    #[display("Malformed region at line {line}: {reason}")]
    MalformedRegion { line: usize, reason: String },

    /// A row of the annotation table can't be parsed. Aborts the run.
    #[display("Malformed annotation at line {line}: {reason}")]
    MalformedAnnotation { line: usize, reason: String },

    /// A pileup line or its base-call string can't be fully consumed.
    #[display("Malformed pileup: {reason}")]
    MalformedPileup { reason: String },

    /// The pileup producer failed, timed out or was cancelled.
    #[display("Pileup source failure: {reason}")]
    SourceFailure { reason: String },

    /// Decoded evidence contradicts the reported depth, e.g. more alternative observations
    /// than reads covering the position.
    #[display("Internal consistency violation: {reason}")]
    InternalConsistency { reason: String },
}

impl Error {
    pub fn malformed_pileup(reason: impl Into<String>) -> Self {
        Error::MalformedPileup {
            reason: reason.into(),
        }
    }

    pub fn source_failure(reason: impl Into<String>) -> Self {
        Error::SourceFailure {
            reason: reason.into(),
        }
    }

    pub fn internal_consistency(reason: impl Into<String>) -> Self {
        Error::InternalConsistency {
            reason: reason.into(),
        }
    }

    /// Check whether the report was caused by the given kind of error.
    pub fn is(report: &eyre::Report, predicate: impl Fn(&Error) -> bool) -> bool {
        report.downcast_ref::<Error>().is_some_and(predicate)
    }
}
