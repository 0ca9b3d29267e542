pub use pileup::PileupLine;
pub use variant::{Allele, VariantRecord, DELETION};

pub mod error;
pub mod loc;
pub mod parallelism;
mod pileup;
pub mod source;
mod variant;
