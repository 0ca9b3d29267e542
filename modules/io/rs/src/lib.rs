pub mod annotation;
pub mod compression;
pub mod pileup;
pub mod regions;
mod traits;
pub mod vcf;

pub use traits::{ReadRecord, WriteRecord};
