pub use memory::InMemory;
pub use source::{PileupIter, Source};

mod memory;
#[allow(clippy::module_inception)]
mod source;
