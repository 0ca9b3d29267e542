use dyn_clone::DynClone;
use eyre::Result;
use impl_tools::autoimpl;

use crate::loc::Region;
use crate::pileup::PileupLine;

pub type PileupIter<'borrow> = Box<dyn Iterator<Item = Result<PileupLine>> + Send + 'borrow>;

/// Producer of pileup lines for a single sample.
///
/// Every pool thread works with its own clone of the source, therefore implementations must be
/// cheap to clone and must not share mutable state between clones. Fetching a region may fail
/// or yield nothing at all, both are handled by the caller for that region only.
#[autoimpl(for<T: trait + ?Sized> Box<T> where Box<T>: Clone)]
pub trait Source: DynClone + Send + Sync {
    /// Short human-readable description used in logs (e.g. the underlying file path).
    fn describe(&self) -> String;

    /// Fetch pileup lines covering the region in the order produced by the underlying tool.
    fn fetch<'borrow>(&'borrow mut self, region: &Region) -> Result<PileupIter<'borrow>>;

    fn boxed(self) -> Box<dyn Source>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

dyn_clone::clone_trait_object!(Source);
