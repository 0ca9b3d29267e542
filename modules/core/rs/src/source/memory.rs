use std::sync::Arc;

use eyre::Result;

use crate::loc::Region;
use crate::pileup::PileupLine;

use super::source::{PileupIter, Source};

/// Source backed by pileup lines kept in memory. Clones share the same lines.
#[derive(Clone, Debug, Default)]
pub struct InMemory {
    tag: String,
    lines: Arc<Vec<PileupLine>>,
}

impl InMemory {
    pub fn new(tag: impl Into<String>, lines: Vec<PileupLine>) -> Self {
        Self {
            tag: tag.into(),
            lines: Arc::new(lines),
        }
    }
}

impl Source for InMemory {
    fn describe(&self) -> String {
        format!("in-memory pileup '{}'", self.tag)
    }

    fn fetch<'borrow>(&'borrow mut self, region: &Region) -> Result<PileupIter<'borrow>> {
        let region = region.clone();
        let iter = self
            .lines
            .iter()
            .filter(move |line| region.covers(line.contig(), *line.position()))
            .map(|line| Ok(line.clone()));
        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loc::Interval;

    #[test]
    fn test_in_memory_fetch_filters_by_region() -> Result<()> {
        let lines = vec![
            PileupLine::new("chr1".into(), 10, b'A', 3, "...".into()),
            PileupLine::new("chr1".into(), 11, b'C', 3, ".,T".into()),
            PileupLine::new("chr1".into(), 21, b'G', 1, ".".into()),
            PileupLine::new("chr2".into(), 11, b'T', 1, ".".into()),
        ];
        let mut source = InMemory::new("test", lines).boxed();

        let region = Region::new("chr1".into(), Interval::new(10, 20)?, "GENE".into())?;
        let fetched = source.fetch(&region)?.collect::<Result<Vec<_>>>()?;
        assert_eq!(fetched.len(), 1);
        assert_eq!(*fetched[0].position(), 11);

        // Clones are independent handles to the same data
        let mut clone = dyn_clone::clone_box(&*source);
        assert_eq!(clone.fetch(&region)?.count(), 1);
        Ok(())
    }
}
