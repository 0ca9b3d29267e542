use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;

/// One mpileup row: all aligned reads covering a single reference position.
/// The base-call string is kept raw, decoding is left to the consumer.
#[derive(Clone, PartialEq, Eq, Debug, Default, Constructor, Dissolve, Getters)]
pub struct PileupLine {
    contig: String,
    // 1-based, as reported by samtools
    position: u64,
    reference: u8,
    depth: u32,
    bases: String,
}

impl PileupLine {
    /// Overwrite the line in-place, reusing the allocated buffers.
    pub fn set(&mut self, contig: &str, position: u64, reference: u8, depth: u32, bases: &str) {
        self.contig.clear();
        self.contig.push_str(contig);
        self.position = position;
        self.reference = reference;
        self.depth = depth;
        self.bases.clear();
        self.bases.push_str(bases);
    }
}
