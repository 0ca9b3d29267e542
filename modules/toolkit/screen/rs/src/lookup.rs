use std::path::Path;

use ahash::HashMap;
use eyre::Result;

use varsieve_io_rs::annotation::{self, Annotation};

pub const UNKNOWN_ID: &str = ".";
pub const UNKNOWN_SIGNIFICANCE: &str = "Unknown";

/// Read-only index of curated variants keyed by (contig, position, reference, alternate).
/// It's built once before screening and shared between all workers.
#[derive(Clone, Debug, Default)]
pub struct Lookup {
    // contig -> position -> annotations at the position
    index: HashMap<String, HashMap<u64, Vec<Annotation>>>,
    size: usize,
}

impl Lookup {
    pub fn new(annotations: impl IntoIterator<Item = Annotation>) -> Self {
        let mut lookup = Self::default();
        for annotation in annotations {
            lookup.insert(annotation);
        }
        lookup
    }

    /// Load the annotation table if provided, otherwise every query resolves to defaults.
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => Ok(Self::new(annotation::load(path)?)),
        }
    }

    // Duplicated keys are resolved in favor of the last inserted annotation
    fn insert(&mut self, annotation: Annotation) {
        let bucket = self
            .index
            .entry(annotation.contig().clone())
            .or_default()
            .entry(*annotation.position())
            .or_default();

        match bucket.iter_mut().find(|x| {
            x.reference().eq_ignore_ascii_case(annotation.reference())
                && x.alternate().eq_ignore_ascii_case(annotation.alternate())
        }) {
            Some(existing) => *existing = annotation,
            None => {
                bucket.push(annotation);
                self.size += 1;
            }
        }
    }

    /// Case-insensitive query of a single allele.
    pub fn get(
        &self,
        contig: &str,
        position: u64,
        reference: &str,
        alternate: &str,
    ) -> Option<&Annotation> {
        self.index
            .get(contig)?
            .get(&position)?
            .iter()
            .find(|x| {
                x.reference().eq_ignore_ascii_case(reference)
                    && x.alternate().eq_ignore_ascii_case(alternate)
            })
    }

    /// (id, significance) of the allele, falling back to `.` and `Unknown`.
    pub fn resolve(
        &self,
        contig: &str,
        position: u64,
        reference: &str,
        alternate: &str,
    ) -> (&str, &str) {
        match self.get(contig, position, reference, alternate) {
            Some(annotation) => (annotation.id().as_str(), annotation.significance().as_str()),
            None => (UNKNOWN_ID, UNKNOWN_SIGNIFICANCE),
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn annotation(
        contig: &str,
        position: u64,
        reference: &str,
        alternate: &str,
        id: &str,
        significance: &str,
    ) -> Annotation {
        Annotation::new(
            contig.into(),
            position,
            reference.into(),
            alternate.into(),
            id.into(),
            significance.into(),
        )
    }

    #[test]
    fn test_empty_lookup() -> Result<()> {
        let lookup = Lookup::load(None::<&Path>)?;
        assert!(lookup.is_empty());
        assert_eq!(
            lookup.resolve("chr12", 120291839, "T", "TA"),
            (UNKNOWN_ID, UNKNOWN_SIGNIFICANCE)
        );
        Ok(())
    }

    #[test]
    fn test_lookup_resolution() {
        let lookup = Lookup::new([
            annotation("chr12", 120291839, "T", "TA", "rs2499959771", "Pathogenic"),
            annotation("chr12", 120291839, "T", "C", "rs1", "Benign"),
            // Last write wins
            annotation("chr12", 120291839, "T", "C", "rs2", "Likely benign"),
            annotation("chr1", 10, "A", "<DEL>", "rs3", "Uncertain"),
        ]);
        assert_eq!(lookup.len(), 3);

        for (contig, position, reference, alternate, expected) in [
            ("chr12", 120291839, "T", "TA", ("rs2499959771", "Pathogenic")),
            ("chr12", 120291839, "t", "ta", ("rs2499959771", "Pathogenic")),
            ("chr12", 120291839, "T", "C", ("rs2", "Likely benign")),
            ("chr12", 120291839, "T", "G", (".", "Unknown")),
            ("chr12", 120291840, "T", "TA", (".", "Unknown")),
            ("chr2", 120291839, "T", "TA", (".", "Unknown")),
            ("chr1", 10, "A", "<del>", ("rs3", "Uncertain")),
        ] {
            assert_eq!(
                lookup.resolve(contig, position, reference, alternate),
                expected,
                "{contig}:{position} {reference}>{alternate}"
            );
        }
    }

    #[test]
    fn test_load_lookup() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "chrom\tpos\tref\talt\tid\tsignificance")?;
        writeln!(file, "chr12\t120291839\tT\tTA\trs2499959771\tPathogenic")?;
        file.flush()?;

        let lookup = Lookup::load(Some(file.path()))?;
        assert_eq!(lookup.len(), 1);
        assert_eq!(
            lookup.resolve("chr12", 120291839, "T", "TA"),
            ("rs2499959771", "Pathogenic")
        );
        Ok(())
    }
}
