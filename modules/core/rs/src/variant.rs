use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::Result;

use crate::error::Error;

/// Sentinel symbol for reads with a deletion spanning the position.
pub const DELETION: &str = "<DEL>";

/// Alternative allele observed at a position.
#[derive(Clone, PartialEq, Debug, Constructor, Dissolve, Getters)]
pub struct Allele {
    symbol: String,
    depth: u32,
    // Rounded to 3 decimals
    fraction: f64,
}

/// A screened position with at least one alternative allele.
/// `ids`, `alleles` and `significances` are parallel: index `i` always refers to the same allele.
#[derive(Clone, PartialEq, Debug, Dissolve, Getters)]
pub struct VariantRecord {
    contig: String,
    // 1-based
    position: u64,
    ids: Vec<String>,
    reference: u8,
    alleles: Vec<Allele>,
    gene: String,
    significances: Vec<String>,
    reference_depth: u32,
    total_depth: u32,
}

impl VariantRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contig: String,
        position: u64,
        ids: Vec<String>,
        reference: u8,
        alleles: Vec<Allele>,
        gene: String,
        significances: Vec<String>,
        reference_depth: u32,
        total_depth: u32,
    ) -> Result<Self> {
        if alleles.is_empty() {
            return Err(Error::internal_consistency(format!(
                "variant record at {contig}:{position} has no alleles"
            ))
            .into());
        }
        if ids.len() != alleles.len() || significances.len() != alleles.len() {
            return Err(Error::internal_consistency(format!(
                "misaligned annotation columns at {contig}:{position}: {} alleles, {} ids, {} significances",
                alleles.len(),
                ids.len(),
                significances.len()
            ))
            .into());
        }
        let observed = alleles
            .iter()
            .fold(reference_depth as u64, |acc, x| acc + x.depth as u64);
        if observed != total_depth as u64 {
            return Err(Error::internal_consistency(format!(
                "depths at {contig}:{position} don't add up: {observed} observed vs {total_depth} total"
            ))
            .into());
        }

        Ok(Self {
            contig,
            position,
            ids,
            reference,
            alleles,
            gene,
            significances,
            reference_depth,
            total_depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allele(symbol: &str, depth: u32, fraction: f64) -> Allele {
        Allele::new(symbol.to_string(), depth, fraction)
    }

    #[test]
    fn test_variant_record_invariants() {
        let ok = VariantRecord::new(
            "chr1".into(),
            100,
            vec![".".into(), ".".into()],
            b'A',
            vec![allele("T", 2, 0.4), allele(DELETION, 1, 0.2)],
            "GENE".into(),
            vec!["Unknown".into(), "Unknown".into()],
            2,
            5,
        );
        assert!(ok.is_ok());
        assert_eq!(ok.unwrap().alleles()[1].symbol(), DELETION);

        // Depths don't add up
        let err = VariantRecord::new(
            "chr1".into(),
            100,
            vec![".".into()],
            b'A',
            vec![allele("T", 2, 0.4)],
            "GENE".into(),
            vec!["Unknown".into()],
            2,
            5,
        )
        .unwrap_err();
        assert!(Error::is(&err, |e| matches!(e, Error::InternalConsistency { .. })));

        // Misaligned columns
        assert!(VariantRecord::new(
            "chr1".into(),
            100,
            vec![],
            b'A',
            vec![allele("T", 2, 0.4)],
            "GENE".into(),
            vec!["Unknown".into()],
            3,
            5,
        )
        .is_err());
    }
}
