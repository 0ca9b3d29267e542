use eyre::Result;

use varsieve_core_rs::{Allele, VariantRecord};

use crate::lookup::Lookup;

/// Merge aggregated alleles of a position with the curated annotations.
/// Returns `None` when there is nothing to report at the position.
#[allow(clippy::too_many_arguments)]
pub fn build(
    contig: &str,
    position: u64,
    reference: u8,
    alleles: Vec<Allele>,
    reference_depth: u32,
    total_depth: u32,
    gene: &str,
    lookup: &Lookup,
) -> Result<Option<VariantRecord>> {
    if alleles.is_empty() {
        return Ok(None);
    }

    let reference = reference.to_ascii_uppercase();
    let refkey = (reference as char).to_string();

    let (ids, significances) = alleles
        .iter()
        .map(|allele| {
            let (id, significance) = lookup.resolve(contig, position, &refkey, allele.symbol());
            (id.to_owned(), significance.to_owned())
        })
        .unzip();

    let record = VariantRecord::new(
        contig.to_owned(),
        position,
        ids,
        reference,
        alleles,
        gene.to_owned(),
        significances,
        reference_depth,
        total_depth,
    )?;
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::OptionExt;
    use varsieve_core_rs::error::Error;
    use varsieve_io_rs::annotation::Annotation;

    fn alleles(entries: &[(&str, u32, f64)]) -> Vec<Allele> {
        entries
            .iter()
            .map(|(symbol, depth, fraction)| Allele::new(symbol.to_string(), *depth, *fraction))
            .collect()
    }

    #[test]
    fn test_build_without_alleles() -> Result<()> {
        let record = build("chr1", 10, b'A', vec![], 4, 4, "GENE", &Lookup::default())?;
        assert!(record.is_none());
        Ok(())
    }

    #[test]
    fn test_build_with_empty_lookup() -> Result<()> {
        let record = build(
            "chr1",
            10,
            b'a',
            alleles(&[("T", 2, 0.4), ("<DEL>", 1, 0.2)]),
            2,
            5,
            "GENE",
            &Lookup::default(),
        )?
        .ok_or_eyre("record expected")?;

        assert_eq!(record.ids(), &vec![".", "."]);
        assert_eq!(record.significances(), &vec!["Unknown", "Unknown"]);
        assert_eq!(*record.reference(), b'A');
        assert_eq!(record.gene(), "GENE");
        Ok(())
    }

    #[test]
    fn test_build_with_annotation() -> Result<()> {
        let lookup = Lookup::new([Annotation::new(
            "chr12".into(),
            120291839,
            "T".into(),
            "TA".into(),
            "rs2499959771".into(),
            "Pathogenic".into(),
        )]);

        let record = build(
            "chr12",
            120291839,
            b'T',
            alleles(&[("TA", 3, 0.3), ("C", 1, 0.1)]),
            6,
            10,
            "HNF1A",
            &lookup,
        )?
        .ok_or_eyre("record expected")?;

        assert_eq!(record.ids(), &vec!["rs2499959771", "."]);
        assert_eq!(record.significances(), &vec!["Pathogenic", "Unknown"]);
        assert_eq!(record.ids().len(), record.alleles().len());
        Ok(())
    }

    #[test]
    fn test_build_inconsistent() {
        let err = build(
            "chr1",
            10,
            b'A',
            alleles(&[("T", 3, 0.6)]),
            3,
            5,
            "GENE",
            &Lookup::default(),
        )
        .unwrap_err();
        assert!(Error::is(&err, |e| matches!(e, Error::InternalConsistency { .. })));
    }
}
