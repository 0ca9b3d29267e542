use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::Result;

use varsieve_core_rs::error::Error;
use varsieve_core_rs::Allele;

use crate::decode::Tally;

/// Alternative alleles of a position together with the number of reads supporting the reference.
#[derive(Clone, PartialEq, Debug, Constructor, Dissolve, Getters)]
pub struct Aggregated {
    alleles: Vec<Allele>,
    reference_depth: u32,
}

/// Round to 3 decimals, half away from zero. Fractions below 0.0005 become 0.0 while the allele
/// itself is still reported with its depth.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Turn a decoded tally into alleles with depths and fractions, keeping the tally order.
/// Returns `None` for uncovered positions and positions without alternative alleles.
pub fn aggregate(tally: &Tally, depth: u32) -> Result<Option<Aggregated>> {
    if depth == 0 || tally.is_empty() {
        return Ok(None);
    }

    let observed = tally.total();
    if observed > depth as u64 {
        return Err(Error::internal_consistency(format!(
            "{observed} alternative observations exceed the depth {depth}"
        ))
        .into());
    }

    let alleles = tally
        .iter()
        .map(|(symbol, count)| {
            Allele::new(symbol.to_string(), count, round3(count as f64 / depth as f64))
        })
        .collect();
    let reference_depth = depth - observed as u32;
    Ok(Some(Aggregated::new(alleles, reference_depth)))
}
