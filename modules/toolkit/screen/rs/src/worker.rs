use std::collections::hash_map::Entry;
use std::time::Instant;

use ahash::HashMap;
use eyre::{OptionExt, Result};

use varsieve_core_rs::error::Error;
use varsieve_core_rs::loc::Region;
use varsieve_core_rs::source::Source;
use varsieve_core_rs::VariantRecord;

use crate::aggregate::aggregate;
use crate::decode::{decode_into, Tally};
use crate::lookup::Lookup;
use crate::record::build;
use crate::report::{SampleReportAssembler, Screened};
use crate::result::{Outcome, Stats};

#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    positions: usize,
    records: usize,
    dropped: usize,
}

#[derive(Debug, Default)]
pub struct Worker {
    // (Sample id, region id) -> records and statistics
    accumulator: HashMap<(usize, usize), (Vec<VariantRecord>, Stats)>,
    // Decoding buffer reused between pileup lines
    tally: Tally,
}

impl Worker {
    pub fn reset(&mut self) {
        self.accumulator.clear();
    }

    /// Screen a single region of a single sample. Failures of the region are recorded in its
    /// statistics, only bookkeeping errors are propagated.
    pub fn process(
        &mut self,
        smplind: usize,
        source: &mut dyn Source,
        rgnind: usize,
        region: &Region,
        lookup: &Lookup,
    ) -> Result<()> {
        let entry = match self.accumulator.entry((smplind, rgnind)) {
            Entry::Occupied(_) => eyre::bail!(
                "Worker already contains results for sample {smplind} and region {rgnind}. This is a bug."
            ),
            Entry::Vacant(entry) => entry,
        };

        let launched_at = Instant::now();
        let mut counters = Counters::default();
        let (records, outcome) =
            match Self::screen(&mut self.tally, source, region, lookup, &mut counters) {
                Ok(records) if counters.positions == 0 => {
                    log::warn!("{} produced no pileup for {}", source.describe(), region);
                    (records, Outcome::Empty)
                }
                Ok(records) => (records, Outcome::Completed),
                Err(err) => {
                    log::warn!(
                        "Skipping {} for {}: {:#}",
                        region,
                        source.describe(),
                        err
                    );
                    counters.records = 0;
                    (Vec::new(), Outcome::Skipped(format!("{err:#}")))
                }
            };

        let stats = Stats::new(
            region.label().clone(),
            region.contig().clone(),
            *region.interval(),
            counters.positions,
            counters.records,
            counters.dropped,
            launched_at.elapsed().as_secs_f64(),
            outcome,
        );
        entry.insert((records, stats));
        Ok(())
    }

    fn screen(
        tally: &mut Tally,
        source: &mut dyn Source,
        region: &Region,
        lookup: &Lookup,
        counters: &mut Counters,
    ) -> Result<Vec<VariantRecord>> {
        let mut records = Vec::new();
        for line in source.fetch(region)? {
            let line = line?;
            counters.positions += 1;

            decode_into(line.bases(), *line.reference(), tally)?;
            let record = aggregate(tally, *line.depth()).and_then(|aggregated| match aggregated {
                None => Ok(None),
                Some(aggregated) => {
                    let (alleles, reference_depth) = aggregated.dissolve();
                    build(
                        line.contig(),
                        *line.position(),
                        *line.reference(),
                        alleles,
                        reference_depth,
                        *line.depth(),
                        region.label(),
                        lookup,
                    )
                }
            });

            match record {
                Ok(Some(record)) => {
                    records.push(record);
                    counters.records += 1;
                }
                Ok(None) => {}
                Err(err) if Error::is(&err, |e| matches!(e, Error::InternalConsistency { .. })) => {
                    log::error!(
                        "Dropping {}:{} ({}): {}",
                        line.contig(),
                        line.position(),
                        region.label(),
                        err
                    );
                    counters.dropped += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(records)
    }

    /// Merge results of all workers into per-sample reports.
    pub fn aggregate<'a>(
        samples: Vec<String>,
        regions: usize,
        workers: impl Iterator<Item = &'a mut Self>,
    ) -> Result<Vec<Screened>> {
        let mut assemblers: Vec<_> = samples
            .into_iter()
            .map(|sample| SampleReportAssembler::new(sample, regions))
            .collect();

        for worker in workers {
            for ((smplind, rgnind), (records, stats)) in worker.accumulator.drain() {
                assemblers
                    .get_mut(smplind)
                    .ok_or_eyre("Worker reported results for an unknown sample. This is a bug.")?
                    .add(rgnind, records, stats)?;
            }
        }

        assemblers.into_iter().map(|x| x.finalize()).collect()
    }
}
