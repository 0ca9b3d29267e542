use derive_getters::{Dissolve, Getters};
use eyre::{ensure, OptionExt, Result};

use varsieve_core_rs::VariantRecord;

use crate::result::{Outcome, Stats};

/// Ordered variant records of a single sample.
#[derive(Clone, PartialEq, Debug, Dissolve, Getters)]
pub struct SampleReport {
    sample: String,
    records: Vec<VariantRecord>,
}

/// Final result of a sample: the report (if there is anything to report) and per-region stats
/// in the catalog order.
#[derive(Clone, PartialEq, Debug, Dissolve, Getters)]
pub struct Screened {
    sample: String,
    report: Option<SampleReport>,
    stats: Vec<Stats>,
}

impl Screened {
    pub fn summary(&self) -> String {
        let (mut completed, mut empty, mut skipped) = (0, 0, 0);
        for stats in &self.stats {
            match stats.outcome() {
                Outcome::Completed => completed += 1,
                Outcome::Empty => empty += 1,
                Outcome::Skipped(_) => skipped += 1,
            }
        }
        let records = self.report.as_ref().map_or(0, |x| x.records.len());
        format!(
            "{}: {} records from {} regions ({} completed, {} empty, {} skipped)",
            self.sample,
            records,
            self.stats.len(),
            completed,
            empty,
            skipped
        )
    }
}

/// Collects per-region results of one sample. Regions may complete in any order, the catalog
/// order is restored on finalization.
#[derive(Clone, Debug)]
pub struct SampleReportAssembler {
    sample: String,
    regions: Vec<Option<(Vec<VariantRecord>, Stats)>>,
}

impl SampleReportAssembler {
    pub fn new(sample: String, regions: usize) -> Self {
        Self {
            sample,
            regions: vec![None; regions],
        }
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn add(&mut self, region: usize, records: Vec<VariantRecord>, stats: Stats) -> Result<()> {
        let slot = self.regions.get_mut(region).ok_or_eyre(format!(
            "Region index {region} is out of bounds for sample {}",
            self.sample
        ))?;
        ensure!(
            slot.is_none(),
            "Region {region} was reported twice for sample {}. This is a bug.",
            self.sample
        );
        *slot = Some((records, stats));
        Ok(())
    }

    pub fn finalize(self) -> Result<Screened> {
        let mut records = Vec::new();
        let mut stats = Vec::with_capacity(self.regions.len());
        for (ind, region) in self.regions.into_iter().enumerate() {
            let (region_records, region_stats) = region.ok_or_eyre(format!(
                "Region {ind} was never processed for sample {}. This is a bug.",
                self.sample
            ))?;
            records.extend(region_records);
            stats.push(region_stats);
        }

        let report = if records.is_empty() {
            None
        } else {
            Some(SampleReport {
                sample: self.sample.clone(),
                records,
            })
        };
        Ok(Screened {
            sample: self.sample,
            report,
            stats,
        })
    }
}
