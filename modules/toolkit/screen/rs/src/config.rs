use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::{ensure, Result};

use varsieve_core_rs::source::Source;
use varsieve_io_rs::pileup::{MpileupCommand, PileupFile};

/// Screening settings shared by all samples.
#[derive(Clone, PartialEq, Eq, Debug, Constructor, Dissolve, Getters)]
pub struct Config {
    // Requested number of threads, see `parallelism::available`
    threads: isize,
    // samtools mpileup settings, ignored for precomputed pileups
    samtools: PathBuf,
    reference: Option<PathBuf>,
    min_base_quality: Option<u8>,
    min_mapping_quality: Option<u8>,
    max_depth: Option<u32>,
    timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 1,
            samtools: PathBuf::from(MpileupCommand::DEFAULT_PROGRAM),
            reference: None,
            min_base_quality: None,
            min_mapping_quality: None,
            max_depth: None,
            timeout: None,
        }
    }
}

impl Config {
    pub fn is_alignment(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|x| x.to_str()),
            Some("bam" | "cram")
        )
    }

    /// Pileup source for a sample: BAM/CRAM files are piled up with samtools, anything else is
    /// treated as a precomputed mpileup text file.
    pub fn source(&self, path: impl AsRef<Path>) -> Result<Box<dyn Source>> {
        let path = path.as_ref();
        if !Self::is_alignment(path) {
            return Ok(PileupFile::new(path)?.boxed());
        }

        ensure!(
            path.is_file(),
            "Alignment file {} does not exist",
            path.display()
        );
        let reference = match &self.reference {
            Some(reference) => reference,
            None => eyre::bail!(
                "Reference genome is required to pile up {}",
                path.display()
            ),
        };

        let mut command = MpileupCommand::new(path)
            .with_program(&self.samtools)
            .with_reference(reference);
        if let Some(quality) = self.min_base_quality {
            command = command.with_min_base_quality(quality);
        }
        if let Some(quality) = self.min_mapping_quality {
            command = command.with_min_mapping_quality(quality);
        }
        if let Some(depth) = self.max_depth {
            command = command.with_max_depth(depth);
        }
        if let Some(timeout) = self.timeout {
            command = command.with_timeout(timeout);
        }
        Ok(command.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_selection() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let bam = dir.path().join("S1.bam");
        let pileup = dir.path().join("S2.pileup");
        std::fs::write(&bam, b"")?;
        std::fs::write(&pileup, b"")?;

        let config = Config::default();
        assert!(config.source(&pileup)?.describe().starts_with("pileup file"));

        // Reference is mandatory for alignments
        assert!(config.source(&bam).is_err());

        let config = Config::new(
            2,
            "samtools".into(),
            Some(dir.path().join("ref.fa")),
            Some(13),
            None,
            Some(1000),
            Some(Duration::from_secs(60)),
        );
        assert!(config.source(&bam)?.describe().starts_with("samtools mpileup"));
        assert!(config.source(dir.path().join("missing.cram")).is_err());
        assert!(config.source(dir.path().join("missing.pileup")).is_err());
        Ok(())
    }
}
