// Region catalog: BED-like, tab-separated, no header.
// 1. contig: non-empty, no whitespace
// 2. start: u64, 0-based inclusive
// 3. end: u64, 0-based exclusive, start < end
// 4. label: non-empty gene/locus name
// Extra columns (BED6, BED12) are ignored. Blank lines, `#` comments and `track`/`browser`
// header lines are skipped.

use std::io::BufRead;
use std::path::Path;

use eyre::{Result, WrapErr};

use varsieve_core_rs::error::Error;
use varsieve_core_rs::loc::{Interval, Region};

use crate::compression;
use crate::traits::ReadRecord;

pub mod parse {
    use super::*;

    /// Parse a single catalog line. The error is a plain message, the line number is
    /// attached by the reader.
    pub fn region(line: &str) -> std::result::Result<Region, String> {
        let mut parts = line.split('\t');
        let (contig, start, end, label) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(contig), Some(start), Some(end), Some(label)) => (contig, start, end, label),
                _ => {
                    return Err(format!(
                        "expected 4 tab-separated fields, got {}",
                        line.split('\t').count()
                    ))
                }
            };

        if contig.is_empty() || contig.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(format!("invalid contig name '{contig}'"));
        }
        let start = start
            .parse::<u64>()
            .map_err(|_| format!("start is not a non-negative integer: '{start}'"))?;
        let end = end
            .parse::<u64>()
            .map_err(|_| format!("end is not a non-negative integer: '{end}'"))?;
        if start >= end {
            return Err(format!("start ({start}) must be less than end ({end})"));
        }
        let label = label.trim();
        if label.is_empty() {
            return Err("label can't be empty".to_string());
        }

        let interval = Interval::new(start, end).map_err(|e| e.to_string())?;
        Region::new(contig.to_owned(), interval, label.to_owned()).map_err(|e| e.to_string())
    }

    pub fn is_skipped(line: &str) -> bool {
        line.trim().is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
    }
}

pub struct Reader<R> {
    reader: R,
    buffer: String,
    line: usize,
}

impl<R: BufRead> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            line: 0,
        }
    }
}

impl<R: BufRead> ReadRecord for Reader<R> {
    type Record = Region;

    fn read_record(&mut self, into: &mut Region) -> Result<bool> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(false);
            }
            self.line += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if parse::is_skipped(line) {
                continue;
            }

            *into = parse::region(line).map_err(|reason| Error::MalformedRegion {
                line: self.line,
                reason,
            })?;
            return Ok(true);
        }
    }
}

/// Load the whole region catalog. Any malformed line aborts the loading.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Region>> {
    let path = path.as_ref();
    let mut regions = Vec::new();
    Reader::new(compression::read_file(path)?.box_bufread())
        .read_to_end(&mut regions)
        .wrap_err_with(|| format!("Failed to load regions from {}", path.display()))?;

    log::info!("Loaded {} regions from {}", regions.len(), path.display());
    Ok(regions)
}
