use std::io::BufRead;
use std::path::Path;

use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::{Result, WrapErr};

use varsieve_core_rs::error::Error;

use crate::compression;
use crate::traits::ReadRecord;

/// A curated known variant: (contig, position, reference, alternate) -> (id, significance).
/// Reference and alternate alleles are stored uppercased.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Constructor, Dissolve, Getters)]
pub struct Annotation {
    contig: String,
    // 1-based
    position: u64,
    reference: String,
    alternate: String,
    id: String,
    significance: String,
}

fn parse(line: &str) -> std::result::Result<Annotation, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 6 {
        return Err(format!(
            "expected 6 tab-separated fields, got {}",
            fields.len()
        ));
    }

    let position = fields[1]
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("position is not a non-negative integer: '{}'", fields[1]))?;

    Ok(Annotation {
        contig: fields[0].to_owned(),
        position,
        reference: fields[2].to_ascii_uppercase(),
        alternate: fields[3].to_ascii_uppercase(),
        id: fields[4].to_owned(),
        significance: fields[5].to_owned(),
    })
}

/// Reader for the annotation table. The first line is always treated as a header.
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
    type Record = Annotation;

    fn read_record(&mut self, into: &mut Annotation) -> Result<bool> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(false);
            }
            self.line += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if self.line == 1 || line.trim().is_empty() {
                continue;
            }

            *into = parse(line).map_err(|reason| Error::MalformedAnnotation {
                line: self.line,
                reason,
            })?;
            return Ok(true);
        }
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<Vec<Annotation>> {
    let path = path.as_ref();
    let mut annotations = Vec::new();
    Reader::new(compression::read_file(path)?.box_bufread())
        .read_to_end(&mut annotations)
        .wrap_err_with(|| format!("Failed to load annotations from {}", path.display()))?;

    log::info!(
        "Loaded {} annotation rows from {}",
        annotations.len(),
        path.display()
    );
    Ok(annotations)
}
