use std::io::Write;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use itertools::Itertools;

use varsieve_core_rs::VariantRecord;

use crate::compression::{self, Compression, FileWriter};
use crate::traits::WriteRecord;

const META: &[&str] = &[
    "##fileformat=VCFv4.2",
    concat!("##source=varsieve-", env!("CARGO_PKG_VERSION")),
    "##ALT=<ID=DEL,Description=\"Deletion spanning the position\">",
    "##INFO=<ID=GENE,Number=1,Type=String,Description=\"Label of the screened region\">",
    "##INFO=<ID=SIG,Number=A,Type=String,Description=\"Clinical significance of each alternative allele\">",
    "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">",
    "##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths for the ref and alt alleles\">",
    "##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read depth\">",
    "##FORMAT=<ID=AF,Number=A,Type=Float,Description=\"Allele fractions of the alt alleles\">",
];

/// Genotype calling is out of scope, every record is reported as heterozygous.
const GENOTYPE: &str = "0/1";

/// Minimal single-sample VCF writer. The header is written on construction.
pub struct Writer<W: Write> {
    writer: W,
    buffer: String,
}

impl<W: Write> Writer<W> {
    pub fn new(mut writer: W, sample: &str) -> Result<Self> {
        for line in META {
            writeln!(writer, "{line}")?;
        }
        writeln!(
            writer,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{sample}"
        )?;
        Ok(Self {
            writer,
            buffer: String::new(),
        })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl Writer<FileWriter> {
    /// Create `<outdir>/<sample>.vcf[.gz|.bgz]`.
    pub fn create(
        outdir: impl AsRef<Path>,
        sample: &str,
        compression: Compression,
    ) -> Result<(PathBuf, Self)> {
        let mut name = format!("{sample}.vcf");
        if let Some(extension) = compression.extension() {
            name.push('.');
            name.push_str(extension);
        }
        let path = outdir.as_ref().join(name);

        let writer = Self::new(compression::create_file(&path, compression)?, sample)
            .wrap_err_with(|| format!("Failed to write VCF header to {}", path.display()))?;
        Ok((path, writer))
    }

    /// Close the underlying file, writing compression trailers if any.
    pub fn finish(self) -> Result<()> {
        self.writer.finish()?;
        Ok(())
    }
}

/// Format a single data line (without the trailing newline).
pub fn format(record: &VariantRecord, into: &mut String) {
    use std::fmt::Write;

    into.clear();
    let alleles = record.alleles();
    // Writing into a String never fails
    let _ = write!(
        into,
        "{}\t{}\t{}\t{}\t{}\t.\tPASS\tGENE={};SIG={}\tGT:AD:DP:AF\t{}:{},{}:{}:{}",
        record.contig(),
        record.position(),
        record.ids().join(","),
        *record.reference() as char,
        alleles.iter().map(|x| x.symbol()).join(","),
        record.gene(),
        record.significances().join(","),
        GENOTYPE,
        record.reference_depth(),
        alleles.iter().map(|x| x.depth()).join(","),
        record.total_depth(),
        alleles.iter().map(|x| format!("{:.3}", x.fraction())).join(","),
    );
}

impl<W: Write> WriteRecord for Writer<W> {
    type Record = VariantRecord;

    fn write_record(&mut self, record: &VariantRecord) -> Result<()> {
        format(record, &mut self.buffer);
        self.buffer.push('\n');
        self.writer.write_all(self.buffer.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
