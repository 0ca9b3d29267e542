use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use varsieve_io_rs::compression::Compression;
use varsieve_screen_rs::Config;

#[derive(Parser)]
#[command(
    name = "varsieve",
    version,
    about = "Pileup-based mismatch screening of targeted genomic regions",
    long_about = None,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Screen samples for mismatches inside target regions")]
    Screen(ScreenArgs),
    #[clap(about = "Validate the region catalog and the annotation table")]
    Validate(ValidateArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Screen(_) => "screen",
            Command::Validate(_) => "validate",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputCompression {
    None,
    Gzip,
    Bgzf,
}

impl From<OutputCompression> for Compression {
    fn from(value: OutputCompression) -> Self {
        match value {
            OutputCompression::None => Compression::None,
            OutputCompression::Gzip => Compression::Gzip,
            OutputCompression::Bgzf => Compression::Bgzf,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ScreenArgs {
    #[clap(required = true)]
    #[clap(long = "regions")]
    #[clap(help = "Target regions: contig, start, end, label (tab-separated, 0-based)")]
    #[clap(value_name = "BED")]
    #[clap(value_parser = check_file_exists)]
    pub regions: PathBuf,

    #[clap(long = "annotation")]
    #[clap(help = "Known variants: contig, pos, ref, alt, id, significance (with header)")]
    #[clap(value_name = "TSV")]
    #[clap(value_parser = check_file_exists)]
    pub annotation: Option<PathBuf>,

    #[clap(required = true)]
    #[clap(long = "samples")]
    #[clap(help = "Sample manifest: name and BAM/CRAM/pileup path (tab-separated)")]
    #[clap(value_name = "TSV")]
    #[clap(value_parser = check_file_exists)]
    pub samples: PathBuf,

    #[clap(long = "reference")]
    #[clap(help = "Reference genome, required for BAM/CRAM inputs")]
    #[clap(value_name = "FASTA")]
    #[clap(value_parser = check_file_exists)]
    pub reference: Option<PathBuf>,

    #[clap(required = true)]
    #[clap(long = "outdir")]
    #[clap(help = "Output directory for per-sample VCF files")]
    #[clap(value_name = "DIR")]
    pub outdir: PathBuf,

    #[clap(long = "threads")]
    #[clap(help = "Number of threads, negative values mean all but N-1 cores")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[clap(allow_negative_numbers = true)]
    pub threads: isize,

    #[clap(long = "timeout")]
    #[clap(help = "Time limit for piling up a single region of a sample")]
    #[clap(value_name = "SECONDS")]
    #[clap(value_parser = check_positive)]
    pub timeout: Option<u64>,

    #[clap(long = "min-base-quality")]
    #[clap(help = "Skip bases with base quality below the threshold (samtools -Q)")]
    #[clap(value_name = "QUAL")]
    pub min_base_quality: Option<u8>,

    #[clap(long = "min-mapping-quality")]
    #[clap(help = "Skip reads with mapping quality below the threshold (samtools -q)")]
    #[clap(value_name = "QUAL")]
    pub min_mapping_quality: Option<u8>,

    #[clap(long = "max-depth")]
    #[clap(help = "Maximum per-file depth (samtools -d)")]
    #[clap(value_name = "DEPTH")]
    pub max_depth: Option<u32>,

    #[clap(long = "samtools")]
    #[clap(help = "Path to the samtools executable")]
    #[clap(value_name = "PATH")]
    #[clap(default_value = "samtools")]
    pub samtools: PathBuf,

    #[clap(long = "compression")]
    #[clap(help = "Compression of the output VCF files")]
    #[clap(value_enum, default_value_t = OutputCompression::None)]
    pub compression: OutputCompression,
}

impl ScreenArgs {
    pub fn config(&self) -> Config {
        Config::new(
            self.threads,
            self.samtools.clone(),
            self.reference.clone(),
            self.min_base_quality,
            self.min_mapping_quality,
            self.max_depth,
            self.timeout.map(Duration::from_secs),
        )
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    #[clap(required = true)]
    #[clap(long = "regions")]
    #[clap(help = "Target regions to validate")]
    #[clap(value_name = "BED")]
    #[clap(value_parser = check_file_exists)]
    pub regions: PathBuf,

    #[clap(long = "annotation")]
    #[clap(help = "Annotation table to validate")]
    #[clap(value_name = "TSV")]
    #[clap(value_parser = check_file_exists)]
    pub annotation: Option<PathBuf>,

    #[clap(long = "samples")]
    #[clap(help = "Sample manifest to validate")]
    #[clap(value_name = "TSV")]
    #[clap(value_parser = check_file_exists)]
    pub samples: Option<PathBuf>,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(format_log)
        .filter_level(filter_level)
        .init();
}

fn format_log(buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> std::io::Result<()> {
    let ts = buf.timestamp_seconds();
    writeln!(buf, "{ts} [{}] - {}", record.level(), record.args())
}

fn check_file_exists(s: &str) -> Result<PathBuf, String> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(format!("File does not exist: {}", path.display()));
    }
    Ok(path.to_path_buf())
}

fn check_positive(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("Expected a positive integer, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_parse_screen_args() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let regions = dir.path().join("regions.bed");
        let samples = dir.path().join("samples.tsv");
        std::fs::write(&regions, "chr1\t0\t10\tGENE\n")?;
        std::fs::write(&samples, "S1\tS1.pileup\n")?;

        let mut argv: Vec<OsString> = ["varsieve", "screen", "--regions"]
            .map(OsString::from)
            .into();
        argv.push(regions.into_os_string());
        argv.push("--samples".into());
        argv.push(samples.into_os_string());
        argv.push("--outdir".into());
        argv.push(dir.path().as_os_str().to_owned());
        for arg in ["--threads", "-2", "--timeout", "30", "--compression", "bgzf", "-vv"] {
            argv.push(arg.into());
        }

        let cli = Cli::try_parse_from(argv)?;
        assert_eq!(cli.verbosity, 2);

        let Command::Screen(args) = cli.command else {
            eyre::bail!("screen subcommand expected");
        };
        assert_eq!(args.compression, OutputCompression::Bgzf);
        let config = args.config();
        assert_eq!(*config.threads(), -2);
        assert_eq!(*config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.samtools(), &PathBuf::from("samtools"));
        assert!(config.reference().is_none());
        Ok(())
    }

    #[test]
    fn test_reject_invalid_args() {
        // Missing files
        assert!(Cli::try_parse_from([
            "varsieve",
            "screen",
            "--regions",
            "/nonexistent/regions.bed",
            "--samples",
            "/nonexistent/samples.tsv",
            "--outdir",
            "out"
        ])
        .is_err());
        assert!(check_positive("0").is_err());
        assert!(check_positive("-5").is_err());
        assert_eq!(check_positive("5"), Ok(5));
    }
}
