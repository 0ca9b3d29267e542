use std::io::{BufRead, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use derive_getters::Getters;
use eyre::{OptionExt, Result, WrapErr};

use varsieve_core_rs::error::Error;
use varsieve_core_rs::loc::Region;
use varsieve_core_rs::source::{PileupIter, Source};
use varsieve_core_rs::PileupLine;

use crate::compression;
use crate::traits::ReadRecord;

/// Parse a single mpileup line into the provided record.
/// Columns: contig, position (1-based), reference base, depth, bases[, qualities, ...].
/// The base column may be absent when the depth is zero.
pub fn parse(line: &str, into: &mut PileupLine) -> Result<()> {
    let mut fields = [""; 5];
    let mut total = 0;
    let mut start = 0;
    for end in memchr::memchr_iter(b'\t', line.as_bytes()).chain(std::iter::once(line.len())) {
        if total == fields.len() {
            break;
        }
        fields[total] = &line[start..end];
        total += 1;
        start = end + 1;
    }

    let malformed = |reason: String| Error::malformed_pileup(format!("{reason} in line '{line}'"));
    if total < 4 {
        return Err(malformed(format!("expected at least 4 fields, got {total}")).into());
    }

    let [contig, position, reference, depth, bases] = fields;
    let position = position
        .parse::<u64>()
        .map_err(|_| malformed(format!("invalid position '{position}'")))?;
    let reference = match reference.as_bytes() {
        [base] => *base,
        _ => return Err(malformed(format!("invalid reference base '{reference}'")).into()),
    };
    let depth = depth
        .parse::<u32>()
        .map_err(|_| malformed(format!("invalid depth '{depth}'")))?;
    if total < 5 && depth > 0 {
        return Err(malformed("missing base column".to_string()).into());
    }

    into.set(contig, position, reference, depth, bases);
    Ok(())
}

pub struct Reader<R> {
    reader: R,
    buffer: String,
}

impl<R: BufRead> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
        }
    }

    /// Read the next non-empty line without parsing it.
    fn next_line(&mut self) -> Result<Option<&str>> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            let len = self.buffer.trim_end_matches(['\n', '\r']).len();
            if len > 0 {
                return Ok(Some(&self.buffer[..len]));
            }
        }
    }

    /// Iterate over lines that fall inside the region. Lines outside of it are skipped
    /// without being fully parsed.
    pub fn within(mut self, region: Region) -> impl Iterator<Item = Result<PileupLine>> {
        std::iter::from_fn(move || loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };

            let mut prefix = line.splitn(3, '\t');
            let covered = match (prefix.next(), prefix.next().map(str::parse::<u64>)) {
                (Some(contig), Some(Ok(position))) => region.covers(contig, position),
                // Let the full parser report the problem
                _ => true,
            };
            if !covered {
                continue;
            }

            let mut record = PileupLine::default();
            return Some(parse(line, &mut record).map(|_| record));
        })
    }

    pub fn records(self) -> impl Iterator<Item = Result<PileupLine>> {
        let mut reader = self;
        std::iter::from_fn(move || {
            let mut record = PileupLine::default();
            match reader.read_record(&mut record) {
                Ok(true) => Some(Ok(record)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            }
        })
    }
}

impl<R: BufRead> ReadRecord for Reader<R> {
    type Record = PileupLine;

    fn read_record(&mut self, into: &mut PileupLine) -> Result<bool> {
        match self.next_line()? {
            Some(line) => {
                parse(line, into)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Precomputed mpileup text file (plain or gzip). Every fetch rescans the file and keeps
/// only the lines inside the requested region.
#[derive(Clone, Debug, Getters)]
pub struct PileupFile {
    path: PathBuf,
}

impl PileupFile {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        eyre::ensure!(path.is_file(), "Pileup file {} does not exist", path.display());
        Ok(Self { path })
    }
}

impl Source for PileupFile {
    fn describe(&self) -> String {
        format!("pileup file {}", self.path.display())
    }

    fn fetch<'borrow>(&'borrow mut self, region: &Region) -> Result<PileupIter<'borrow>> {
        let stream = compression::read_file(&self.path)
            .map_err(|e| Error::source_failure(format!("{}: {e}", self.describe())))?;
        Ok(Box::new(
            Reader::new(stream.box_bufread()).within(region.clone()),
        ))
    }
}

/// `samtools mpileup` invoked once per region.
#[derive(Clone, Debug, Getters)]
pub struct MpileupCommand {
    program: PathBuf,
    alignments: PathBuf,
    reference: Option<PathBuf>,
    min_base_quality: Option<u8>,
    min_mapping_quality: Option<u8>,
    max_depth: Option<u32>,
    timeout: Option<Duration>,
}

impl MpileupCommand {
    pub const DEFAULT_PROGRAM: &'static str = "samtools";

    pub fn new(alignments: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from(Self::DEFAULT_PROGRAM),
            alignments: alignments.into(),
            reference: None,
            min_base_quality: None,
            min_mapping_quality: None,
            max_depth: None,
            timeout: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<PathBuf>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_min_base_quality(mut self, quality: u8) -> Self {
        self.min_base_quality = Some(quality);
        self
    }

    pub fn with_min_mapping_quality(mut self, quality: u8) -> Self {
        self.min_mapping_quality = Some(quality);
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn command(&self, region: &Region) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("mpileup").arg("-r").arg(region.to_samtools());
        if let Some(reference) = &self.reference {
            command.arg("-f").arg(reference);
        }
        if let Some(quality) = self.min_base_quality {
            command.arg("-Q").arg(quality.to_string());
        }
        if let Some(quality) = self.min_mapping_quality {
            command.arg("-q").arg(quality.to_string());
        }
        if let Some(depth) = self.max_depth {
            command.arg("-d").arg(depth.to_string());
        }
        command
            .arg(&self.alignments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    /// Run the command for the region and collect its stdout. The child is killed when it
    /// doesn't finish within the timeout.
    fn run(&self, region: &Region) -> Result<Vec<u8>> {
        let failure =
            |reason: String| Error::source_failure(format!("{}: {reason}", self.describe()));

        let mut child = self
            .command(region)
            .spawn()
            .map_err(|e| failure(format!("failed to start {}: {e}", self.program.display())))?;
        let mut stdout = child.stdout.take().ok_or_eyre("Child stdout is not captured")?;
        let mut stderr = child.stderr.take().ok_or_eyre("Child stderr is not captured")?;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            let result = stdout.read_to_end(&mut buffer).map(|_| buffer);
            // The receiver is gone if the command has already timed out
            let _ = tx.send(result);
        });
        let messages = std::thread::spawn(move || {
            let mut messages = String::new();
            let _ = stderr.read_to_string(&mut messages);
            messages
        });

        let received = match self.timeout {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(RecvTimeoutError::from),
        };
        let output = match received {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(failure(format!("failed to read the output: {e}")).into());
            }
            Err(RecvTimeoutError::Timeout) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(failure(format!(
                    "timed out after {:.1}s on {}",
                    self.timeout.unwrap_or_default().as_secs_f64(),
                    region
                ))
                .into());
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(failure("output reader terminated unexpectedly".to_string()).into());
            }
        };

        let status = child
            .wait()
            .wrap_err_with(|| format!("Failed to wait for {}", self.describe()))?;
        let messages = messages.join().unwrap_or_default();
        if !status.success() {
            return Err(failure(format!("exited with {status}: {}", messages.trim())).into());
        }
        if !messages.trim().is_empty() {
            log::debug!("{} on {}: {}", self.describe(), region, messages.trim());
        }
        Ok(output)
    }
}

impl Source for MpileupCommand {
    fn describe(&self) -> String {
        format!("samtools mpileup {}", self.alignments.display())
    }

    fn fetch<'borrow>(&'borrow mut self, region: &Region) -> Result<PileupIter<'borrow>> {
        let output = self.run(region)?;
        Ok(Box::new(Reader::new(Cursor::new(output)).records()))
    }
}

/// Read all lines of a pileup file, mostly useful for small inputs and tests.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<PileupLine>> {
    let path = path.as_ref();
    let mut lines = Vec::new();
    Reader::new(compression::read_file(path)?.box_bufread())
        .read_to_end(&mut lines)
        .wrap_err_with(|| format!("Failed to read pileup from {}", path.display()))?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use varsieve_core_rs::loc::Interval;

    fn region(contig: &str, start: u64, end: u64) -> Result<Region> {
        Region::new(contig.into(), Interval::new(start, end)?, "GENE".into())
    }

    #[test]
    fn test_parse() -> Result<()> {
        let mut record = PileupLine::default();
        for (line, expected) in [
            (
                "chr1\t10\tA\t5\t..T,T\tIIIII",
                PileupLine::new("chr1".into(), 10, b'A', 5, "..T,T".into()),
            ),
            (
                "chr12\t120291839\tt\t3\t^],$+2AT.*",
                PileupLine::new("chr12".into(), 120291839, b't', 3, "^],$+2AT.*".into()),
            ),
            (
                "chr2\t1\tN\t0",
                PileupLine::new("chr2".into(), 1, b'N', 0, "".into()),
            ),
            (
                "chr2\t1\tN\t0\t\t",
                PileupLine::new("chr2".into(), 1, b'N', 0, "".into()),
            ),
        ] {
            parse(line, &mut record)?;
            assert_eq!(record, expected, "{line}");
        }
        Ok(())
    }

    #[test]
    fn test_parse_malformed() {
        let mut record = PileupLine::default();
        for line in [
            "chr1\t10\tA",
            "chr1\tten\tA\t1\t.",
            "chr1\t10\tAC\t1\t.",
            "chr1\t10\t\t1\t.",
            "chr1\t10\tA\t-1\t.",
            "chr1\t10\tA\t3",
        ] {
            let err = parse(line, &mut record).unwrap_err();
            assert!(
                Error::is(&err, |e| matches!(e, Error::MalformedPileup { .. })),
                "{line}"
            );
        }
    }

    #[test]
    fn test_reader_within_region() -> Result<()> {
        let content = "\
chr1\t10\tA\t1\t.\tI
chr1\t11\tA\t1\t.\tI

chr1\t21\tC\t2\tTT\tII
chr2\t15\tG\t1\t,\tI
chr1\t22\tC\tbroken\tT\tI
";
        let positions = Reader::new(Cursor::new(content))
            .within(region("chr1", 10, 21)?)
            .map(|x| x.map(|line| *line.position()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(positions, vec![11, 21]);

        // Malformed lines are only reported when they fall inside the region
        let results = Reader::new(Cursor::new(content))
            .within(region("chr1", 20, 30)?)
            .collect::<Vec<_>>();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        Ok(())
    }

    #[test]
    fn test_pileup_file_source() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sample.pileup.gz");
        let mut writer = compression::create_file(&path, compression::Compression::Gzip)?;
        writer.write_all(b"chr1\t5\tA\t2\t.T\tII\n")?;
        writer.write_all(b"chr1\t6\tC\t1\t*\tI\nchr1\t50\tG\t1\tA\tI\n")?;
        writer.finish()?;

        let mut source = PileupFile::new(&path)?.boxed();
        let lines = source
            .fetch(&region("chr1", 0, 10)?)?
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].bases(), "*");

        // Sources are re-entrant: every fetch starts from scratch
        let lines = source
            .fetch(&region("chr1", 40, 60)?)?
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(lines.len(), 1);

        assert!(PileupFile::new(dir.path().join("missing.pileup")).is_err());
        assert_eq!(load(&path)?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_mpileup_command_line() -> Result<()> {
        let command = MpileupCommand::new("sample.bam")
            .with_reference("ref.fa")
            .with_min_base_quality(13)
            .with_min_mapping_quality(20)
            .with_max_depth(8000)
            .with_program("/opt/samtools");
        let command = command.command(&region("chr12", 100, 200)?);

        assert_eq!(command.get_program(), "/opt/samtools");
        let args = command
            .get_args()
            .map(|x| x.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            args,
            [
                "mpileup", "-r", "chr12:101-200", "-f", "ref.fa", "-Q", "13", "-q", "20", "-d",
                "8000", "sample.bam"
            ]
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_mpileup_command_execution() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let script = |name: &str, body: &str| -> Result<PathBuf> {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
            Ok(path)
        };
        let target = region("chr1", 0, 100)?;

        // Successful run
        let program = script("ok.sh", "printf 'chr1\\t11\\tA\\t2\\t.T\\tII\\n'")?;
        let mut source = MpileupCommand::new("sample.bam").with_program(program);
        let lines = source.fetch(&target)?.collect::<Result<Vec<_>>>()?;
        assert_eq!(
            lines,
            vec![PileupLine::new("chr1".into(), 11, b'A', 2, ".T".into())]
        );

        // Non-zero exit status
        let program = script("fail.sh", "echo 'no such file' >&2\nexit 3")?;
        let mut source = MpileupCommand::new("sample.bam").with_program(program);
        let err = source.fetch(&target).err().ok_or_eyre("expected a failure")?;
        assert!(Error::is(&err, |e| matches!(e, Error::SourceFailure { .. })));
        assert!(err.to_string().contains("no such file"));

        // Timeout
        let program = script("slow.sh", "exec sleep 10")?;
        let mut source = MpileupCommand::new("sample.bam")
            .with_program(program)
            .with_timeout(Duration::from_millis(200));
        let err = source.fetch(&target).err().ok_or_eyre("expected a timeout")?;
        assert!(Error::is(&err, |e| matches!(
            e,
            Error::SourceFailure { reason } if reason.contains("timed out")
        )));

        // Missing program
        let mut source =
            MpileupCommand::new("sample.bam").with_program(dir.path().join("missing"));
        let err = source.fetch(&target).err().ok_or_eyre("expected a spawn failure")?;
        assert!(Error::is(&err, |e| matches!(e, Error::SourceFailure { .. })));
        Ok(())
    }
}
