use std::io::BufRead;
use std::path::{Path, PathBuf};

use ahash::HashSet;
use eyre::{bail, ensure, Result, WrapErr};

use varsieve_io_rs::compression;

/// Parse a sample manifest: `name<TAB>path` per line. Relative paths are resolved against the
/// manifest directory, blank lines and `#` comments are skipped. Sample names become output file
/// names and can't contain path separators or `..`.
pub fn parse(reader: impl BufRead, basedir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut samples = Vec::new();
    let mut names = HashSet::default();

    for (ind, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let (name, path) = match line.split('\t').collect::<Vec<_>>()[..] {
            [name, path, ..] if !name.is_empty() && !path.is_empty() => (name, path),
            _ => bail!(
                "Malformed sample manifest at line {}: expected 'name<TAB>path', got '{}'",
                ind + 1,
                line
            ),
        };
        ensure!(
            !name.contains(['/', '\\']) && !name.contains(".."),
            "Invalid sample name '{}' at line {}: path separators and '..' are not allowed",
            name,
            ind + 1
        );
        ensure!(
            names.insert(name.to_owned()),
            "Duplicated sample name '{}' at line {}",
            name,
            ind + 1
        );

        let path = Path::new(path);
        let path = if path.is_relative() {
            basedir.join(path)
        } else {
            path.to_path_buf()
        };
        samples.push((name.to_owned(), path));
    }
    Ok(samples)
}

pub fn load(path: impl AsRef<Path>) -> Result<Vec<(String, PathBuf)>> {
    let path = path.as_ref();
    let basedir = path.parent().unwrap_or_else(|| Path::new(""));
    let samples = parse(compression::read_file(path)?.box_bufread(), basedir)
        .wrap_err_with(|| format!("Failed to load samples from {}", path.display()))?;
    log::info!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_manifest() -> Result<()> {
        let content = "\
# name\tpath
S1\tS1.bam

S2\t/data/S2.pileup.gz\textra\r
S3.rerun\t../S3.bam
";
        let samples = parse(Cursor::new(content), Path::new("/runs/batch1"))?;
        assert_eq!(
            samples,
            vec![
                ("S1".to_string(), PathBuf::from("/runs/batch1/S1.bam")),
                ("S2".to_string(), PathBuf::from("/data/S2.pileup.gz")),
                ("S3.rerun".to_string(), PathBuf::from("/runs/batch1/../S3.bam")),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_malformed_manifest() {
        for content in [
            "S1\n",
            "S1\t\n",
            "\tS1.bam\n",
            "S1\tS1.bam\nS1\tS1-rerun.bam\n",
            "../S1\tS1.bam\n",
            "runs/S1\tS1.bam\n",
            "runs\\S1\tS1.bam\n",
            "..\tS1.bam\n",
        ] {
            assert!(parse(Cursor::new(content), Path::new("")).is_err(), "{content:?}");
        }
    }
}
