use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use noodles::bgzf;

pub enum DecompressedStream {
    PlainText(File),
    // BGZF is a valid multi-member gzip stream and is decoded here as well
    Gzip(MultiGzDecoder<File>),
}

impl DecompressedStream {
    pub fn box_read(self) -> Box<dyn Read + Send + Sync + 'static> {
        match self {
            DecompressedStream::PlainText(file) => Box::new(file),
            DecompressedStream::Gzip(decoder) => Box::new(decoder),
        }
    }

    pub fn box_bufread(self) -> Box<dyn BufRead + Send + Sync + 'static> {
        match self {
            DecompressedStream::PlainText(file) => Box::new(BufReader::new(file)),
            DecompressedStream::Gzip(decoder) => Box::new(BufReader::new(decoder)),
        }
    }
}

/// Open a file for reading, transparently decompressing it if the file signature says gzip.
pub fn read_file(path: impl AsRef<Path>) -> Result<DecompressedStream> {
    let path = path.as_ref();
    ensure!(path.exists(), "File {} does not exist", path.display());

    let kind = infer::get_from_path(path)
        .wrap_err_with(|| format!("Failed to inspect {}", path.display()))?;
    let file = File::open(path)?;

    let stream = match kind.map(|x| (x.extension(), x.mime_type())) {
        Some(("gz", "application/gzip")) => DecompressedStream::Gzip(MultiGzDecoder::new(file)),
        // Always assume plain text if there is no clear match
        _ => DecompressedStream::PlainText(file),
    };
    Ok(stream)
}

/// Output compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bgzf,
}

impl Compression {
    pub fn infer_from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext {
                "gz" | "gzip" => Compression::Gzip,
                "bgz" | "bgzf" => Compression::Bgzf,
                _ => Compression::None,
            })
            .unwrap_or(Compression::None)
    }

    /// File extension appended to outputs written with this compression (without the dot).
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gz"),
            Compression::Bgzf => Some("bgz"),
        }
    }

    pub fn wrap<W: Write>(&self, inner: W) -> CompressedWriter<W> {
        match self {
            Compression::None => CompressedWriter::PlainText(inner),
            Compression::Gzip => {
                CompressedWriter::Gzip(GzEncoder::new(inner, flate2::Compression::default()))
            }
            Compression::Bgzf => CompressedWriter::Bgzf(bgzf::io::Writer::new(inner)),
        }
    }
}

/// Output stream with optional compression. Must be closed with [`CompressedWriter::finish`]:
/// encoders write their trailers on drop and swallow any error there.
pub enum CompressedWriter<W: Write> {
    PlainText(W),
    Gzip(GzEncoder<W>),
    Bgzf(bgzf::io::Writer<W>),
}

impl<W: Write> CompressedWriter<W> {
    /// Write the gzip trailer or the BGZF EOF block, flush and return the inner writer.
    pub fn finish(self) -> Result<W> {
        let mut inner = match self {
            CompressedWriter::PlainText(inner) => inner,
            CompressedWriter::Gzip(encoder) => encoder.finish()?,
            CompressedWriter::Bgzf(writer) => writer.finish()?,
        };
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> Write for CompressedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            CompressedWriter::PlainText(inner) => inner.write(buf),
            CompressedWriter::Gzip(encoder) => encoder.write(buf),
            CompressedWriter::Bgzf(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            CompressedWriter::PlainText(inner) => inner.flush(),
            CompressedWriter::Gzip(encoder) => encoder.flush(),
            CompressedWriter::Bgzf(writer) => writer.flush(),
        }
    }
}

pub type FileWriter = CompressedWriter<BufWriter<File>>;

/// Create (or truncate) a file and wrap it with the requested compression.
pub fn create_file(path: impl AsRef<Path>, compression: Compression) -> Result<FileWriter> {
    let path = path.as_ref();
    let file =
        File::create(path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    Ok(compression.wrap(BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_roundtrip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let content = "chr1\t10\tA\t2\t.,\tII\n";

        for compression in [Compression::None, Compression::Gzip, Compression::Bgzf] {
            let path = dir.path().join(format!("{compression:?}.txt"));
            let mut writer = create_file(&path, compression)?;
            writer.write_all(content.as_bytes())?;
            writer.finish()?;

            let mut decoded = String::new();
            read_file(&path)?.box_read().read_to_string(&mut decoded)?;
            assert_eq!(decoded, content, "{compression:?}");
        }
        Ok(())
    }

    #[test]
    fn test_finish_writes_trailers() -> Result<()> {
        let content = b"##fileformat=VCFv4.2\n";

        let mut gzip = Compression::Gzip.wrap(Vec::new());
        gzip.write_all(content)?;
        let gzip = gzip.finish()?;
        // ISIZE: length of the uncompressed member
        assert_eq!(gzip[gzip.len() - 4..], (content.len() as u32).to_le_bytes());

        let mut bgzf = Compression::Bgzf.wrap(Vec::new());
        bgzf.write_all(content)?;
        let bgzf = bgzf.finish()?;
        // Empty EOF block
        let eof = &bgzf[bgzf.len() - 28..];
        assert_eq!(eof[..4], [0x1f, 0x8b, 0x08, 0x04]);
        assert_eq!(eof[24..], [0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_finish_reports_io_errors() {
        struct Full;

        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        for compression in [Compression::None, Compression::Gzip, Compression::Bgzf] {
            let mut writer = compression.wrap(BufWriter::new(Full));
            // Small writes are buffered, the error surfaces when the stream is closed
            let _ = writer.write_all(b"chr1\t10\n");
            assert!(writer.finish().is_err(), "{compression:?}");
        }
    }

    #[test]
    fn test_compression_from_path() {
        for (path, expected) in [
            ("sample.vcf", Compression::None),
            ("sample.vcf.gz", Compression::Gzip),
            ("sample.vcf.bgz", Compression::Bgzf),
            ("sample", Compression::None),
        ] {
            assert_eq!(Compression::infer_from_path(path), expected);
        }
    }
}
