//! Export file handle, plain or gzip-compressed.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

/// The byte stream a measurement writes its CSV rows into.  Both variants
/// receive identical bytes; only the on-disk encoding differs.
pub enum ExportSink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl ExportSink {
    /// Open `path`, truncating it unless `append` is set.
    pub fn open(path: &Path, compressed: bool, append: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        let out = BufWriter::new(file);
        Ok(if compressed {
            ExportSink::Gzip(GzEncoder::new(out, Compression::default()))
        } else {
            ExportSink::Plain(out)
        })
    }

    /// Flush everything and write the gzip trailer.
    pub fn close(self) -> io::Result<()> {
        match self {
            ExportSink::Plain(mut out) => out.flush(),
            ExportSink::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for ExportSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ExportSink::Plain(out) => out.write(buf),
            ExportSink::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ExportSink::Plain(out) => out.flush(),
            ExportSink::Gzip(encoder) => encoder.flush(),
        }
    }
}
