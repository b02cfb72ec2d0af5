//! Thin ZIP writer shared by the DOCX, EPUB and bundle exporters.

use std::io::{self, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Default deflate level.
pub(crate) const DEFAULT_COMPRESSION: u32 = 6;

/// ZIP archive with fixed timestamps so identical input gives identical bytes.
pub(crate) struct Package<W: Write + Seek> {
    zip: ZipWriter<W>,
    stored: SimpleFileOptions,
    deflated: SimpleFileOptions,
}

impl<W: Write + Seek> Package<W> {
    pub(crate) fn new(writer: W, compression_level: u32) -> Self {
        let base = SimpleFileOptions::default().last_modified_time(DateTime::default());
        Self {
            zip: ZipWriter::new(writer),
            stored: base.compression_method(CompressionMethod::Stored),
            deflated: base
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(compression_level.min(9) as i64)),
        }
    }

    /// Add an uncompressed entry (EPUB `mimetype`).
    pub(crate) fn add_stored(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        self.zip.start_file(name, self.stored).map_err(io_error)?;
        self.zip.write_all(data)
    }

    pub(crate) fn add(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        self.zip.start_file(name, self.deflated).map_err(io_error)?;
        self.zip.write_all(data)
    }

    pub(crate) fn finish(self) -> io::Result<W> {
        self.zip.finish().map_err(io_error)
    }
}

/// Convert zip error to io error.
fn io_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::other(e)
}
