//! Export module for writing books to various formats.
//!
//! Provides the `Exporter` trait and format-specific implementations.
//!
//! # Architecture
//!
//! Every exporter follows the same builder pattern:
//! - `new()` creates an exporter with default configuration
//! - `with_config()` allows customization
//! - `export()` writes to any `Write + Seek` destination
//!
//! The `generate_*` functions wrap the default exporters and return the whole
//! document in memory, which is what a download button needs.
//!
//! # Example
//!
//! ```no_run
//! use lifebook::{Book, Metadata, Story};
//! use lifebook::export::{Format, export};
//!
//! let book = Book::new(
//!     Metadata::new("My Story").with_author("Jane Doe"),
//!     vec![Story::new("Where were you born?", "Springfield.", "Early Years")],
//! )?;
//! let result = export(&book, Format::Html)?;
//! std::fs::write(&result.filename, &result.data)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use std::str::FromStr;

use crate::book::Book;
use crate::error::{Error, Result};

#[cfg(feature = "bundle")]
mod bundle;
#[cfg(feature = "docx")]
mod docx;
#[cfg(feature = "epub")]
mod epub;
mod html;
#[cfg(any(feature = "docx", feature = "epub", feature = "bundle"))]
mod package;
#[cfg(feature = "pdf")]
mod pdf;
mod rtf;

#[cfg(feature = "bundle")]
pub use bundle::{BundleConfig, BundleExporter, generate_zip};
#[cfg(feature = "docx")]
pub use docx::{DocxConfig, DocxExporter, generate_docx};
#[cfg(feature = "epub")]
pub use epub::{EpubConfig, EpubExporter, generate_epub};
pub use html::{HtmlExporter, generate_html};
#[cfg(feature = "pdf")]
pub use pdf::{PdfConfig, PdfExporter, generate_pdf};
pub use rtf::{RtfExporter, generate_rtf};

/// Trait for exporting books to specific formats.
///
/// Exporters hold their configuration, and the `export` method writes to any
/// `Write + Seek` destination:
/// - `std::fs::File` for disk output
/// - `std::io::Cursor<Vec<u8>>` for in-memory output
pub trait Exporter {
    /// Export the book to the provided writer.
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()>;

    /// Export the book into a fresh buffer.
    fn to_bytes(&self, book: &Book) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.export(book, &mut cursor)?;
        Ok(cursor.into_inner())
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Output formats a book can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Docx,
    Html,
    Epub,
    Pdf,
    Rtf,
    /// HTML plus an `images/` folder in one archive.
    Zip,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Docx,
        Format::Html,
        Format::Epub,
        Format::Pdf,
        Format::Rtf,
        Format::Zip,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Docx => "docx",
            Format::Html => "html",
            Format::Epub => "epub",
            Format::Pdf => "pdf",
            Format::Rtf => "rtf",
            Format::Zip => "zip",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Format::Html => "text/html",
            Format::Epub => "application/epub+zip",
            Format::Pdf => "application/pdf",
            Format::Rtf => "application/rtf",
            Format::Zip => "application/zip",
        }
    }

    /// Display name used in messages.
    pub fn name(self) -> &'static str {
        match self {
            Format::Docx => "DOCX",
            Format::Html => "HTML",
            Format::Epub => "EPUB",
            Format::Pdf => "PDF",
            Format::Rtf => "RTF",
            Format::Zip => "ZIP",
        }
    }

    /// Guess the format from a file name's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        ext.parse().ok()
    }

    /// Cargo feature that compiles this format in, if it has one.
    fn feature(self) -> Option<&'static str> {
        match self {
            Format::Docx => Some("docx"),
            Format::Epub => Some("epub"),
            Format::Pdf => Some("pdf"),
            Format::Zip => Some("bundle"),
            Format::Html | Format::Rtf => None,
        }
    }

    fn unavailable(self) -> Error {
        Error::Unavailable {
            format: self.name(),
            feature: self.feature().unwrap_or_default(),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "docx" => Ok(Format::Docx),
            "html" | "htm" => Ok(Format::Html),
            "epub" => Ok(Format::Epub),
            "pdf" => Ok(Format::Pdf),
            "rtf" => Ok(Format::Rtf),
            "zip" => Ok(Format::Zip),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// One-call export
// ============================================================================

/// A finished document plus how to offer it for download.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime_type: &'static str,
}

/// Export `book` with the default settings for `format`.
pub fn export(book: &Book, format: Format) -> Result<ExportResult> {
    tracing::debug!(
        %format,
        stories = book.stories().len(),
        style = %book.metadata().format_style,
        "exporting book"
    );

    let data = match format {
        Format::Html => generate_html(book).into_bytes(),
        Format::Rtf => generate_rtf(book),
        #[cfg(feature = "docx")]
        Format::Docx => generate_docx(book)?,
        #[cfg(feature = "epub")]
        Format::Epub => generate_epub(book)?,
        #[cfg(feature = "pdf")]
        Format::Pdf => generate_pdf(book)?,
        #[cfg(feature = "bundle")]
        Format::Zip => generate_zip(book)?,
        #[allow(unreachable_patterns)]
        other => return Err(other.unavailable()),
    };

    Ok(ExportResult {
        data,
        filename: book.filename(format.extension()),
        mime_type: format.mime_type(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("out/My_Story.docx"), Some(Format::Docx));
        assert_eq!(Format::from_path("book.HTM"), Some(Format::Html));
        assert_eq!(Format::from_path("book.mobi"), None);
        assert_eq!(Format::from_path("README"), None);
    }

    #[test]
    fn test_format_parse_and_mime() {
        assert_eq!(".epub".parse::<Format>().unwrap(), Format::Epub);
        assert!("odt".parse::<Format>().is_err());
        assert_eq!(Format::Rtf.mime_type(), "application/rtf");
        assert_eq!(Format::Zip.extension(), "zip");
        assert_eq!(
            Format::Docx.mime_type(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
    }

    #[test]
    fn test_unavailable_names_feature() {
        match Format::Pdf.unavailable() {
            Error::Unavailable { format, feature } => {
                assert_eq!(format, "PDF");
                assert_eq!(feature, "pdf");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
