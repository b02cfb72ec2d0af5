//! # lifebook
//!
//! Turns a life-story manuscript (answered prompts grouped into sessions) into
//! finished book files.
//!
//! ## Features
//!
//! - DOCX, HTML, EPUB 3, PDF and RTF output from one [`Book`]
//! - ZIP bundle with the HTML page and every picture as a file
//! - Interview, biography and narrative layouts
//! - Broken images are skipped and logged, never fatal
//! - Deterministic output for a fixed date
//!
//! ## Quick Start
//!
//! ```no_run
//! use lifebook::{Book, FormatStyle, Metadata, Story};
//! use lifebook::export::{Format, export};
//!
//! let metadata = Metadata::new("My Life")
//!     .with_author("Jane Doe")
//!     .with_style(FormatStyle::Interview);
//! let stories = vec![
//!     Story::new("Where were you born?", "<p>In a small town.</p>", "Early Years"),
//!     Story::new("Who were your friends?", "Tom and Ana.", "Early Years"),
//! ];
//! let book = Book::new(metadata, stories)?;
//!
//! let result = export(&book, Format::Docx)?;
//! std::fs::write(&result.filename, &result.data)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Rich text
//!
//! Answers may contain editor markup. Every generator runs it through
//! [`clean_text`] first:
//!
//! ```
//! assert_eq!(lifebook::clean_text("<p>Hello <b>World</b></p>"), "Hello World");
//! assert_eq!(lifebook::util::slugify("Early Years"), "early-years");
//! ```

pub mod book;
pub mod error;
pub mod export;
pub mod media;
pub mod util;

pub use book::{
    Book, CoverChoice, DEFAULT_SESSION_TITLE, FormatStyle, ImageSource, Metadata, Section, Story,
    StoryImage,
};
pub use error::{Error, Result};
pub use export::{ExportResult, Exporter, Format, export, generate_html, generate_rtf};
pub use util::clean_text;

#[cfg(feature = "docx")]
pub use export::generate_docx;
#[cfg(feature = "epub")]
pub use export::generate_epub;
#[cfg(feature = "pdf")]
pub use export::generate_pdf;
#[cfg(feature = "bundle")]
pub use export::generate_zip;
