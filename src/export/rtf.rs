//! RTF exporter.
//!
//! Builds the document as one control-word buffer. Text outside ASCII is
//! written as `\'hh` when Windows-1252 has it and as `\uN?` otherwise.

use std::fmt::Write as _;
use std::io::{Seek, Write};

use crate::book::Book;
use crate::error::Result;
use crate::util::{clean_text, paragraphs};

use super::Exporter;

/// RTF format exporter.
#[derive(Debug, Clone, Default)]
pub struct RtfExporter;

impl RtfExporter {
    pub fn new() -> Self {
        Self
    }

    /// Render the whole document as RTF text.
    pub fn render(&self, book: &Book) -> String {
        let meta = book.metadata();
        let mut rtf = String::new();

        rtf.push_str("{\\rtf1\\ansi\\ansicpg1252\\deff0\n");
        rtf.push_str("{\\fonttbl{\\f0\\froman\\fcharset0 Times New Roman;}}\n");
        let _ = writeln!(
            rtf,
            "{{\\info{{\\title {}}}{{\\author {}}}}}",
            escape(&meta.title),
            escape(&meta.author)
        );
        rtf.push_str("\\paperw12240\\paperh15840\\margl1440\\margr1440\\margt1440\\margb1440\n");

        // Title block
        let _ = writeln!(rtf, "\\pard\\qc\\sb2400\\sa480\\b\\fs56 {}\\b0\\par", escape(&meta.title));
        if !meta.author.trim().is_empty() {
            let _ = writeln!(
                rtf,
                "\\pard\\qc\\sa240\\i\\fs32 by {}\\i0\\par",
                escape(meta.author.trim())
            );
        }
        let _ = writeln!(
            rtf,
            "\\pard\\qc\\sb1200\\fs20 {}\\par",
            escape(&book.copyright_line())
        );
        rtf.push_str("\\page\n");

        if meta.include_toc {
            rtf.push_str("\\pard\\ql\\sa240\\b\\fs32 Table of Contents\\b0\\par\n");
            for title in book.session_titles() {
                let _ = writeln!(rtf, "\\pard\\li720\\fi-360\\fs24 \\bullet\\tab {}\\par", escape(title));
            }
            rtf.push_str("\\page\n");
        }

        for section in book.sections() {
            let _ = writeln!(
                rtf,
                "\\pard\\qc\\sb480\\sa240\\b\\fs36 {}\\b0\\par",
                escape(section.title)
            );
            for story in section.stories {
                if meta.format_style.shows_questions() {
                    let question = clean_text(&story.question);
                    if !question.is_empty() {
                        let _ = writeln!(
                            rtf,
                            "\\pard\\li360\\sb240\\sa120\\b\\fs24 {}\\b0\\par",
                            escape(&question)
                        );
                    }
                }
                for paragraph in paragraphs(&story.answer_text) {
                    let _ = writeln!(
                        rtf,
                        "\\pard\\fi720\\sa120\\fs24 {}\\par",
                        escape(&paragraph)
                    );
                }
            }
        }

        rtf.push_str("}\n");
        rtf
    }
}

impl Exporter for RtfExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        writer.write_all(self.render(book).as_bytes())?;
        Ok(())
    }
}

/// Render `book` as RTF bytes.
pub fn generate_rtf(book: &Book) -> Vec<u8> {
    RtfExporter::new().render(book).into_bytes()
}

/// Escape text for an RTF group.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\line "),
            '\t' => out.push_str("\\tab "),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c if c.is_ascii_control() => {}
            c => push_non_ascii(&mut out, c),
        }
    }
    out
}

fn push_non_ascii(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
    if !unmappable && bytes.len() == 1 {
        let _ = write!(out, "\\'{:02x}", bytes[0]);
        return;
    }

    // \uN takes a signed 16-bit value; astral characters need a surrogate pair.
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        let _ = write!(out, "\\u{}?", *unit as i16);
    }
}
