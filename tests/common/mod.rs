//! Shared fixtures for the export tests.
#![allow(dead_code)]

use std::io::Cursor;
#[cfg(any(feature = "docx", feature = "epub", feature = "bundle"))]
use std::io::Read;

use chrono::NaiveDate;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use lifebook::{Book, Metadata, Story};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Date every fixture book is pinned to.
pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
}

pub fn book(metadata: Metadata, stories: Vec<Story>) -> Book {
    Book::new(metadata, stories).unwrap().with_date(date())
}

/// Three stories in sessions A, A, B.
pub fn grouped_book(metadata: Metadata) -> Book {
    book(
        metadata,
        vec![
            Story::new("First question?", "First answer.", "A"),
            Story::new("Second question?", "Second answer.", "A"),
            Story::new("Third question?", "Third answer.", "B"),
        ],
    )
}

/// Encode a small solid image.
pub fn sample_image(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([30u8, 90, 160]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut out, format).unwrap();
    out.into_inner()
}

#[cfg(any(feature = "docx", feature = "epub", feature = "bundle"))]
pub fn zip_names(data: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[cfg(any(feature = "docx", feature = "epub", feature = "bundle"))]
pub fn zip_entry(data: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut out = Vec::new();
    entry.read_to_end(&mut out).unwrap();
    out
}

#[cfg(any(feature = "docx", feature = "epub", feature = "bundle"))]
pub fn zip_text(data: &[u8], name: &str) -> String {
    String::from_utf8(zip_entry(data, name)).unwrap()
}

/// Text of every paragraph in a WordprocessingML body, with its style.
pub fn docx_paragraphs(document: &str) -> Vec<(Option<String>, String)> {
    let mut reader = Reader::from_str(document);
    let mut paragraphs = Vec::new();
    let mut style: Option<String> = None;
    let mut text = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:p" => {
                style = None;
                text.clear();
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:pStyle" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"w:val" {
                        style = Some(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Text(e)) if in_text => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(e)) if in_text => {
                let raw: &[u8] = e.as_ref();
                let resolved = match raw {
                    b"amp" => "&",
                    b"lt" => "<",
                    b"gt" => ">",
                    b"quot" => "\"",
                    b"apos" => "'",
                    _ => "",
                };
                text.push_str(resolved);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:t" => in_text = false,
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                paragraphs.push((style.take(), std::mem::take(&mut text)));
            }
            Ok(Event::Eof) => break,
            Err(e) => panic!("invalid document.xml: {e}"),
            _ => {}
        }
    }
    paragraphs
}

/// Whether `xml` contains a control character XML 1.0 forbids.
pub fn has_forbidden_controls(xml: &str) -> bool {
    xml.chars()
        .any(|c| c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r'))
}

/// Paragraph texts with the given style, in document order.
pub fn docx_styled(document: &str, wanted: &str) -> Vec<String> {
    docx_paragraphs(document)
        .into_iter()
        .filter(|(style, _)| style.as_deref() == Some(wanted))
        .map(|(_, text)| text)
        .collect()
}
