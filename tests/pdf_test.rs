#![cfg(feature = "pdf")]

mod common;

use image::ImageFormat;
use lifebook::export::{Exporter, PdfConfig, PdfExporter};
use lifebook::{Book, FormatStyle, Metadata, Story, StoryImage, generate_pdf};

use common::{book, grouped_book, sample_image};

/// Uncompressed output so content streams can be searched.
fn plain_pdf(book: &Book) -> Vec<u8> {
    let config = PdfConfig {
        compress: false,
        ..Default::default()
    };
    PdfExporter::new().with_config(config).to_bytes(book).unwrap()
}

fn text(pdf: &[u8]) -> String {
    String::from_utf8_lossy(pdf).into_owned()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn test_document_structure() {
    let pdf = generate_pdf(&grouped_book(Metadata::new("P").with_author("Jane"))).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.4"));
    assert!(pdf.ends_with(b"%%EOF\n"));

    let body = text(&pdf);
    let start = body.rfind("startxref\n").unwrap() + "startxref\n".len();
    let offset: usize = body[start..].lines().next().unwrap().parse().unwrap();
    assert!(pdf[offset..].starts_with(b"xref"));
    assert!(body.contains("/BaseFont /Helvetica-Bold"));
    assert!(body.contains("/Author (Jane)"));
}

#[test]
fn test_grouping_emits_two_headings_in_order() {
    let pdf = text(&plain_pdf(&grouped_book(Metadata::new("P").with_toc(false))));
    assert_eq!(pdf.matches("(A) Tj").count(), 1);
    assert_eq!(pdf.matches("(B) Tj").count(), 1);

    let a = pdf.find("(A) Tj").unwrap();
    let second = pdf.find("(Second answer.) Tj").unwrap();
    let b = pdf.find("(B) Tj").unwrap();
    assert!(a < second && second < b);
}

#[test]
fn test_contents_page_lists_sessions() {
    let pdf = text(&plain_pdf(&grouped_book(Metadata::new("P"))));
    assert!(pdf.contains("(Table of Contents) Tj"));
    // WinAnsi bullet, octal escaped
    assert!(pdf.contains("(\\225 A) Tj"));
}

#[test]
fn test_questions_follow_style() {
    let pdf = text(&plain_pdf(&grouped_book(Metadata::new("P"))));
    let question = pdf.find("(First question?) Tj").unwrap();
    assert!(question < pdf.find("(First answer.) Tj").unwrap());

    let biography = grouped_book(Metadata::new("P").with_style(FormatStyle::Biography));
    let pdf = text(&plain_pdf(&biography));
    assert!(!pdf.contains("First question?"));
    assert!(pdf.contains("(First answer.) Tj"));
}

#[test]
fn test_line_breaks_in_single_line_text_separate_words() {
    let book = book(
        Metadata::new("P"),
        vec![Story::new("Where were<br>you born?", "Here.", "Early Years")
            .with_image(StoryImage::from_bytes(sample_image(ImageFormat::Png, 2, 2), "Mom<br>and me"))],
    );
    let pdf = text(&plain_pdf(&book));
    assert!(pdf.contains("(Where were you born?) Tj"));
    assert!(pdf.contains("(Mom and me) Tj"));
    assert!(!pdf.contains("wereyou"));
}

#[test]
fn test_unrepresentable_characters_are_dropped() {
    let book = book(
        Metadata::new("P"),
        vec![Story::new("", "Hello \u{4e2d}\u{6587} caf\u{e9} (world)", "S")],
    );
    let pdf = text(&plain_pdf(&book));
    assert!(pdf.contains("(Hello caf\\351 \\(world\\)) Tj"));
}

#[test]
fn test_uploaded_cover_embedded_verbatim() {
    let jpeg = sample_image(ImageFormat::Jpeg, 12, 18);
    let stories = vec![Story::new("Q", "A", "S")];

    let pdf = generate_pdf(&book(Metadata::new("P").with_cover(jpeg.clone()), stories.clone())).unwrap();
    assert!(contains(&pdf, &jpeg));
    assert!(contains(&pdf, b"/Filter /DCTDecode"));

    let pdf = generate_pdf(&book(Metadata::new("P"), stories)).unwrap();
    assert!(!contains(&pdf, b"/Subtype /Image"));
}

#[test]
fn test_corrupted_image_skipped_later_images_kept() {
    let png = sample_image(ImageFormat::Png, 6, 6);
    let book = book(
        Metadata::new("P"),
        vec![
            Story::new("Q", "A", "S")
                .with_image(StoryImage::from_bytes(b"GIF89a broken".to_vec(), "bad"))
                .with_image(StoryImage::from_bytes(png, "good")),
        ],
    );
    let pdf = text(&plain_pdf(&book));
    assert_eq!(pdf.matches("/Subtype /Image").count(), 1);
    assert!(pdf.contains("/Im0 Do"));
    assert!(pdf.contains("(good) Tj"));
    assert!(!pdf.contains("(bad) Tj"));
}

#[test]
fn test_long_story_spans_pages() {
    let answer = "All work and no play makes a long memoir. ".repeat(300);
    let book = book(Metadata::new("P"), vec![Story::new("", answer, "S")]);
    let pdf = text(&plain_pdf(&book));
    // cover, copyright, contents, and several body pages
    assert!(pdf.matches("/Type /Page ").count() > 5);
}

#[test]
fn test_pdf_is_deterministic() {
    let make = || grouped_book(Metadata::new("Same").with_author("Me"));
    assert_eq!(generate_pdf(&make()).unwrap(), generate_pdf(&make()).unwrap());
}
