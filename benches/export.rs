//! Benchmarks for the format generators.
//!
//! Run with: cargo bench

use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, criterion_group, criterion_main};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

use lifebook::export::{Exporter, PdfConfig, PdfExporter};
use lifebook::{
    Book, Metadata, Story, StoryImage, clean_text, generate_docx, generate_epub, generate_html,
    generate_pdf, generate_rtf, generate_zip,
};

/// Twelve sessions of five stories, every third story with a picture.
fn sample_book() -> Book {
    let picture = {
        let img = ImageBuffer::from_fn(320, 240, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    };

    let answer = "<p>We lived by the river, and every summer the whole family \
                  gathered at my grandmother&#39;s house.</p><p>The kitchen smelled \
                  of bread &amp; smoke.</p>"
        .repeat(4);

    let mut stories = Vec::new();
    for session in 0..12 {
        for n in 0..5 {
            let mut story = Story::new(
                format!("<b>Question {n}</b> of session {session}?"),
                answer.clone(),
                format!("Session {session}"),
            );
            if n % 3 == 0 {
                story = story.with_image(StoryImage::from_bytes(picture.clone(), "By the river"));
            }
            stories.push(story);
        }
    }

    Book::new(Metadata::new("Benchmark Memoir").with_author("A. Writer"), stories).unwrap()
}

// ============================================================================
// Sanitizer
// ============================================================================

fn bench_clean_text(c: &mut Criterion) {
    let markup = "<p>Hello <b>World</b> &amp; friends</p><div>Second&nbsp;line</div>".repeat(50);
    c.bench_function("clean_text", |b| {
        b.iter(|| clean_text(black_box(&markup)));
    });
}

// ============================================================================
// Generators
// ============================================================================

fn bench_generators(c: &mut Criterion) {
    let book = sample_book();
    let mut group = c.benchmark_group("generate");

    group.bench_function("html", |b| b.iter(|| generate_html(black_box(&book))));
    group.bench_function("rtf", |b| b.iter(|| generate_rtf(black_box(&book))));
    group.bench_function("docx", |b| b.iter(|| generate_docx(black_box(&book)).unwrap()));
    group.bench_function("epub", |b| b.iter(|| generate_epub(black_box(&book)).unwrap()));
    group.bench_function("pdf", |b| b.iter(|| generate_pdf(black_box(&book)).unwrap()));
    group.bench_function("zip", |b| b.iter(|| generate_zip(black_box(&book)).unwrap()));

    let uncompressed = PdfExporter::new().with_config(PdfConfig {
        compress: false,
        ..Default::default()
    });
    group.bench_function("pdf_uncompressed", |b| {
        b.iter(|| uncompressed.to_bytes(black_box(&book)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_clean_text, bench_generators);
criterion_main!(benches);
