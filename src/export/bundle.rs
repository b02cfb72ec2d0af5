//! ZIP bundle exporter: the HTML page plus every story image as a file.

use std::io::{Cursor, Seek, Write};

use image::{DynamicImage, ImageFormat};

use crate::book::Book;
use crate::error::Result;
use crate::media::{self, Picture};
use crate::util::file_stem;

use super::Exporter;
use super::html::generate_html;
use super::package::{DEFAULT_COMPRESSION, Package};

/// Configuration for ZIP bundle export.
#[derive(Debug, Clone, Default)]
pub struct BundleConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
}

/// ZIP bundle exporter.
#[derive(Debug, Clone, Default)]
pub struct BundleExporter {
    config: BundleConfig,
}

impl BundleExporter {
    /// Create a new exporter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: BundleConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for BundleExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let level = self.config.compression_level.unwrap_or(DEFAULT_COMPRESSION);
        let mut zip = Package::new(writer, level);

        let page = format!("{}.html", file_stem(&book.metadata().title));
        zip.add(&page, generate_html(book).as_bytes())?;

        for (story_index, story) in book.stories().iter().enumerate() {
            for (image_index, image) in story.images.iter().enumerate() {
                let Some(picture) = media::load(image, story_index, image_index) else {
                    continue;
                };
                let Some(jpeg) = as_jpeg(&picture) else {
                    continue;
                };
                zip.add(&format!("images/image_{story_index}_{image_index}.jpg"), &jpeg)?;
            }
        }

        zip.finish()?;
        Ok(())
    }
}

/// JPEG bytes for a picture, re-encoding other formats.
fn as_jpeg(picture: &Picture) -> Option<Vec<u8>> {
    if picture.format == ImageFormat::Jpeg {
        return Some(picture.data.clone());
    }

    let rgb = match picture.pixels() {
        Ok(pixels) => DynamicImage::ImageRgb8(pixels.to_rgb8()),
        Err(err) => {
            tracing::warn!(error = %err, "skipping image that does not decode");
            return None;
        }
    };
    let mut out = Cursor::new(Vec::new());
    if let Err(err) = rgb.write_to(&mut out, ImageFormat::Jpeg) {
        tracing::warn!(error = %err, "skipping image that cannot be re-encoded");
        return None;
    }
    Some(out.into_inner())
}

/// Render `book` as a ZIP of its HTML page and images.
pub fn generate_zip(book: &Book) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    BundleExporter::new().export(book, &mut cursor)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::book::{Metadata, Story, StoryImage};
    use crate::media::tests::sample_image;

    fn entry_names(data: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_bundle_contains_page_and_images() {
        let jpeg = sample_image(ImageFormat::Jpeg, 6, 6);
        let png = sample_image(ImageFormat::Png, 6, 6);
        let stories = vec![
            Story::new("Q1", "A1", "One").with_image(StoryImage::from_bytes(jpeg.clone(), "first")),
            Story::new("Q2", "A2", "One")
                .with_image(StoryImage::from_bytes(b"broken".to_vec(), ""))
                .with_image(StoryImage::from_bytes(png, "png")),
        ];
        let book = Book::new(Metadata::new("Family Tales"), stories).unwrap();
        let data = generate_zip(&book).unwrap();

        let mut names = entry_names(&data);
        names.sort();
        assert_eq!(
            names,
            ["Family_Tales.html", "images/image_0_0.jpg", "images/image_1_1.jpg"]
        );

        let mut archive = zip::ZipArchive::new(Cursor::new(&data)).unwrap();
        let mut stored = Vec::new();
        archive
            .by_name("images/image_0_0.jpg")
            .unwrap()
            .read_to_end(&mut stored)
            .unwrap();
        assert_eq!(stored, jpeg);

        let mut converted = Vec::new();
        archive
            .by_name("images/image_1_1.jpg")
            .unwrap()
            .read_to_end(&mut converted)
            .unwrap();
        assert_eq!(image::guess_format(&converted).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_bundle_without_images() {
        let book = Book::new(Metadata::new("Plain"), vec![Story::new("Q", "A", "S")]).unwrap();
        assert_eq!(entry_names(&generate_zip(&book).unwrap()), ["Plain.html"]);
    }
}
