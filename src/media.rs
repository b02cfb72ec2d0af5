//! Image validation for covers and story pictures.
//!
//! Every image is fully decoded once before it is placed in a document. An
//! image that fails is logged and left out; it never fails the export.

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::book::{Book, StoryImage};

/// A decoded, known-good image.
#[derive(Debug, Clone)]
pub struct Picture {
    /// Original encoded bytes.
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl Picture {
    /// Validate raw image bytes.
    pub fn decode(data: &[u8]) -> image::ImageResult<Self> {
        let format = image::guess_format(data)?;
        let decoded = image::load_from_memory_with_format(data, format)?;
        let (width, height) = decoded.dimensions();
        Ok(Self {
            data: data.to_vec(),
            format,
            width,
            height,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "jpg",
            other => other.extensions_str().first().copied().unwrap_or("img"),
        }
    }

    /// Height matching `width` while keeping the aspect ratio.
    pub fn height_for(&self, width: f32) -> f32 {
        if self.width == 0 {
            return 0.0;
        }
        width * self.height as f32 / self.width as f32
    }

    /// Decode again for pixel access.
    pub fn pixels(&self) -> image::ImageResult<DynamicImage> {
        image::load_from_memory_with_format(&self.data, self.format)
    }
}

/// The cover picture, when one was uploaded and it decodes.
pub fn cover(book: &Book) -> Option<Picture> {
    let data = book.cover()?;
    match Picture::decode(data) {
        Ok(picture) => Some(picture),
        Err(err) => {
            tracing::warn!(error = %err, "skipping cover image that does not decode");
            None
        }
    }
}

/// Decode one story image, logging and returning `None` on failure.
pub fn load(image: &StoryImage, story: usize, index: usize) -> Option<Picture> {
    let Some(data) = image.source.bytes() else {
        tracing::warn!(story, index, "skipping image with invalid base64 payload");
        return None;
    };
    match Picture::decode(&data) {
        Ok(picture) => Some(picture),
        Err(err) => {
            tracing::warn!(story, index, error = %err, "skipping image that does not decode");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, Rgb};

    use super::*;

    /// Encode a small solid image for tests.
    pub(crate) fn sample_image(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 120, 40]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, format)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let data = sample_image(ImageFormat::Png, 8, 4);
        let picture = Picture::decode(&data).unwrap();
        assert_eq!((picture.width, picture.height), (8, 4));
        assert_eq!(picture.mime_type(), "image/png");
        assert_eq!(picture.extension(), "png");
        assert_eq!(picture.height_for(100.0), 50.0);
    }

    #[test]
    fn test_decode_jpeg_extension() {
        let data = sample_image(ImageFormat::Jpeg, 4, 4);
        let picture = Picture::decode(&data).unwrap();
        assert_eq!(picture.extension(), "jpg");
        assert_eq!(picture.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_decode_webp() {
        let data = sample_image(ImageFormat::WebP, 6, 3);
        let picture = Picture::decode(&data).unwrap();
        assert_eq!(picture.format, ImageFormat::WebP);
        assert_eq!((picture.width, picture.height), (6, 3));
        assert_eq!(picture.mime_type(), "image/webp");
        assert_eq!(picture.extension(), "webp");
    }

    #[test]
    fn test_corrupted_image_is_rejected() {
        assert!(Picture::decode(b"definitely not an image").is_err());

        let mut truncated = sample_image(ImageFormat::Png, 16, 16);
        truncated.truncate(40);
        assert!(Picture::decode(&truncated).is_err());
    }

    #[test]
    fn test_load_skips_bad_base64() {
        let image = StoryImage::from_base64("%%%", "caption");
        assert!(load(&image, 0, 0).is_none());
    }
}
