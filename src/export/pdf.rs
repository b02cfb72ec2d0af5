//! PDF exporter.
//!
//! Lays the book out page by page with the built-in Helvetica fonts, so no
//! font files are embedded. Text is encoded as WinAnsi (Windows-1252);
//! characters outside that set are dropped.

use std::fmt::Write as _;
use std::io::{Cursor, Seek, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::ImageFormat;

use crate::book::{Book, Story};
use crate::error::Result;
use crate::media::{self, Picture};
use crate::util::{clean_text, paragraphs};

use super::Exporter;

/// Configuration for PDF export. Lengths are in points (1/72 inch).
#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    /// Body text size.
    pub font_size: f32,
    /// Width of the cover picture.
    pub cover_width: f32,
    /// Maximum width of story pictures.
    pub image_width: f32,
    /// Deflate page content and pixel streams.
    pub compress: bool,
    /// Print a page number on the cover page too.
    pub number_first_page: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 72.0,
            font_size: 12.0,
            cover_width: 288.0,
            image_width: 324.0,
            compress: true,
            number_first_page: false,
        }
    }
}

/// PDF format exporter.
#[derive(Debug, Clone, Default)]
pub struct PdfExporter {
    config: PdfConfig,
}

impl PdfExporter {
    /// Create a new exporter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: PdfConfig) -> Self {
        self.config = config;
        self
    }

    /// Render the whole document.
    pub fn render(&self, book: &Book) -> Result<Vec<u8>> {
        let mut layout = Layout::new(&self.config);
        layout.cover_page(book);
        layout.copyright_page(book);
        if book.metadata().include_toc {
            layout.contents_page(book);
        }
        for section in book.sections() {
            layout.new_page();
            layout.heading(section.title);
            for (offset, story) in section.stories.iter().enumerate() {
                layout.story(book, story, section.start + offset);
            }
        }
        layout.number_pages();
        serialize(book, &self.config, layout)
    }
}

impl Exporter for PdfExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        writer.write_all(&self.render(book)?)?;
        Ok(())
    }
}

/// Render `book` as a PDF document.
pub fn generate_pdf(book: &Book) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    PdfExporter::new().export(book, &mut cursor)?;
    Ok(cursor.into_inner())
}

// ============================================================================
// Text encoding and metrics
// ============================================================================

/// Encode text as WinAnsi, dropping anything the encoding cannot represent.
fn to_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\t' | '\n' | '\r') {
            out.push(b' ');
        } else if c.is_ascii() {
            if !c.is_ascii_control() {
                out.push(c as u8);
            }
        } else {
            let mut buf = [0u8; 4];
            let (bytes, _, unmappable) =
                encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
            if !unmappable {
                out.extend_from_slice(&bytes);
            }
        }
    }
    out
}

/// Literal string syntax: `(` `)` `\` escaped, non-printable bytes as octal.
fn pdf_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out.push(')');
    out
}

/// Document-information string: plain ASCII literal, else UTF-16BE with a BOM.
fn text_string(text: &str) -> String {
    let text: String = text.chars().filter(|c| !c.is_control()).collect();
    if text.is_ascii() {
        return pdf_string(text.as_bytes());
    }
    let mut out = String::from("<FEFF");
    for unit in text.encode_utf16() {
        let _ = write!(out, "{unit:04X}");
    }
    out.push('>');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Oblique];

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Oblique => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Oblique => "Helvetica-Oblique",
        }
    }

    /// Advance width of a WinAnsi byte in 1/1000 em.
    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
            Font::Regular | Font::Oblique => &HELVETICA_WIDTHS,
        };
        match byte {
            32..=126 => table[(byte - 32) as usize],
            0xa0 => 278,
            // Latin-1 letters and symbols: close to the average lowercase width.
            _ if self == Font::Bold => 611,
            _ => 556,
        }
    }

    fn text_width(self, bytes: &[u8], size: f32) -> f32 {
        let units: u32 = bytes.iter().map(|&b| self.glyph_width(b) as u32).sum();
        units as f32 * size / 1000.0
    }
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

// ============================================================================
// Layout
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Justify,
}

#[derive(Default)]
struct Page {
    content: String,
    /// Indices into `Layout::images` drawn on this page.
    images: Vec<usize>,
}

struct Layout<'a> {
    config: &'a PdfConfig,
    pages: Vec<Page>,
    images: Vec<Picture>,
    /// Top of the free area on the current page.
    y: f32,
}

impl<'a> Layout<'a> {
    fn new(config: &'a PdfConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            images: Vec::new(),
            y: 0.0,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.config.page_height - self.config.margin;
    }

    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.new_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn text_width(&self) -> f32 {
        self.config.page_width - 2.0 * self.config.margin
    }

    fn bottom(&self) -> f32 {
        self.config.margin
    }

    /// Break the page when `height` does not fit below the cursor.
    fn ensure(&mut self, height: f32) {
        if self.pages.is_empty() || self.y - height < self.bottom() {
            self.new_page();
        }
    }

    fn space(&mut self, height: f32) {
        self.y -= height;
    }

    fn cover_page(&mut self, book: &Book) {
        let meta = book.metadata();
        self.new_page();

        match media::cover(book) {
            Some(cover) => {
                let max_height = self.config.page_height * 0.45;
                self.space(self.config.margin * 0.5);
                self.image(cover, self.config.cover_width, max_height);
                self.space(24.0);
            }
            None => self.y = self.config.page_height * 0.62,
        }

        self.paragraph(&meta.title, Font::Bold, 28.0, Align::Center, 0.0);
        self.space(12.0);
        if !meta.author.trim().is_empty() {
            let byline = format!("by {}", meta.author.trim());
            self.paragraph(&byline, Font::Oblique, 16.0, Align::Center, 0.0);
        }
    }

    fn copyright_page(&mut self, book: &Book) {
        self.new_page();
        self.y = self.config.page_height * 0.5;
        self.paragraph(&book.copyright_line(), Font::Regular, 10.0, Align::Center, 0.0);
    }

    fn contents_page(&mut self, book: &Book) {
        self.new_page();
        self.paragraph("Table of Contents", Font::Bold, 18.0, Align::Center, 0.0);
        self.space(18.0);
        for title in book.session_titles() {
            let entry = format!("\u{2022} {title}");
            self.paragraph(&entry, Font::Regular, self.config.font_size, Align::Left, 0.0);
        }
    }

    fn heading(&mut self, title: &str) {
        self.paragraph(title, Font::Bold, 16.0, Align::Center, 0.0);
        self.space(16.0);
    }

    fn story(&mut self, book: &Book, story: &Story, index: usize) {
        let meta = book.metadata();
        let size = self.config.font_size;

        if meta.format_style.shows_questions() {
            let question = clean_text(&story.question);
            if !question.is_empty() {
                self.paragraph(&question, Font::Bold, size, Align::Left, 0.0);
                self.space(size * 0.4);
            }
        }

        for paragraph in paragraphs(&story.answer_text) {
            self.paragraph(&paragraph, Font::Regular, size, Align::Justify, size * 2.0);
            self.space(size * 0.3);
        }

        if meta.include_images {
            for (i, image) in story.images.iter().enumerate() {
                let Some(picture) = media::load(image, index, i) else {
                    continue;
                };
                let max_height = (self.y - self.bottom()).max(self.config.page_height * 0.4);
                self.space(size * 0.5);
                self.image(picture, self.config.image_width, max_height);
                let caption = clean_text(&image.caption);
                if !caption.is_empty() {
                    self.paragraph(&caption, Font::Oblique, size - 2.0, Align::Center, 0.0);
                }
                self.space(size * 0.5);
            }
        }

        self.space(size);
    }

    /// Wrap and draw one paragraph.
    fn paragraph(&mut self, text: &str, font: Font, size: f32, align: Align, indent: f32) {
        let encoded = to_win_ansi(text);
        let words: Vec<&[u8]> = encoded
            .split(|&b| b == b' ')
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return;
        }

        let space = font.text_width(b" ", size);
        let leading = size * 1.35;
        let full = self.text_width();

        let mut lines: Vec<Vec<&[u8]>> = Vec::new();
        let mut current: Vec<&[u8]> = Vec::new();
        let mut width = 0.0;
        for word in words {
            let available = if lines.is_empty() { full - indent } else { full };
            let w = font.text_width(word, size);
            if !current.is_empty() && width + space + w > available {
                lines.push(std::mem::take(&mut current));
                width = 0.0;
            }
            width += if current.is_empty() { w } else { space + w };
            current.push(word);
        }
        lines.push(current);

        let count = lines.len();
        for (i, line) in lines.into_iter().enumerate() {
            let first_indent = if i == 0 { indent } else { 0.0 };
            let available = full - first_indent;
            let joined = line.join(&b' ');
            let natural = font.text_width(&joined, size);
            let last = i + 1 == count;

            let (x, word_spacing) = match align {
                Align::Left => (self.config.margin + first_indent, 0.0),
                Align::Center => (self.config.margin + ((full - natural) / 2.0).max(0.0), 0.0),
                Align::Justify if !last && line.len() > 1 => (
                    self.config.margin + first_indent,
                    ((available - natural) / (line.len() - 1) as f32).max(0.0),
                ),
                Align::Justify => (self.config.margin + first_indent, 0.0),
            };

            self.ensure(leading);
            let baseline = self.y - size;
            let op = format!(
                "BT /{} {} Tf {:.3} Tw {:.2} {:.2} Td {} Tj ET\n",
                font.resource(),
                fmt_num(size),
                word_spacing,
                x,
                baseline,
                pdf_string(&joined)
            );
            self.page().content.push_str(&op);
            self.y -= leading;
        }
    }

    /// Draw a centered picture no wider than `max_width` and no taller than `max_height`.
    fn image(&mut self, picture: Picture, max_width: f32, max_height: f32) {
        let limit_height = max_height.min(self.config.page_height - 2.0 * self.config.margin);
        let mut width = max_width.min(self.text_width());
        let mut height = picture.height_for(width);
        if height > limit_height && height > 0.0 {
            width *= limit_height / height;
            height = limit_height;
        }

        self.ensure(height);
        let x = self.config.margin + (self.text_width() - width) / 2.0;
        let y = self.y - height;

        let index = self.images.len();
        self.images.push(picture);
        let op = format!("q {width:.2} 0 0 {height:.2} {x:.2} {y:.2} cm /Im{index} Do Q\n");
        let page = self.page();
        page.content.push_str(&op);
        page.images.push(index);
        self.y -= height;
    }

    /// Footer page numbers, skipping the cover unless configured otherwise.
    fn number_pages(&mut self) {
        let y = self.config.margin / 2.0;
        let center = self.config.page_width / 2.0;
        for (i, page) in self.pages.iter_mut().enumerate() {
            if i == 0 && !self.config.number_first_page {
                continue;
            }
            let label = (i + 1).to_string();
            let width = Font::Regular.text_width(label.as_bytes(), 9.0);
            let _ = writeln!(
                page.content,
                "BT /F1 9 Tf 0 Tw {:.2} {y:.2} Td {} Tj ET",
                center - width / 2.0,
                pdf_string(label.as_bytes())
            );
        }
    }
}

fn fmt_num(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

// ============================================================================
// Serialization
// ============================================================================

/// Object writer that records offsets for the cross-reference table.
struct PdfWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new(objects: usize) -> Self {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
        Self {
            out,
            offsets: vec![0; objects],
        }
    }

    fn object(&mut self, id: usize, body: &str) {
        self.offsets[id - 1] = self.out.len();
        self.out
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    fn stream(&mut self, id: usize, dict: &str, data: &[u8]) {
        self.offsets[id - 1] = self.out.len();
        self.out.extend_from_slice(
            format!("{id} 0 obj\n<< {dict} /Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        let xref = self.out.len();
        let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = write!(table, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            table,
            "trailer\n<< /Size {} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            self.offsets.len() + 1
        );
        self.out.extend_from_slice(table.as_bytes());
        self.out
    }
}

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const INFO_ID: usize = 3;
const FIRST_FONT_ID: usize = 4;

fn serialize(book: &Book, config: &PdfConfig, layout: Layout<'_>) -> Result<Vec<u8>> {
    let first_image_id = FIRST_FONT_ID + Font::ALL.len();
    let first_page_id = first_image_id + layout.images.len();
    let total = first_page_id + 2 * layout.pages.len() - 1;
    let page_id = |i: usize| first_page_id + 2 * i;

    let mut pdf = PdfWriter::new(total);

    pdf.object(
        CATALOG_ID,
        &format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
    );

    let kids: Vec<String> = (0..layout.pages.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect();
    pdf.object(
        PAGES_ID,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            layout.pages.len()
        ),
    );

    let meta = book.metadata();
    pdf.object(
        INFO_ID,
        &format!(
            "<< /Title {} /Author {} /Producer (lifebook) /CreationDate (D:{}000000) >>",
            text_string(&meta.title),
            text_string(&meta.author),
            book.date().format("%Y%m%d")
        ),
    );

    for (i, font) in Font::ALL.iter().enumerate() {
        pdf.object(
            FIRST_FONT_ID + i,
            &format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            ),
        );
    }

    for (i, picture) in layout.images.iter().enumerate() {
        let (dict, data) = image_xobject(picture, config.compress)?;
        pdf.stream(first_image_id + i, &dict, &data);
    }

    let fonts: String = Font::ALL
        .iter()
        .enumerate()
        .map(|(i, font)| format!("/{} {} 0 R ", font.resource(), FIRST_FONT_ID + i))
        .collect();

    for (i, page) in layout.pages.iter().enumerate() {
        let id = page_id(i);
        let xobjects: String = page
            .images
            .iter()
            .map(|&n| format!("/Im{n} {} 0 R ", first_image_id + n))
            .collect();
        let xobject_dict = if xobjects.is_empty() {
            String::new()
        } else {
            format!(" /XObject << {xobjects}>>")
        };
        pdf.object(
            id,
            &format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << {fonts}>>{xobject_dict} >> /Contents {} 0 R >>",
                fmt_num(config.page_width),
                fmt_num(config.page_height),
                id + 1
            ),
        );

        let (filter, data) = maybe_compress(page.content.as_bytes(), config.compress)?;
        pdf.stream(id + 1, filter, &data);
    }

    Ok(pdf.finish(CATALOG_ID, INFO_ID))
}

fn maybe_compress(data: &[u8], compress: bool) -> Result<(&'static str, Vec<u8>)> {
    if !compress {
        return Ok(("", data.to_vec()));
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(("/Filter /FlateDecode", encoder.finish()?))
}

/// Image dictionary and stream data for one picture.
///
/// Baseline JPEGs pass through untouched; everything else becomes 8-bit RGB.
fn image_xobject(picture: &Picture, compress: bool) -> Result<(String, Vec<u8>)> {
    let (width, height) = (picture.width, picture.height);

    if picture.format == ImageFormat::Jpeg {
        let color_space = match jpeg_components(&picture.data) {
            Some(1) => Some("/DeviceGray"),
            Some(3) => Some("/DeviceRGB"),
            _ => None,
        };
        if let Some(color_space) = color_space {
            let dict = format!(
                "/Type /XObject /Subtype /Image /Width {width} /Height {height} \
                 /ColorSpace {color_space} /BitsPerComponent 8 /Filter /DCTDecode"
            );
            return Ok((dict, picture.data.clone()));
        }
    }

    let pixels = picture
        .pixels()
        .map_err(std::io::Error::other)?
        .to_rgb8()
        .into_raw();
    let (filter, data) = maybe_compress(&pixels, compress)?;
    let dict = format!(
        "/Type /XObject /Subtype /Image /Width {width} /Height {height} \
         /ColorSpace /DeviceRGB /BitsPerComponent 8 {filter}"
    );
    Ok((dict, data))
}

/// Number of colour components from the first JPEG SOF marker.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        if marker == 0xFF {
            i += 1;
            continue;
        }
        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        // SOF0..SOF15 except DHT (C4), JPG (C8) and DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            return data.get(i + 9).copied();
        }
        i += 2 + length;
    }
    None
}
