//! DOCX exporter.
//!
//! Writes a WordprocessingML package: title page, copyright page, optional
//! bulleted contents list, then the stories with chapter headings, indented
//! answer paragraphs and captioned pictures.

use std::fmt::Write as _;
use std::io::{Cursor, Seek, Write};

use crate::book::{Book, Story};
use crate::error::Result;
use crate::media::{self, Picture};
use crate::util::{clean_text, escape_xml, paragraphs};

use super::Exporter;
use super::package::{DEFAULT_COMPRESSION, Package};

/// English Metric Units per inch.
const EMU_PER_INCH: f32 = 914_400.0;

/// Configuration for DOCX export.
#[derive(Debug, Clone)]
pub struct DocxConfig {
    /// Width of the cover picture on the title page, in inches.
    pub cover_width: f32,
    /// Width of story pictures, in inches.
    pub image_width: f32,
    /// First-line indent of answer paragraphs, in twentieths of a point.
    pub first_line_indent: u32,
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
}

impl Default for DocxConfig {
    fn default() -> Self {
        Self {
            cover_width: 4.0,
            image_width: 4.5,
            first_line_indent: 720,
            compression_level: None,
        }
    }
}

/// DOCX format exporter.
#[derive(Debug, Clone, Default)]
pub struct DocxExporter {
    config: DocxConfig,
}

impl DocxExporter {
    /// Create a new exporter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: DocxConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for DocxExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let mut doc = DocumentBuilder::new(&self.config);
        doc.title_page(book);
        doc.copyright_page(book);
        if book.metadata().include_toc {
            doc.contents(book);
        }
        doc.stories(book);
        let body = doc.body;
        let media = doc.media;

        let level = self.config.compression_level.unwrap_or(DEFAULT_COMPRESSION);
        let mut package = Package::new(writer, level);

        package.add("[Content_Types].xml", content_types(&media).as_bytes())?;
        package.add("_rels/.rels", ROOT_RELS)?;
        package.add("docProps/core.xml", core_properties(book).as_bytes())?;
        package.add("word/document.xml", document(&body).as_bytes())?;
        package.add("word/styles.xml", STYLES)?;
        package.add("word/numbering.xml", NUMBERING)?;
        package.add(
            "word/_rels/document.xml.rels",
            document_rels(&media).as_bytes(),
        )?;
        for item in &media {
            package.add(&format!("word/media/{}", item.name), &item.picture.data)?;
        }

        package.finish()?;
        Ok(())
    }
}

/// Render `book` as a Word document.
pub fn generate_docx(book: &Book) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    DocxExporter::new().export(book, &mut cursor)?;
    Ok(cursor.into_inner())
}

// ============================================================================
// Document body
// ============================================================================

struct MediaItem {
    rel_id: String,
    name: String,
    picture: Picture,
}

struct DocumentBuilder<'a> {
    config: &'a DocxConfig,
    body: String,
    media: Vec<MediaItem>,
}

impl<'a> DocumentBuilder<'a> {
    fn new(config: &'a DocxConfig) -> Self {
        Self {
            config,
            body: String::new(),
            media: Vec::new(),
        }
    }

    fn title_page(&mut self, book: &Book) {
        let meta = book.metadata();
        if let Some(cover) = media::cover(book) {
            self.picture(cover, self.config.cover_width, "Cover");
        }
        self.paragraph(Some("Title"), "", &run(&meta.title, RunStyle::Plain));
        if !meta.author.trim().is_empty() {
            self.paragraph(
                Some("Subtitle"),
                "",
                &run(&format!("by {}", meta.author.trim()), RunStyle::Plain),
            );
        }
        self.page_break();
    }

    fn copyright_page(&mut self, book: &Book) {
        self.paragraph(
            None,
            "<w:jc w:val=\"center\"/>",
            &run(&book.copyright_line(), RunStyle::Plain),
        );
        self.page_break();
    }

    /// Flat bulleted list of session titles; no page links.
    fn contents(&mut self, book: &Book) {
        self.paragraph(
            Some("TOCHeading"),
            "",
            &run("Table of Contents", RunStyle::Plain),
        );
        for title in book.session_titles() {
            self.paragraph(
                Some("ListBullet"),
                "<w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/></w:numPr>",
                &run(title, RunStyle::Plain),
            );
        }
        self.page_break();
    }

    fn stories(&mut self, book: &Book) {
        for section in book.sections() {
            self.paragraph(Some("Heading1"), "", &run(section.title, RunStyle::Plain));
            for (offset, story) in section.stories.iter().enumerate() {
                self.story(book, story, section.start + offset);
            }
        }
    }

    fn story(&mut self, book: &Book, story: &Story, index: usize) {
        let meta = book.metadata();

        if meta.format_style.shows_questions() {
            let question = clean_text(&story.question);
            if !question.is_empty() {
                self.paragraph(Some("Question"), "", &run(&question, RunStyle::Bold));
            }
        }

        let indent = format!("<w:ind w:firstLine=\"{}\"/>", self.config.first_line_indent);
        for paragraph in paragraphs(&story.answer_text) {
            self.paragraph(None, &indent, &run(&paragraph, RunStyle::Plain));
        }

        if meta.include_images {
            for (i, image) in story.images.iter().enumerate() {
                let Some(picture) = media::load(image, index, i) else {
                    continue;
                };
                self.picture(picture, self.config.image_width, "Picture");
                let caption = clean_text(&image.caption);
                if !caption.is_empty() {
                    self.paragraph(Some("Caption"), "", &run(&caption, RunStyle::Plain));
                }
            }
        }
    }

    fn paragraph(&mut self, style: Option<&str>, properties: &str, runs: &str) {
        self.body.push_str("<w:p>");
        if style.is_some() || !properties.is_empty() {
            self.body.push_str("<w:pPr>");
            if let Some(style) = style {
                let _ = write!(self.body, "<w:pStyle w:val=\"{style}\"/>");
            }
            self.body.push_str(properties);
            self.body.push_str("</w:pPr>");
        }
        self.body.push_str(runs);
        self.body.push_str("</w:p>\n");
    }

    fn page_break(&mut self) {
        self.body
            .push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>\n");
    }

    /// Centered inline picture scaled to `width_inches`.
    fn picture(&mut self, picture: Picture, width_inches: f32, label: &str) {
        let number = self.media.len() + 1;
        let rel_id = format!("rIdImage{number}");
        let name = format!("image{number}.{}", picture.extension());

        let cx = (width_inches * EMU_PER_INCH).round() as u64;
        let cy = (picture.height_for(width_inches) * EMU_PER_INCH).round() as u64;

        let drawing = format!(
            "<w:r><w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
             <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
             <wp:docPr id=\"{number}\" name=\"{label} {number}\"/>\
             <a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
             <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <pic:nvPicPr><pic:cNvPr id=\"{number}\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>\
             <pic:blipFill><a:blip r:embed=\"{rel_id}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
             <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
             <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
             </pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"
        );
        self.paragraph(None, "<w:jc w:val=\"center\"/>", &drawing);

        self.media.push(MediaItem {
            rel_id,
            name,
            picture,
        });
    }
}

#[derive(Clone, Copy)]
enum RunStyle {
    Plain,
    Bold,
}

fn run(text: &str, style: RunStyle) -> String {
    let properties = match style {
        RunStyle::Plain => "",
        RunStyle::Bold => "<w:rPr><w:b/></w:rPr>",
    };
    format!(
        "<w:r>{properties}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
        escape_xml(text)
    )
}

// ============================================================================
// Package parts
// ============================================================================

fn document(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
         xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\">\n\
         <w:body>\n{body}\
         <w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/>\
         <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" \
         w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/></w:sectPr>\n\
         </w:body>\n</w:document>\n"
    )
}

fn content_types(media: &[MediaItem]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\n\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\n\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\n",
    );

    let mut seen: Vec<&str> = Vec::new();
    for item in media {
        let ext = item.picture.extension();
        if !seen.contains(&ext) {
            seen.push(ext);
            let _ = writeln!(
                xml,
                "<Default Extension=\"{ext}\" ContentType=\"{}\"/>",
                item.picture.mime_type()
            );
        }
    }

    xml.push_str(
        "<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\n\
         <Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\n\
         <Override PartName=\"/word/numbering.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml\"/>\n\
         <Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\n\
         </Types>\n",
    );
    xml
}

fn document_rels(media: &[MediaItem]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n\
         <Relationship Id=\"rIdStyles\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\n\
         <Relationship Id=\"rIdNumbering\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering\" Target=\"numbering.xml\"/>\n",
    );
    for item in media {
        let _ = writeln!(
            xml,
            "<Relationship Id=\"{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" Target=\"media/{}\"/>",
            item.rel_id, item.name
        );
    }
    xml.push_str("</Relationships>\n");
    xml
}

fn core_properties(book: &Book) -> String {
    let meta = book.metadata();
    let date = book.date().format("%Y-%m-%dT00:00:00Z");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n\
         <dc:title>{}</dc:title>\n<dc:creator>{}</dc:creator>\n<dc:language>{}</dc:language>\n\
         <dcterms:created xsi:type=\"dcterms:W3CDTF\">{date}</dcterms:created>\n\
         </cp:coreProperties>\n",
        escape_xml(&meta.title),
        escape_xml(&meta.author),
        escape_xml(&meta.language),
    )
}

const ROOT_RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>
"#;

const STYLES: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults>
<w:rPrDefault><w:rPr><w:rFonts w:ascii="Georgia" w:hAnsi="Georgia" w:cs="Georgia"/><w:sz w:val="24"/><w:szCs w:val="24"/></w:rPr></w:rPrDefault>
<w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="312" w:lineRule="auto"/></w:pPr></w:pPrDefault>
</w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:qFormat/>
<w:pPr><w:jc w:val="center"/><w:spacing w:before="2400" w:after="480"/></w:pPr><w:rPr><w:b/><w:sz w:val="56"/><w:szCs w:val="56"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Subtitle"><w:name w:val="Subtitle"/><w:basedOn w:val="Normal"/><w:qFormat/>
<w:pPr><w:jc w:val="center"/></w:pPr><w:rPr><w:i/><w:sz w:val="32"/><w:szCs w:val="32"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>
<w:pPr><w:keepNext/><w:spacing w:before="480" w:after="240"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="36"/><w:szCs w:val="36"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="TOCHeading"><w:name w:val="TOC Heading"/><w:basedOn w:val="Normal"/>
<w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/><w:szCs w:val="32"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/>
<w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:style>
<w:style w:type="paragraph" w:styleId="Question"><w:name w:val="Question"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/>
<w:pPr><w:keepNext/><w:spacing w:before="240"/></w:pPr></w:style>
<w:style w:type="paragraph" w:styleId="Caption"><w:name w:val="caption"/><w:basedOn w:val="Normal"/><w:qFormat/>
<w:pPr><w:jc w:val="center"/><w:spacing w:after="240"/></w:pPr><w:rPr><w:i/><w:color w:val="555555"/><w:sz w:val="20"/><w:szCs w:val="20"/></w:rPr></w:style>
</w:styles>
"#;

const NUMBERING: &[u8] = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>
<w:numbering xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">
<w:abstractNum w:abstractNumId=\"0\"><w:multiLevelType w:val=\"singleLevel\"/>
<w:lvl w:ilvl=\"0\"><w:start w:val=\"1\"/><w:numFmt w:val=\"bullet\"/><w:lvlText w:val=\"\u{2022}\"/><w:lvlJc w:val=\"left\"/>
<w:pPr><w:ind w:left=\"720\" w:hanging=\"360\"/></w:pPr></w:lvl>
</w:abstractNum>
<w:num w:numId=\"1\"><w:abstractNumId w:val=\"0\"/></w:num>
</w:numbering>
"
.as_bytes();
