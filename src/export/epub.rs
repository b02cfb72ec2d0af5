//! EPUB exporter.
//!
//! Creates EPUB 3 files (with an EPUB 2 NCX for older readers). Every story
//! record becomes its own chapter, titled by its session.

use std::fmt::Write as _;
use std::io::{Cursor, Seek, Write};

use crate::book::{Book, Story};
use crate::error::Result;
use crate::media::{self, Picture};
use crate::util::{clean_text, escape_xml, paragraphs};

use super::Exporter;
use super::package::{DEFAULT_COMPRESSION, Package};

/// Configuration for EPUB export.
#[derive(Debug, Clone, Default)]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
}

/// EPUB format exporter.
///
/// # Example
///
/// ```no_run
/// use lifebook::{Book, Metadata, Story};
/// use lifebook::export::{EpubExporter, Exporter};
/// use std::fs::File;
///
/// let book = Book::new(Metadata::new("My Story"), vec![Story::new("", "Once.", "Youth")])?;
/// let mut file = File::create("my-story.epub")?;
/// EpubExporter::new().export(&book, &mut file)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct EpubExporter {
    config: EpubConfig,
}

impl EpubExporter {
    /// Create a new exporter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: EpubConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for EpubExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let meta = book.metadata();
        let level = self.config.compression_level.unwrap_or(DEFAULT_COMPRESSION);
        let mut zip = Package::new(writer, level);

        // 1. Write mimetype (must be first, uncompressed)
        zip.add_stored("mimetype", b"application/epub+zip")?;

        // 2. Write container.xml
        zip.add("META-INF/container.xml", CONTAINER_XML)?;

        // 3. Collect images and chapters
        let mut images: Vec<ImageItem> = Vec::new();
        let cover = media::cover(book).map(|picture| {
            let item = ImageItem::new("cover-image".to_string(), "cover", picture);
            images.push(item.clone());
            item
        });

        let mut chapters: Vec<Chapter> = Vec::new();
        for (index, story) in book.stories().iter().enumerate() {
            let mut figures = Vec::new();
            if meta.include_images {
                for (i, image) in story.images.iter().enumerate() {
                    if let Some(picture) = media::load(image, index, i) {
                        let item = ImageItem::new(
                            format!("image_{index}_{i}"),
                            &format!("image_{index}_{i}"),
                            picture,
                        );
                        figures.push((item.href.clone(), clean_text(&image.caption)));
                        images.push(item);
                    }
                }
            }
            chapters.push(Chapter {
                id: format!("chapter_{index}"),
                href: format!("chapter_{index}.xhtml"),
                title: story.session_title.clone(),
                document: chapter_document(book, story, &figures),
            });
        }

        // 4. Write content.opf
        let opf = generate_opf(book, &chapters, &images, cover.as_ref());
        zip.add("OEBPS/content.opf", opf.as_bytes())?;

        // 5. Write navigation documents
        zip.add("OEBPS/toc.ncx", generate_ncx(book, &chapters).as_bytes())?;
        zip.add("OEBPS/nav.xhtml", generate_nav(book, &chapters).as_bytes())?;

        // 6. Write stylesheet and front matter
        zip.add("OEBPS/style.css", STYLE.as_bytes())?;
        zip.add(
            "OEBPS/title.xhtml",
            title_document(book, cover.as_ref()).as_bytes(),
        )?;

        // 7. Write chapters
        for chapter in &chapters {
            zip.add(&format!("OEBPS/{}", chapter.href), chapter.document.as_bytes())?;
        }

        // 8. Write images
        for image in &images {
            zip.add(&format!("OEBPS/{}", image.href), &image.picture.data)?;
        }

        zip.finish()?;
        Ok(())
    }
}

/// Render `book` as an EPUB file.
pub fn generate_epub(book: &Book) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    EpubExporter::new().export(book, &mut cursor)?;
    Ok(cursor.into_inner())
}

/// Container.xml template.
const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const STYLE: &str = "\
body { font-family: serif; line-height: 1.5; margin: 0 5%; }
h1 { text-align: center; margin: 2em 0 1em; }
.front { text-align: center; margin-top: 20%; }
.front .author { font-style: italic; font-size: 1.2em; }
.front .copyright { font-size: 0.8em; margin-top: 4em; }
.cover-image { max-width: 100%; }
.question { font-weight: bold; }
p { text-indent: 1.5em; margin: 0.3em 0; }
p.question, .front p { text-indent: 0; }
figure { text-align: center; margin: 1.5em 0; }
figure img { max-width: 100%; }
figcaption { font-style: italic; font-size: 0.9em; }
";

#[derive(Clone)]
struct ImageItem {
    id: String,
    href: String,
    picture: Picture,
}

impl ImageItem {
    fn new(id: String, stem: &str, picture: Picture) -> Self {
        Self {
            id,
            href: format!("images/{stem}.{}", picture.extension()),
            picture,
        }
    }
}

struct Chapter {
    id: String,
    href: String,
    title: String,
    document: String,
}

// ============================================================================
// Content documents
// ============================================================================

fn xhtml(title: &str, language: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" \
         xml:lang=\"{lang}\" lang=\"{lang}\">\n<head>\n<title>{title}</title>\n\
         <link rel=\"stylesheet\" type=\"text/css\" href=\"style.css\"/>\n</head>\n\
         <body>\n{body}</body>\n</html>\n",
        lang = escape_xml(language),
        title = escape_xml(title),
    )
}

fn title_document(book: &Book, cover: Option<&ImageItem>) -> String {
    let meta = book.metadata();
    let mut body = String::from("<section class=\"front\" epub:type=\"titlepage\">\n");
    if let Some(cover) = cover {
        let _ = writeln!(
            body,
            "<img class=\"cover-image\" src=\"{}\" alt=\"Cover\"/>",
            escape_xml(&cover.href)
        );
    }
    let _ = writeln!(body, "<h1>{}</h1>", escape_xml(&meta.title));
    if !meta.author.trim().is_empty() {
        let _ = writeln!(
            body,
            "<p class=\"author\">by {}</p>",
            escape_xml(meta.author.trim())
        );
    }
    let _ = writeln!(
        body,
        "<p class=\"copyright\">{}</p>",
        escape_xml(&book.copyright_line())
    );
    body.push_str("</section>\n");
    xhtml(&meta.title, &meta.language, &body)
}

fn chapter_document(book: &Book, story: &Story, figures: &[(String, String)]) -> String {
    let meta = book.metadata();
    let mut body = String::new();
    let _ = writeln!(body, "<h1>{}</h1>", escape_xml(&story.session_title));

    if meta.format_style.shows_questions() {
        let question = clean_text(&story.question);
        if !question.is_empty() {
            let _ = writeln!(body, "<p class=\"question\">{}</p>", escape_xml(&question));
        }
    }
    for paragraph in paragraphs(&story.answer_text) {
        let _ = writeln!(body, "<p>{}</p>", escape_xml(&paragraph));
    }
    for (href, caption) in figures {
        let _ = write!(
            body,
            "<figure>\n<img src=\"{}\" alt=\"{}\"/>\n",
            escape_xml(href),
            escape_xml(caption)
        );
        if !caption.is_empty() {
            let _ = writeln!(body, "<figcaption>{}</figcaption>", escape_xml(caption));
        }
        body.push_str("</figure>\n");
    }

    xhtml(&story.session_title, &meta.language, &body)
}

// ============================================================================
// Package documents
// ============================================================================

/// Stable `urn:uuid:` identifier derived from title and author.
fn book_identifier(book: &Book) -> String {
    let meta = book.metadata();
    let mut hasher = sha1_smol::Sha1::new();
    hasher.update(meta.title.as_bytes());
    hasher.update(b"\0");
    hasher.update(meta.author.as_bytes());
    let hex = hasher.digest().to_string();
    format!(
        "urn:uuid:{}-{}-5{}-a{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[13..16],
        &hex[17..20],
        &hex[20..32]
    )
}

/// Generate content.opf from metadata and manifest.
fn generate_opf(
    book: &Book,
    chapters: &[Chapter],
    images: &[ImageItem],
    cover: Option<&ImageItem>,
) -> String {
    let meta = book.metadata();
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );
    let _ = writeln!(
        opf,
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>",
        book_identifier(book)
    );
    let _ = writeln!(opf, "    <dc:title>{}</dc:title>", escape_xml(&meta.title));
    if !meta.author.trim().is_empty() {
        let _ = writeln!(
            opf,
            "    <dc:creator>{}</dc:creator>",
            escape_xml(meta.author.trim())
        );
    }
    let language = if meta.language.is_empty() { "en" } else { &meta.language };
    let _ = writeln!(opf, "    <dc:language>{}</dc:language>", escape_xml(language));
    let _ = writeln!(opf, "    <dc:rights>{}</dc:rights>", escape_xml(&book.copyright_line()));
    let _ = writeln!(
        opf,
        "    <meta property=\"dcterms:modified\">{}</meta>",
        book.date().format("%Y-%m-%dT00:00:00Z")
    );
    if let Some(cover) = cover {
        let _ = writeln!(opf, "    <meta name=\"cover\" content=\"{}\"/>", cover.id);
    }
    opf.push_str("  </metadata>\n");

    // Manifest
    opf.push_str("  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    opf.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    opf.push_str("    <item id=\"style\" href=\"style.css\" media-type=\"text/css\"/>\n");
    opf.push_str(
        "    <item id=\"title\" href=\"title.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
    );
    for chapter in chapters {
        let _ = writeln!(
            opf,
            "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>",
            chapter.id, chapter.href
        );
    }
    for image in images {
        let properties = if cover.is_some_and(|c| c.id == image.id) {
            " properties=\"cover-image\""
        } else {
            ""
        };
        let _ = writeln!(
            opf,
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{properties}/>",
            image.id,
            escape_xml(&image.href),
            image.picture.mime_type()
        );
    }
    opf.push_str("  </manifest>\n");

    // Spine
    opf.push_str("  <spine toc=\"ncx\">\n");
    opf.push_str("    <itemref idref=\"title\"/>\n");
    if meta.include_toc {
        opf.push_str("    <itemref idref=\"nav\"/>\n");
    }
    for chapter in chapters {
        let _ = writeln!(opf, "    <itemref idref=\"{}\"/>", chapter.id);
    }
    opf.push_str("  </spine>\n");

    opf.push_str("</package>\n");
    opf
}

/// Generate toc.ncx with one navPoint per chapter.
fn generate_ncx(book: &Book, chapters: &[Chapter]) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&book_identifier(book));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&book.metadata().title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    for (i, chapter) in chapters.iter().enumerate() {
        let order = i + 1;
        let _ = write!(
            ncx,
            "    <navPoint id=\"navPoint-{order}\" playOrder=\"{order}\">\n\
             \x20     <navLabel><text>{}</text></navLabel>\n\
             \x20     <content src=\"{}\"/>\n\
             \x20   </navPoint>\n",
            escape_xml(&chapter.title),
            chapter.href
        );
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

/// Generate the EPUB 3 navigation document.
fn generate_nav(book: &Book, chapters: &[Chapter]) -> String {
    let mut body = String::from(
        "<nav epub:type=\"toc\" id=\"toc\">\n<h1>Table of Contents</h1>\n<ol>\n",
    );
    for chapter in chapters {
        let _ = writeln!(
            body,
            "<li><a href=\"{}\">{}</a></li>",
            chapter.href,
            escape_xml(&chapter.title)
        );
    }
    body.push_str("</ol>\n</nav>\n");
    xhtml("Table of Contents", &book.metadata().language, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Metadata;

    #[test]
    fn test_identifier_is_stable_uuid() {
        let book = Book::new(
            Metadata::new("My Story").with_author("Jane Doe"),
            vec![Story::default()],
        )
        .unwrap();
        let id = book_identifier(&book);
        assert_eq!(id, book_identifier(&book));
        assert!(id.starts_with("urn:uuid:"));
        assert_eq!(id.len(), "urn:uuid:".len() + 36);
        assert_eq!(&id[23..24], "5");
    }

    #[test]
    fn test_chapter_document_escapes_text() {
        let book = Book::new(Metadata::new("T"), vec![Story::new("Q?", "A & B", "S <1>")]).unwrap();
        let doc = chapter_document(&book, &book.stories()[0], &[]);
        assert!(doc.contains("<h1>S &lt;1&gt;</h1>"));
        assert!(doc.contains("<p>A &amp; B</p>"));
        assert!(doc.contains("<p class=\"question\">Q?</p>"));
    }
}
