//! HTML exporter.
//!
//! Produces one self-contained page: inline CSS, images as data URIs, and a
//! table of contents whose links target the chapter headings.

use std::fmt::Write as _;
use std::io::{Seek, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::book::{Book, Story};
use crate::error::Result;
use crate::media::{self, Picture};
use crate::util::{Slugger, clean_text, escape_xml, paragraphs};

use super::Exporter;

const STYLE: &str = "\
body { font-family: Georgia, 'Times New Roman', serif; max-width: 42em; margin: 0 auto; padding: 2em; line-height: 1.6; color: #222; }
.cover { text-align: center; margin: 4em 0; }
.cover-image { max-width: 60%; height: auto; margin-bottom: 2em; }
.book-title { font-size: 2.6em; margin-bottom: 0.2em; }
.author { font-style: italic; font-size: 1.3em; }
.copyright { text-align: center; font-size: 0.9em; color: #666; margin: 3em 0; }
.toc ul { list-style: none; padding-left: 0; }
.toc a { color: inherit; }
h2.chapter { text-align: center; margin-top: 3em; }
.question { font-weight: bold; }
.answer p { text-indent: 1.5em; margin: 0.4em 0; }
figure { text-align: center; margin: 2em 0; }
figure img { max-width: 100%; height: auto; }
.caption { font-style: italic; font-size: 0.9em; color: #555; }
hr { border: none; border-top: 1px solid #ccc; margin: 2em 0; }
";

/// HTML format exporter.
#[derive(Debug, Clone, Default)]
pub struct HtmlExporter;

impl HtmlExporter {
    pub fn new() -> Self {
        Self
    }

    /// Render the whole document.
    pub fn render(&self, book: &Book) -> String {
        let meta = book.metadata();
        let title = escape_xml(meta.title.trim());
        let author = escape_xml(meta.author.trim());

        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{title}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n",
            escape_xml(&meta.language),
        );

        // Cover block
        html.push_str("<div class=\"cover\">\n");
        if let Some(cover) = media::cover(book) {
            let _ = writeln!(
                html,
                "<img class=\"cover-image\" src=\"{}\" alt=\"Cover\">",
                data_uri(&cover)
            );
        }
        let _ = writeln!(html, "<h1 class=\"book-title\">{title}</h1>");
        if !author.is_empty() {
            let _ = writeln!(html, "<p class=\"author\">by {author}</p>");
        }
        html.push_str("</div>\n");
        let _ = writeln!(
            html,
            "<p class=\"copyright\">{}</p>",
            escape_xml(&book.copyright_line())
        );

        // Anchors are assigned once so the TOC and headings agree.
        let sections = book.sections();
        let mut slugger = Slugger::new();
        let anchors: Vec<String> = sections.iter().map(|s| slugger.slug(s.title)).collect();

        if meta.include_toc {
            html.push_str("<nav class=\"toc\">\n<h2 class=\"toc-title\">Table of Contents</h2>\n<ul>\n");
            for (section, anchor) in sections.iter().zip(&anchors) {
                let _ = writeln!(
                    html,
                    "<li><a href=\"#{anchor}\">{}</a></li>",
                    escape_xml(section.title)
                );
            }
            html.push_str("</ul>\n</nav>\n");
        }

        let total = book.stories().len();
        for (section, anchor) in sections.iter().zip(&anchors) {
            let _ = writeln!(
                html,
                "<h2 id=\"{anchor}\" class=\"chapter\">{}</h2>",
                escape_xml(section.title)
            );
            for (offset, story) in section.stories.iter().enumerate() {
                let index = section.start + offset;
                render_story(&mut html, book, story, index);
                if index + 1 < total {
                    html.push_str("<hr>\n");
                }
            }
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

fn render_story(html: &mut String, book: &Book, story: &Story, index: usize) {
    let meta = book.metadata();
    html.push_str("<div class=\"story\">\n");

    if meta.format_style.shows_questions() {
        let question = clean_text(&story.question);
        if !question.is_empty() {
            let _ = writeln!(html, "<p class=\"question\">{}</p>", escape_xml(&question));
        }
    }

    html.push_str("<div class=\"answer\">\n");
    for paragraph in paragraphs(&story.answer_text) {
        let _ = writeln!(html, "<p>{}</p>", escape_xml(&paragraph));
    }
    html.push_str("</div>\n");

    if meta.include_images {
        for (i, image) in story.images.iter().enumerate() {
            let Some(picture) = media::load(image, index, i) else {
                continue;
            };
            let caption = clean_text(&image.caption);
            let _ = writeln!(
                html,
                "<figure>\n<img src=\"{}\" alt=\"{}\">",
                data_uri(&picture),
                escape_xml(&caption)
            );
            if !caption.is_empty() {
                let _ = writeln!(
                    html,
                    "<figcaption class=\"caption\">{}</figcaption>",
                    escape_xml(&caption)
                );
            }
            html.push_str("</figure>\n");
        }
    }

    html.push_str("</div>\n");
}

fn data_uri(picture: &Picture) -> String {
    format!(
        "data:{};base64,{}",
        picture.mime_type(),
        STANDARD.encode(&picture.data)
    )
}

impl Exporter for HtmlExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        writer.write_all(self.render(book).as_bytes())?;
        Ok(())
    }
}

/// Render `book` as a single HTML page.
pub fn generate_html(book: &Book) -> String {
    HtmlExporter::new().render(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{FormatStyle, Metadata};

    fn book(style: FormatStyle, sessions: &[&str]) -> Book {
        let stories = sessions
            .iter()
            .enumerate()
            .map(|(i, s)| Story::new(format!("Question {i}?"), format!("Answer {i}."), *s))
            .collect();
        Book::new(Metadata::new("Title").with_author("Me").with_style(style), stories).unwrap()
    }

    #[test]
    fn test_toc_links_match_heading_ids() {
        let html = generate_html(&book(FormatStyle::Interview, &["Early Years", "School"]));
        assert!(html.contains("<a href=\"#early-years\">Early Years</a>"));
        assert!(html.contains("<h2 id=\"early-years\" class=\"chapter\">Early Years</h2>"));
        assert!(html.contains("<a href=\"#school\">School</a>"));
    }

    #[test]
    fn test_repeated_session_gets_unique_anchor() {
        let html = generate_html(&book(FormatStyle::Interview, &["Home", "Away", "Home"]));
        assert!(html.contains("id=\"home\""));
        assert!(html.contains("id=\"home-2\""));
    }

    #[test]
    fn test_no_toc_when_disabled() {
        let mut book = book(FormatStyle::Interview, &["A"]);
        book = Book::new(book.metadata().clone().with_toc(false), book.stories().to_vec()).unwrap();
        assert!(!generate_html(&book).contains("class=\"toc\""));
    }

    #[test]
    fn test_rules_between_stories_only() {
        let html = generate_html(&book(FormatStyle::Narrative, &["A", "A", "B"]));
        assert_eq!(html.matches("<hr>").count(), 2);
        assert!(!html.contains("class=\"question\""));
    }
}
