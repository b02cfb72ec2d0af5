//! Manuscript model: stories, book metadata and the validated [`Book`].

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Datelike, Local, NaiveDate};

use crate::error::{Error, Result};

mod sections;

pub use sections::Section;

/// Chapter title used for stories that arrive without a session.
pub const DEFAULT_SESSION_TITLE: &str = "My Story";

// ============================================================================
// Format style and cover choice
// ============================================================================

/// Whether prompts are printed alongside the answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "lowercase"))]
pub enum FormatStyle {
    /// Question followed by answer.
    #[default]
    Interview,
    /// Answers only.
    Biography,
    /// Answers only.
    Narrative,
}

impl FormatStyle {
    pub fn shows_questions(self) -> bool {
        self == FormatStyle::Interview
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormatStyle::Interview => "interview",
            FormatStyle::Biography => "biography",
            FormatStyle::Narrative => "narrative",
        }
    }
}

impl FromStr for FormatStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interview" => Ok(FormatStyle::Interview),
            "biography" => Ok(FormatStyle::Biography),
            "narrative" => Ok(FormatStyle::Narrative),
            _ => Err(Error::UnknownFormatStyle(s.to_string())),
        }
    }
}

impl fmt::Display for FormatStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cover treatment: generated text cover or the user's uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "lowercase"))]
pub enum CoverChoice {
    #[default]
    Simple,
    Uploaded,
}

impl FromStr for CoverChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(CoverChoice::Simple),
            "uploaded" => Ok(CoverChoice::Uploaded),
            _ => Err(Error::UnknownCoverChoice(s.to_string())),
        }
    }
}

// ============================================================================
// Stories
// ============================================================================

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum ImageSource {
    Bytes(Vec<u8>),
    /// Base64 text, optionally with a `data:<mime>;base64,` prefix.
    Base64(String),
}

impl ImageSource {
    /// Raw image bytes, or `None` when the base64 text does not decode.
    pub fn bytes(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            ImageSource::Bytes(data) => Some(Cow::Borrowed(data.as_slice())),
            ImageSource::Base64(text) => {
                let payload = match text.split_once(";base64,") {
                    Some((prefix, payload)) if prefix.starts_with("data:") => payload,
                    _ => text.as_str(),
                };
                let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
                STANDARD.decode(compact).ok().map(Cow::Owned)
            }
        }
    }
}

/// An image attached to a story.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
pub struct StoryImage {
    pub source: ImageSource,
    #[cfg_attr(feature = "cli", serde(default))]
    pub caption: String,
}

impl StoryImage {
    pub fn from_bytes(data: impl Into<Vec<u8>>, caption: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Bytes(data.into()),
            caption: caption.into(),
        }
    }

    pub fn from_base64(text: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Base64(text.into()),
            caption: caption.into(),
        }
    }
}

/// One answered prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Story {
    pub question: String,
    pub answer_text: String,
    pub session_title: String,
    pub images: Vec<StoryImage>,
}

impl Story {
    pub fn new(
        question: impl Into<String>,
        answer_text: impl Into<String>,
        session_title: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer_text: answer_text.into(),
            session_title: session_title.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: StoryImage) -> Self {
        self.images.push(image);
        self
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Book-level settings chosen by the author.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Metadata {
    pub title: String,
    pub author: String,
    pub language: String,
    pub format_style: FormatStyle,
    pub include_toc: bool,
    pub include_images: bool,
    #[cfg_attr(feature = "cli", serde(skip))]
    pub cover_image: Option<Vec<u8>>,
    pub cover_choice: CoverChoice,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            language: "en".to_string(),
            format_style: FormatStyle::default(),
            include_toc: true,
            include_images: true,
            cover_image: None,
            cover_choice: CoverChoice::default(),
        }
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_style(mut self, style: FormatStyle) -> Self {
        self.format_style = style;
        self
    }

    pub fn with_toc(mut self, include: bool) -> Self {
        self.include_toc = include;
        self
    }

    pub fn with_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }

    /// Use an uploaded cover image.
    pub fn with_cover(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.cover_image = Some(data.into());
        self.cover_choice = CoverChoice::Uploaded;
        self
    }

    pub fn with_cover_choice(mut self, choice: CoverChoice) -> Self {
        self.cover_choice = choice;
        self
    }
}

// ============================================================================
// Book
// ============================================================================

/// A validated manuscript, ready for export.
///
/// Construction checks the input once so generators can rely on a non-empty
/// story list where every story has a session title. The current date is
/// read here and nowhere else.
#[derive(Debug, Clone)]
pub struct Book {
    metadata: Metadata,
    stories: Vec<Story>,
    date: NaiveDate,
}

impl Book {
    /// Validate `stories` and bind them to `metadata`.
    ///
    /// Stories must already be ordered by session: chapter headings are
    /// emitted whenever the session title changes between neighbours.
    pub fn new(metadata: Metadata, mut stories: Vec<Story>) -> Result<Self> {
        if stories.is_empty() {
            return Err(Error::EmptyBook);
        }

        for story in &mut stories {
            let title = story.session_title.trim();
            if title.is_empty() {
                story.session_title = DEFAULT_SESSION_TITLE.to_string();
            } else if title.len() != story.session_title.len() {
                story.session_title = title.to_string();
            }
        }

        Ok(Self {
            metadata,
            stories,
            date: Local::now().date_naive(),
        })
    }

    /// Pin the export date (copyright year, EPUB timestamp, file names).
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn copyright_year(&self) -> i32 {
        self.date.year()
    }

    /// Cover bytes to embed, if the author chose an uploaded cover.
    pub fn cover(&self) -> Option<&[u8]> {
        match self.metadata.cover_choice {
            CoverChoice::Uploaded => self.metadata.cover_image.as_deref(),
            CoverChoice::Simple => None,
        }
    }

    /// Copyright line shared by every format.
    pub fn copyright_line(&self) -> String {
        let author = self.metadata.author.trim();
        if author.is_empty() {
            format!("Copyright \u{a9} {}. All rights reserved.", self.copyright_year())
        } else {
            format!(
                "Copyright \u{a9} {} {}. All rights reserved.",
                self.copyright_year(),
                author
            )
        }
    }

    /// Suggested download name: `My_Story_20240131.docx`.
    pub fn filename(&self, extension: &str) -> String {
        format!(
            "{}_{}.{}",
            crate::util::file_stem(&self.metadata.title),
            self.date.format("%Y%m%d"),
            extension
        )
    }
}
