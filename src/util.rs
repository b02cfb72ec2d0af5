//! Text helpers shared by every format generator.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// Markup Cleaning
// ============================================================================

/// Block-level tags that end a line in rich-text answers.
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6])\s*>").expect("valid regex"));

/// Any complete tag.
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Strip markup from editor output and decode the common entities.
///
/// Tags are removed (block-level closers become line breaks), `&nbsp;`,
/// `&amp;`, `&lt;`, `&gt;`, `&quot;` and `&#39;` are decoded, and the result
/// is trimmed. Stripping and decoding repeat until the text is stable, so
/// `clean_text(clean_text(x)) == clean_text(x)`.
///
/// An unterminated tag such as `"<b unclosed"` is left as-is.
///
/// # Examples
///
/// ```
/// use lifebook::clean_text;
///
/// assert_eq!(clean_text("<p>Hello <b>World</b></p>"), "Hello World");
/// assert_eq!(clean_text("Fish &amp; chips"), "Fish & chips");
/// ```
pub fn clean_text(markup: &str) -> String {
    let markup = normalize_controls(markup, '\n');
    if memchr::memchr2(b'<', b'&', markup.as_bytes()).is_none() {
        return markup.trim().to_string();
    }

    let mut current = markup.into_owned();
    loop {
        let next = decode_entities(&strip_tags(&current)).into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

/// C0 controls that XML 1.0 does not allow in character data.
fn is_forbidden_control(c: char) -> bool {
    c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Turn vertical tab and form feed into `separator` and drop the other
/// forbidden controls (and DEL).
fn normalize_controls(text: &str, separator: char) -> Cow<'_, str> {
    if !text.chars().any(is_forbidden_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .filter_map(|c| match c {
                '\u{b}' | '\u{c}' => Some(separator),
                c if is_forbidden_control(c) => None,
                c => Some(c),
            })
            .collect(),
    )
}

fn strip_tags(text: &str) -> Cow<'_, str> {
    match LINE_BREAK.replace_all(text, "\n") {
        Cow::Borrowed(text) => TAG.replace_all(text, ""),
        Cow::Owned(text) => Cow::Owned(TAG.replace_all(&text, "").into_owned()),
    }
}

const ENTITIES: &[(&str, char)] = &[
    ("&nbsp;", ' '),
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#39;", '\''),
];

/// Single left-to-right pass over the fixed entity set.
fn decode_entities(text: &str) -> Cow<'_, str> {
    if memchr::memchr(b'&', text.as_bytes()).is_none() {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match ENTITIES.iter().find(|(name, _)| tail.starts_with(name)) {
            Some((name, ch)) => {
                out.push(*ch);
                rest = &tail[name.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Clean `text` and split it into non-empty, trimmed paragraphs.
pub fn paragraphs(text: &str) -> Vec<String> {
    clean_text(text)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Escaping
// ============================================================================

/// Escape text for HTML, XHTML and OOXML content and attribute values.
///
/// Control characters XML cannot carry are removed; vertical tab and form
/// feed become spaces.
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    match normalize_controls(s, ' ') {
        Cow::Borrowed(s) => quick_xml::escape::escape(s),
        Cow::Owned(s) => Cow::Owned(quick_xml::escape::escape(&s).into_owned()),
    }
}

// ============================================================================
// Slugs and filenames
// ============================================================================

/// Generate an anchor slug from a session title.
///
/// Lower-cases the text and turns spaces and punctuation into single hyphens.
/// Returns `"section"` when nothing usable remains.
///
/// ```
/// use lifebook::util::slugify;
///
/// assert_eq!(slugify("Early Years"), "early-years");
/// assert_eq!(slugify("School, Work & Love!"), "school-work-love");
/// ```
pub fn slugify(text: &str) -> String {
    let slug = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Hands out unique anchors when the same title appears more than once.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for `text`, suffixed with `-2`, `-3`, ... on repeats.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{base}-{count}")
        }
    }
}

/// File name stem for a book title: spaces become underscores.
pub fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();

    if stem.is_empty() { "book".to_string() } else { stem }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_text_strips_tags() {
        assert_eq!(clean_text("<p>Hello <b>World</b></p>"), "Hello World");
    }

    #[test]
    fn test_clean_text_decodes_entities() {
        assert_eq!(
            clean_text("&quot;Tom&#39;s&quot;&nbsp;&lt;3 &amp; more"),
            "\"Tom's\" <3 & more"
        );
    }

    #[test]
    fn test_clean_text_keeps_paragraph_breaks() {
        assert_eq!(clean_text("<p>One</p><p>Two<br>Three</p>"), "One\nTwo\nThree");
    }

    #[test]
    fn test_clean_text_unterminated_tag_passes_through() {
        assert_eq!(clean_text("a <b unclosed"), "a <b unclosed");
    }

    #[test]
    fn test_clean_text_plain_text_is_trimmed() {
        assert_eq!(clean_text("  plain  "), "plain");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_clean_text_escaped_markup_is_stable() {
        let once = clean_text("&lt;b&gt;bold&lt;/b&gt;");
        assert_eq!(once, "bold");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn test_paragraphs_drop_blank_lines() {
        assert_eq!(
            paragraphs("First line\n\n  Second line  \n"),
            vec!["First line", "Second line"]
        );
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Hello & World"), "Hello &amp; World");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
        assert_eq!(escape_xml("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn test_clean_text_removes_xml_forbidden_controls() {
        assert_eq!(clean_text("Soft\u{b}break\u{c}feed\u{1}"), "Soft\nbreak\nfeed");
        assert_eq!(clean_text("<p>a\u{b}b</p>\u{7f}"), "a\nb");
        assert_eq!(clean_text("tab\tkept"), "tab\tkept");
    }

    #[test]
    fn test_escape_xml_removes_xml_forbidden_controls() {
        assert_eq!(escape_xml("S\u{1}"), "S");
        assert_eq!(escape_xml("a\u{b}b & c"), "a b &amp; c");
        assert!(matches!(escape_xml("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Early Years"), "early-years");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
        assert_eq!(slugify("Chapter 1: Home"), "chapter-1-home");
        assert_eq!(slugify("!!!"), "section");
    }

    #[test]
    fn test_slugger_deduplicates() {
        let mut slugger = Slugger::new();
        assert_eq!(slugger.slug("Family"), "family");
        assert_eq!(slugger.slug("Work"), "work");
        assert_eq!(slugger.slug("Family"), "family-2");
        assert_eq!(slugger.slug("family!"), "family-3");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("My Life Story"), "My_Life_Story");
        assert_eq!(file_stem("a/b"), "a_b");
        assert_eq!(file_stem("   "), "book");
    }

    proptest! {
        #[test]
        fn prop_clean_text_is_idempotent(s in "[a-z <>/&;#0-9pbrnspamltgquo\\x01\\x0b\\x0c]{0,40}") {
            let once = clean_text(&s);
            prop_assert_eq!(clean_text(&once), once);
        }

        #[test]
        fn prop_clean_text_removes_generated_tags(
            words in prop::collection::vec("[a-z]{1,8}", 1..6),
            tag in prop_oneof![Just("b"), Just("i"), Just("span"), Just("em")],
        ) {
            let markup = words
                .iter()
                .map(|w| format!("<{tag}>{w}</{tag}>"))
                .collect::<Vec<_>>()
                .join(" ");
            prop_assert_eq!(clean_text(&markup), words.join(" "));
        }
    }
}
