//! Session grouping.
//!
//! Stories arrive pre-sorted; a section is a maximal run of neighbouring
//! stories that share a session title. Nothing is re-sorted here, so a title
//! that reappears later starts a second section.

use super::{Book, Story};

/// A run of consecutive stories under one chapter heading.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub title: &'a str,
    pub stories: &'a [Story],
    /// Index of the first story of this section in [`Book::stories`].
    pub start: usize,
}

impl Book {
    /// Chapter runs in reading order.
    pub fn sections(&self) -> Vec<Section<'_>> {
        let mut start = 0;
        self.stories()
            .chunk_by(|a, b| a.session_title == b.session_title)
            .map(|stories| {
                let section = Section {
                    title: &stories[0].session_title,
                    stories,
                    start,
                };
                start += stories.len();
                section
            })
            .collect()
    }

    /// Distinct session titles in first-seen order.
    pub fn session_titles(&self) -> Vec<&str> {
        let mut titles: Vec<&str> = Vec::new();
        for story in self.stories() {
            if !titles.contains(&story.session_title.as_str()) {
                titles.push(&story.session_title);
            }
        }
        titles
    }
}

#[cfg(test)]
mod tests {
    use crate::book::{Book, Metadata, Story};

    fn book(sessions: &[&str]) -> Book {
        let stories = sessions
            .iter()
            .enumerate()
            .map(|(i, s)| Story::new(format!("Q{i}"), format!("A{i}"), *s))
            .collect();
        Book::new(Metadata::new("T"), stories).unwrap()
    }

    #[test]
    fn test_consecutive_titles_form_one_section() {
        let book = book(&["A", "A", "B"]);
        let sections = book.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "A");
        assert_eq!(sections[0].stories.len(), 2);
        assert_eq!(sections[1].title, "B");
        assert_eq!(sections[1].start, 2);
    }

    #[test]
    fn test_unsorted_titles_repeat_sections() {
        let book = book(&["A", "B", "A"]);
        let titles: Vec<_> = book.sections().iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["A", "B", "A"]);
        assert_eq!(book.session_titles(), vec!["A", "B"]);
    }
}
