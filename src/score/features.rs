use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PARAGRAPH_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6} ").unwrap());
static INLINE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").unwrap());
static INLINE_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());

/// Above this many characters a page is assumed to carry a meta description.
const META_DESCRIPTION_MIN_LEN: usize = 160;

/// Text features of a scraped page, the only input the scorers look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFeatures {
    pub word_count: usize,
    pub paragraphs: usize,
    pub headers: usize,
    pub links: usize,
    pub images: usize,
    pub has_title: bool,
    pub has_meta_description: bool,
    /// Raw content length in characters.
    pub content_length: usize,
}

pub fn extract_features(content: &str) -> ContentFeatures {
    let content_length = content.chars().count();
    let blank = content.trim().is_empty();

    let paragraphs = if blank {
        0
    } else {
        PARAGRAPH_BREAK_RE.find_iter(content).count() + 1
    };

    ContentFeatures {
        word_count: content.split_whitespace().count(),
        paragraphs,
        headers: HEADING_RE.find_iter(content).count(),
        links: count_links(content),
        images: INLINE_IMAGE_RE.find_iter(content).count(),
        has_title: content.trim_start().starts_with("# "),
        has_meta_description: content.contains("description")
            || content_length > META_DESCRIPTION_MIN_LEN,
        content_length,
    }
}

/// `[text](url)` occurrences, skipping the `[alt](url)` tail of an image.
fn count_links(content: &str) -> usize {
    let bytes = content.as_bytes();
    INLINE_LINK_RE
        .find_iter(content)
        .filter(|m| m.start() == 0 || bytes[m.start() - 1] != b'!')
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_has_no_features() {
        assert_eq!(extract_features(""), ContentFeatures::default());
    }

    #[test]
    fn whitespace_only_has_no_paragraphs() {
        let f = extract_features("   \n\n\t ");
        assert_eq!(f.word_count, 0);
        assert_eq!(f.paragraphs, 0);
    }

    #[test]
    fn counts_words_and_paragraphs() {
        let f = extract_features("one two  three\n\nfour\n\n\n\nfive six");
        assert_eq!(f.word_count, 6);
        assert_eq!(f.paragraphs, 3);
    }

    #[test]
    fn headings_need_a_space_and_line_start() {
        let md = "# Title\n## Sub\n####### too deep\n#hashtag\ntext # not a heading\n###### Six";
        let f = extract_features(md);
        assert_eq!(f.headers, 3);
        assert!(f.has_title);
    }

    #[test]
    fn title_must_be_level_one() {
        assert!(!extract_features("## Only a subtitle").has_title);
        assert!(extract_features("\n\n# Leading blank lines").has_title);
    }

    #[test]
    fn images_are_not_links() {
        let md = "See [docs](https://a.dev/docs) and ![logo](https://a.dev/logo.png) \
                  or [home](https://a.dev).";
        let f = extract_features(md);
        assert_eq!(f.links, 2);
        assert_eq!(f.images, 1);
    }

    #[test]
    fn meta_description_heuristic() {
        assert!(extract_features("meta description here").has_meta_description);
        assert!(!extract_features("short page").has_meta_description);
        let long = "a".repeat(161);
        assert!(extract_features(&long).has_meta_description);
        let edge = "a".repeat(160);
        assert!(!extract_features(&edge).has_meta_description);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let f = extract_features("héllo wörld");
        assert_eq!(f.content_length, 11);
    }

    #[test]
    fn landing_fixture() {
        let md = std::fs::read_to_string("tests/fixtures/landing.md").unwrap();
        let f = extract_features(&md);
        assert!(f.has_title);
        assert!(f.headers >= 4);
        assert!(f.links >= 5);
        assert!(f.images >= 2);
        assert!(f.paragraphs > 5);
    }
}
